//! Config command - show or change where the backend lives

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use taskdesk_core::config::{ApiUrlSource, Config, API_URL_ENV};

use super::get_taskdesk_dir;
use crate::output;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Persist the backend API URL
    SetUrl {
        /// e.g. https://tasks.example.com/api/v1
        url: String,
    },
}

pub fn run(command: ConfigCommands) -> Result<()> {
    let dir = get_taskdesk_dir()?;
    let mut config = Config::load(&dir)?;

    match command {
        ConfigCommands::Show { json } => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "api_url": config.api_url,
                        "api_url_source": config.api_url_source,
                        "directory": dir.to_string_lossy(),
                    })
                );
                return Ok(());
            }

            let source = match config.api_url_source {
                ApiUrlSource::Default => "default".dimmed(),
                ApiUrlSource::Settings => "settings.json".normal(),
                ApiUrlSource::Environment => API_URL_ENV.yellow(),
            };

            let mut table = output::create_table();
            table.add_row(vec!["API URL".to_string(), config.api_url.clone()]);
            table.add_row(vec!["Source".to_string(), source.to_string()]);
            table.add_row(vec!["Directory".to_string(), dir.display().to_string()]);
            println!("{}", table);
        }
        ConfigCommands::SetUrl { url } => {
            config.set_api_url(&url)?;
            config.save(&dir)?;
            output::success(&format!("API URL set to {}", url.trim_end_matches('/')));

            if config.api_url_source == ApiUrlSource::Environment {
                output::warning(&format!(
                    "{} is set and still takes precedence ({})",
                    API_URL_ENV, config.api_url
                ));
            }
        }
    }

    Ok(())
}
