//! Taskdesk CLI - team tasks in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{auth, config, logs, tasks, users};

/// Taskdesk - team tasks in your terminal
#[derive(Parser)]
#[command(name = "td", version, about, long_about = None)]
struct Cli {
    /// Print diagnostics to stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the session
    Login {
        #[arg(long, short)]
        email: Option<String>,
        /// Prefer TASKDESK_PASSWORD or the prompt over this flag
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List and manage tasks
    Tasks {
        #[command(subcommand)]
        command: tasks::TasksCommands,
    },

    /// List users (admins only)
    Users {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },

    /// View and manage the local event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    /// Name recorded in the event log
    fn name(&self) -> &'static str {
        match self {
            Commands::Login { .. } => "login",
            Commands::Logout => "logout",
            Commands::Whoami { .. } => "whoami",
            Commands::Tasks { command } => match command {
                tasks::TasksCommands::List { .. } => "tasks list",
                tasks::TasksCommands::Show { .. } => "tasks show",
                tasks::TasksCommands::Create { .. } => "tasks create",
                tasks::TasksCommands::Edit { .. } => "tasks edit",
                tasks::TasksCommands::Status { .. } => "tasks status",
                tasks::TasksCommands::Delete { .. } => "tasks delete",
            },
            Commands::Users { .. } => "users",
            Commands::Config { .. } => "config",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::builder()
                .with_default_directive(level.into())
                .parse_lossy("")
        }))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if !matches!(cli.command, Commands::Logs { .. }) {
        commands::log_event(
            &commands::get_logger(),
            taskdesk_core::LogEvent::new("command_executed").with_command(cli.command.name()),
        );
    }

    match cli.command {
        Commands::Login { email, password, json } => auth::login(email, password, json).await,
        Commands::Logout => auth::logout(),
        Commands::Whoami { json } => auth::whoami(json).await,
        Commands::Tasks { command } => tasks::run(command).await,
        Commands::Users { json } => users::run(json).await,
        Commands::Config { command } => config::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
