//! Login, logout and whoami commands

use anyhow::{anyhow, Result};
use colored::Colorize;
use dialoguer::{Input, Password};
use taskdesk_core::services::LOGIN_FAILED;
use taskdesk_core::{LogEvent, OperationResult, User};

use super::{get_context, get_logger, log_event, require_user};
use crate::output;

/// Environment variable consulted before prompting for a password
pub const PASSWORD_ENV: &str = "TASKDESK_PASSWORD";

/// Get password from --password flag, TASKDESK_PASSWORD env var, or prompt
fn get_password_or_prompt(password_flag: Option<String>) -> Result<String> {
    if let Some(p) = password_flag {
        return Ok(p);
    }

    if let Ok(p) = std::env::var(PASSWORD_ENV) {
        return Ok(p);
    }

    let p = Password::new().with_prompt("Password").interact()?;
    Ok(p)
}

pub async fn login(email: Option<String>, password: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let email = match email {
        Some(e) => e,
        None => Input::new().with_prompt("Email").interact_text()?,
    };
    let password = get_password_or_prompt(password)?;

    let spinner = output::spinner("Signing in...");
    let result = ctx.session.login(email.trim(), &password).await;
    output::finish(spinner);

    match result {
        Ok(user) => {
            log_event(&logger, LogEvent::new("login_succeeded").with_command("login"));

            if json {
                println!("{}", serde_json::to_string_pretty(&OperationResult::ok(&user))?);
            } else {
                output::success(&format!("Logged in as {}", user.display_name()));
            }
            Ok(())
        }
        Err(e) => {
            let mut event = LogEvent::new("login_failed")
                .with_command("login")
                .with_error(e.to_string());
            if let Some(status) = e.status() {
                event = event.with_error_details(format!("HTTP {}", status));
            }
            log_event(&logger, event);

            let message = ctx
                .session
                .snapshot()
                .error
                .unwrap_or_else(|| LOGIN_FAILED.to_string());

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&OperationResult::<User>::fail(&message))?
                );
                std::process::exit(1);
            }
            Err(anyhow!(message))
        }
    }
}

pub fn logout() -> Result<()> {
    let ctx = get_context()?;
    let was_logged_in = ctx.session.has_persisted_token();

    ctx.reset();

    if was_logged_in {
        output::success("Logged out");
    } else {
        output::info("Not logged in");
    }
    Ok(())
}

pub async fn whoami(json: bool) -> Result<()> {
    let ctx = get_context()?;

    if !ctx.session.has_persisted_token() {
        if json {
            println!("{}", serde_json::json!({ "logged_in": false }));
        } else {
            output::info("Not logged in");
        }
        return Ok(());
    }

    let user = require_user(&ctx).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
        return Ok(());
    }

    println!("{}", user.display_name().bold());
    let mut table = output::create_table();
    table.add_row(vec!["ID".to_string(), user.id.to_string()]);
    table.add_row(vec!["Email".to_string(), user.email.clone()]);
    table.add_row(vec!["Role".to_string(), user.role.to_string()]);
    table.add_row(vec!["Member since".to_string(), output::format_time(user.created_at)]);
    println!("{}", table);
    println!();
    println!("{}", format!("API: {}", ctx.config.api_url).dimmed());

    Ok(())
}
