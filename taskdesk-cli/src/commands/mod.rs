//! CLI command implementations

pub mod auth;
pub mod config;
pub mod logs;
pub mod tasks;
pub mod users;

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use taskdesk_core::domain::feedback::user_message;
use taskdesk_core::{EntryPoint, Error, LogEvent, LoggingService, TaskAction, TaskdeskContext, User};

/// Environment variable pointing at the taskdesk directory
pub const DIR_ENV: &str = "TASKDESK_DIR";

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let dir = get_taskdesk_dir().ok()?;
    LoggingService::new(&dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        if let Err(e) = l.log(event) {
            tracing::debug!(error = %e, "failed to write event log");
        }
    }
}

/// Taskdesk directory from `TASKDESK_DIR`, else `~/.taskdesk`
pub fn get_taskdesk_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".taskdesk"))
        .context("Could not find home directory; set TASKDESK_DIR")
}

pub fn get_context() -> Result<TaskdeskContext> {
    let dir = get_taskdesk_dir()?;

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create taskdesk directory: {:?}", dir))?;

    TaskdeskContext::new(&dir).context("Failed to initialize taskdesk context")
}

/// Restore the session from the persisted token, refusing when logged out
pub async fn require_user(ctx: &TaskdeskContext) -> Result<User> {
    let spinner = crate::output::spinner("Checking session...");
    let user = ctx.session.load_user().await;
    crate::output::finish(spinner);

    match user {
        Some(user) => Ok(user),
        None => bail!("Not logged in. Run `td login` first."),
    }
}

/// Turn a failed mutation into the message shown to the user and record it
pub fn mutation_failed(
    logger: &Option<LoggingService>,
    event: &str,
    error: Error,
    action: TaskAction,
) -> anyhow::Error {
    tracing::debug!(error = %error, "task mutation failed");

    let mut log = LogEvent::new(event).with_error(error.to_string());
    if let Some(status) = error.status() {
        log = log.with_error_details(format!("HTTP {}", status));
    }
    log_event(logger, log);

    anyhow!(user_message(&error, action))
}
