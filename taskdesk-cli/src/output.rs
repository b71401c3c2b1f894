//! Output formatting utilities

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use colored::{ColoredString, Colorize};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use taskdesk_core::{Task, TaskPriority, TaskStatus, User};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Spinner on stderr while a request is in flight; None when not a terminal
pub fn spinner(msg: &str) -> Option<ProgressBar> {
    if atty::isnt(atty::Stream::Stderr) {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(msg.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    Some(bar)
}

pub fn finish(spinner: Option<ProgressBar>) {
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
}

pub fn status_label(status: TaskStatus) -> ColoredString {
    match status {
        TaskStatus::Pending => "pending".yellow(),
        TaskStatus::InProgress => "in progress".cyan(),
        TaskStatus::Completed => "completed".green(),
    }
}

pub fn priority_label(priority: TaskPriority) -> ColoredString {
    match priority {
        TaskPriority::Low => "low".dimmed(),
        TaskPriority::Medium => "medium".normal(),
        TaskPriority::High => "high".red().bold(),
    }
}

pub fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn assignee_label(task: &Task) -> String {
    match (&task.assignee, task.assigned_to) {
        (Some(user), _) => user.display_name(),
        (None, Some(id)) => format!("#{}", id),
        (None, None) => "Unassigned".to_string(),
    }
}

pub fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("{}", "No tasks found.".dimmed());
        return;
    }

    let mut table = create_table();
    table.set_header(vec!["ID", "Title", "Status", "Priority", "Assignee"]);
    for task in tasks {
        table.add_row(vec![
            Cell::new(task.id),
            Cell::new(&task.title),
            Cell::new(status_label(task.status)),
            Cell::new(priority_label(task.priority)),
            Cell::new(assignee_label(task)),
        ]);
    }
    println!("{}", table);
}

pub fn print_task(task: &Task) {
    println!("{} {}", format!("#{}", task.id).dimmed(), task.title.bold());
    println!();

    let mut table = create_table();
    table.add_row(vec![Cell::new("Status"), Cell::new(status_label(task.status))]);
    table.add_row(vec![Cell::new("Priority"), Cell::new(priority_label(task.priority))]);
    table.add_row(vec!["Assignee".to_string(), assignee_label(task)]);
    if let Some(creator) = &task.creator {
        table.add_row(vec!["Created by".to_string(), creator.display_name()]);
    }
    table.add_row(vec!["Created".to_string(), format_time(task.created_at)]);
    table.add_row(vec!["Updated".to_string(), format_time(task.updated_at)]);
    if task.due_date.is_some() {
        table.add_row(vec!["Due".to_string(), format_time(task.due_date)]);
    }
    println!("{}", table);

    if let Some(description) = task.description.as_deref().filter(|d| !d.trim().is_empty()) {
        println!();
        println!("{}", description);
    }
}

pub fn print_users(users: &[User]) {
    if users.is_empty() {
        println!("{}", "No users found.".dimmed());
        return;
    }

    let mut table = create_table();
    table.set_header(vec!["ID", "Name", "Email", "Role"]);
    for user in users {
        table.add_row(vec![
            user.id.to_string(),
            user.full_name.clone(),
            user.email.clone(),
            user.role.to_string(),
        ]);
    }
    println!("{}", table);
}
