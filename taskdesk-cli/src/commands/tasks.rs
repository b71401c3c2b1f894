//! Tasks command - list, inspect and change tasks
//!
//! Mutations print the refreshed task list afterwards, so the screen always
//! reflects what the backend now holds.

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use taskdesk_core::{
    Error, LogEvent, NewTask, TaskAction, TaskChanges, TaskPriority, TaskQuery, TaskStatus,
    TaskdeskContext, User,
};

use super::{get_context, get_logger, log_event, mutation_failed, require_user};
use crate::output;

#[derive(Subcommand)]
pub enum TasksCommands {
    /// List tasks visible to you
    List {
        /// Only tasks in this status (pending, in_progress, completed)
        #[arg(long)]
        status: Option<TaskStatus>,
        /// Only tasks assigned to this user ID
        #[arg(long)]
        assigned_to: Option<i64>,
        /// Number of tasks to skip
        #[arg(long)]
        skip: Option<u32>,
        /// Maximum number of tasks to return
        #[arg(long)]
        limit: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single task
    Show {
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a task (admins and managers)
    Create {
        #[arg(long, short)]
        title: String,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long, short, default_value = "medium")]
        priority: TaskPriority,
        /// User ID to assign; empty for nobody
        #[arg(long)]
        assign: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a task (admins and managers)
    Edit {
        id: i64,
        #[arg(long, short)]
        title: Option<String>,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long, short)]
        priority: Option<TaskPriority>,
        #[arg(long, short)]
        status: Option<TaskStatus>,
        /// User ID to assign; empty string to unassign
        #[arg(long)]
        assign: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move a task to another status
    Status {
        id: i64,
        status: TaskStatus,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a task (admins and managers)
    Delete {
        id: i64,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub async fn run(command: TasksCommands) -> Result<()> {
    let ctx = get_context()?;
    let user = require_user(&ctx).await?;

    match command {
        TasksCommands::List {
            status,
            assigned_to,
            skip,
            limit,
            json,
        } => {
            let query = TaskQuery {
                status,
                assigned_to,
                skip,
                limit,
            };
            list(&ctx, &query, json).await
        }
        TasksCommands::Show { id, json } => show(&ctx, id, json).await,
        TasksCommands::Create {
            title,
            description,
            priority,
            assign,
            json,
        } => {
            require_manager(&user, "create tasks")?;
            let mut task = NewTask::new(title).with_priority(priority);
            if let Some(d) = description {
                task = task.with_description(d);
            }
            if let Some(a) = assign {
                task = task.assigned_to(a);
            }
            create(&ctx, &task, json).await
        }
        TasksCommands::Edit {
            id,
            title,
            description,
            priority,
            status,
            assign,
            json,
        } => {
            require_manager(&user, "edit tasks; use `td tasks status` to move your tasks")?;
            let changes = TaskChanges {
                title,
                description,
                status,
                priority,
                assigned_to: assign.map(Into::into),
            };
            if changes.is_empty() {
                bail!(
                    "Nothing to change. Pass at least one of \
                     --title, --description, --priority, --status, --assign"
                );
            }
            edit(&ctx, id, &changes, TaskAction::Save, json).await
        }
        TasksCommands::Status { id, status, json } => {
            edit(&ctx, id, &TaskChanges::status(status), TaskAction::ChangeStatus, json).await
        }
        TasksCommands::Delete { id, force } => {
            require_manager(&user, "delete tasks")?;
            delete(&ctx, id, force).await
        }
    }
}

fn require_manager(user: &User, what: &str) -> Result<()> {
    if !user.role.can_manage_tasks() {
        bail!("Only admins and managers can {}", what);
    }
    Ok(())
}

async fn list(ctx: &TaskdeskContext, query: &TaskQuery, json: bool) -> Result<()> {
    let spinner = output::spinner("Loading tasks...");

    // Unfiltered listing fails open; explicit queries report errors
    let (tasks, total) = if *query == TaskQuery::default() {
        (ctx.tasks.list_tasks().await, None)
    } else {
        match ctx.tasks.query_tasks(query).await {
            Ok(page) => (page.tasks, Some(page.total)),
            Err(e) => {
                output::finish(spinner);
                return Err(e.into());
            }
        }
    };
    output::finish(spinner);

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    if let Some(total) = total {
        println!("{}", format!("Showing {} of {} tasks", tasks.len(), total).dimmed());
    }
    output::print_tasks(&tasks);
    Ok(())
}

async fn show(ctx: &TaskdeskContext, id: i64, json: bool) -> Result<()> {
    let spinner = output::spinner("Loading task...");
    let result = ctx.tasks.get_task(id).await;
    output::finish(spinner);

    let task = match result {
        Ok(task) => task,
        Err(Error::NotFound(_)) => bail!("Task {} not found", id),
        Err(Error::Forbidden(_)) => bail!("You do not have permission to view task {}", id),
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
    } else {
        output::print_task(&task);
    }
    Ok(())
}

async fn create(ctx: &TaskdeskContext, task: &NewTask, json: bool) -> Result<()> {
    let logger = get_logger();

    let spinner = output::spinner("Creating task...");
    let result = ctx.tasks.create_task(task).await;
    output::finish(spinner);

    let created = result
        .map_err(|e| mutation_failed(&logger, "task_create_failed", e, TaskAction::Save))?;
    log_event(&logger, LogEvent::new("task_created").with_task(created.id));

    if json {
        println!("{}", serde_json::to_string_pretty(&created)?);
        return Ok(());
    }

    output::success(&format!("Created task #{}", created.id));
    refresh(ctx).await;
    Ok(())
}

async fn edit(
    ctx: &TaskdeskContext,
    id: i64,
    changes: &TaskChanges,
    action: TaskAction,
    json: bool,
) -> Result<()> {
    let logger = get_logger();

    let spinner = output::spinner("Updating task...");
    let result = ctx.tasks.update_task(id, changes).await;
    output::finish(spinner);

    let updated = result.map_err(|e| mutation_failed(&logger, "task_update_failed", e, action))?;
    log_event(&logger, LogEvent::new("task_updated").with_task(id));

    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
        return Ok(());
    }

    match action {
        TaskAction::ChangeStatus => output::success(&format!(
            "Task #{} is now {}",
            id,
            output::status_label(updated.status)
        )),
        _ => output::success(&format!("Updated task #{}", id)),
    }
    refresh(ctx).await;
    Ok(())
}

async fn delete(ctx: &TaskdeskContext, id: i64, force: bool) -> Result<()> {
    let logger = get_logger();

    if !force
        && !Confirm::new()
            .with_prompt(format!("Delete task #{}?", id))
            .default(false)
            .interact()?
    {
        println!("{}", "Cancelled".dimmed());
        return Ok(());
    }

    let spinner = output::spinner("Deleting task...");
    let result = ctx.tasks.delete_task(id).await;
    output::finish(spinner);

    result.map_err(|e| mutation_failed(&logger, "task_delete_failed", e, TaskAction::Delete))?;
    log_event(&logger, LogEvent::new("task_deleted").with_task(id));

    output::success(&format!("Deleted task #{}", id));
    refresh(ctx).await;
    Ok(())
}

/// Re-fetch and print the full list after a mutation
async fn refresh(ctx: &TaskdeskContext) {
    println!();
    let tasks = ctx.tasks.list_tasks().await;
    output::print_tasks(&tasks);
}
