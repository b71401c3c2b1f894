//! Task domain model and request payloads

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp::deserialize_optional_timestamp;
use super::User;

/// Workflow status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" | "done" => Ok(TaskStatus::Completed),
            other => Err(format!(
                "Unknown status '{}'. Expected one of: pending, in_progress, completed",
                other
            )),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            other => Err(format!(
                "Unknown priority '{}'. Expected one of: low, medium, high",
                other
            )),
        }
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub assigned_to: Option<i64>,
    #[serde(default)]
    pub assignee: Option<User>,
    /// Null once the creating user has been deleted
    #[serde(default)]
    pub created_by: Option<i64>,
    #[serde(default)]
    pub creator: Option<User>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Page of tasks returned by `GET /tasks`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub size: i64,
}

/// Filters accepted by `GET /tasks`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Assignee as entered by a user, before normalization
///
/// Pickers hand back strings ("3", or "" for nobody); programmatic callers
/// pass ids. Both normalize to a numeric id or nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssigneeInput {
    #[default]
    Unassigned,
    Id(i64),
    Text(String),
}

impl AssigneeInput {
    /// Numeric user id, or `None` for empty, zero, or non-numeric input
    pub fn normalize(&self) -> Option<i64> {
        match self {
            AssigneeInput::Unassigned => None,
            AssigneeInput::Id(id) => Some(*id).filter(|id| *id != 0),
            AssigneeInput::Text(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<i64>().ok().filter(|id| *id != 0)
            }
        }
    }
}

impl From<i64> for AssigneeInput {
    fn from(id: i64) -> Self {
        AssigneeInput::Id(id)
    }
}

impl From<Option<i64>> for AssigneeInput {
    fn from(id: Option<i64>) -> Self {
        id.map(AssigneeInput::Id).unwrap_or_default()
    }
}

impl From<&str> for AssigneeInput {
    fn from(raw: &str) -> Self {
        AssigneeInput::Text(raw.to_string())
    }
}

impl From<String> for AssigneeInput {
    fn from(raw: String) -> Self {
        AssigneeInput::Text(raw)
    }
}

/// Data for creating a task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub assigned_to: AssigneeInput,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn assigned_to(mut self, assignee: impl Into<AssigneeInput>) -> Self {
        self.assigned_to = assignee.into();
        self
    }

    /// Wire body for `POST /tasks`
    pub fn payload(&self) -> NewTaskPayload<'_> {
        NewTaskPayload {
            title: &self.title,
            description: self.description.as_deref(),
            priority: self.priority,
            assigned_to: self.assigned_to.normalize(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NewTaskPayload<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub priority: TaskPriority,
    pub assigned_to: Option<i64>,
}

/// Sparse update of a task
///
/// Only fields that are `Some` are sent. For `assigned_to`, `Some` of an
/// empty input means "unassign" and is sent as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<AssigneeInput>,
}

impl TaskChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<AssigneeInput>) -> Self {
        self.assigned_to = Some(assignee.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assigned_to.is_none()
    }

    /// Wire body for `PUT /tasks/{id}`
    pub fn payload(&self) -> TaskChangesPayload<'_> {
        TaskChangesPayload {
            title: self.title.as_deref(),
            description: self.description.as_deref(),
            status: self.status,
            priority: self.priority,
            assigned_to: self.assigned_to.as_ref().map(AssigneeInput::normalize),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskChangesPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Option<i64>>,
}
