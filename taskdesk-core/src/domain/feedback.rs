//! User-facing messages for failed task mutations
//!
//! Callers of `create_task`/`update_task` map the returned error to one of
//! three outcomes: 422 asks the user to fix their input, 403 tells them they
//! lack the role, and everything else is a generic retry message.

use super::result::Error;

/// What the user was doing when the mutation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    /// Creating or editing a task through the task form
    Save,
    /// Moving a task to another status
    ChangeStatus,
    /// Deleting a task
    Delete,
}

/// Outcome class of a failed mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Validation,
    PermissionDenied,
    Failed,
}

impl Feedback {
    pub fn from_error(error: &Error) -> Self {
        match error.status() {
            Some(422) => Feedback::Validation,
            Some(403) => Feedback::PermissionDenied,
            _ => Feedback::Failed,
        }
    }

    pub fn message(self, action: TaskAction) -> &'static str {
        match (self, action) {
            (Feedback::Validation, TaskAction::ChangeStatus) => {
                "Invalid status value. Please try again."
            }
            (Feedback::Validation, _) => "Please check all fields are filled correctly.",
            (Feedback::PermissionDenied, TaskAction::ChangeStatus) => {
                "You do not have permission to update this task."
            }
            (Feedback::PermissionDenied, _) => {
                "You do not have permission to perform this action."
            }
            (Feedback::Failed, TaskAction::ChangeStatus) => {
                "An error occurred while updating the task."
            }
            (Feedback::Failed, _) => "An error occurred. Please try again.",
        }
    }
}

/// Shorthand for `Feedback::from_error(error).message(action)`
pub fn user_message(error: &Error, action: TaskAction) -> &'static str {
    Feedback::from_error(error).message(action)
}
