//! Core domain entities
//!
//! Users, tasks and the session snapshot as exchanged with the backend.
//! Pure data structures with normalization logic - no I/O.

mod user;
mod task;
mod session;
mod timestamp;
pub mod feedback;
pub mod result;

pub use user::{User, UserRole};
pub use task::{
    AssigneeInput, NewTask, NewTaskPayload, Task, TaskChanges, TaskChangesPayload, TaskList,
    TaskPriority, TaskQuery, TaskStatus,
};
pub use session::{Session, SessionState};
pub use feedback::{Feedback, TaskAction};
