//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod logging;
mod session;
mod tasks;

pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use session::{SessionStore, LOGIN_FAILED};
pub use tasks::TaskApi;
