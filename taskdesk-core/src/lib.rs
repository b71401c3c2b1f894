//! Taskdesk Core - session, HTTP and task API client for the Taskdesk backend
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Users, tasks, session snapshot, errors
//! - **ports**: Trait definitions for external dependencies (TokenStore)
//! - **services**: Session store, task API facade, event log
//! - **adapters**: Concrete implementations (reqwest client, credentials file, mock backend)

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;
mod log_migrations;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::http::HttpClient;
use adapters::token_store::FileTokenStore;
use config::Config;
use ports::{supplier_from, TokenStore};
use services::{SessionStore, TaskApi};

// Re-export commonly used types at crate root
pub use domain::{
    Feedback, NewTask, Session, SessionState, Task, TaskAction, TaskChanges, TaskList,
    TaskPriority, TaskQuery, TaskStatus, User, UserRole,
};
pub use domain::result::{Error, OperationResult};
pub use services::{EntryPoint, LogEvent, LoggingService};

/// Main context for Taskdesk operations
///
/// Explicitly constructed wiring of config, token storage, the shared HTTP
/// client and the services built on it. Nothing here is global; two
/// contexts never share state.
pub struct TaskdeskContext {
    pub config: Config,
    pub tokens: Arc<dyn TokenStore>,
    pub http: HttpClient,
    pub session: SessionStore,
    pub tasks: TaskApi,
}

impl TaskdeskContext {
    /// Create a context backed by the files in `taskdesk_dir`
    pub fn new(taskdesk_dir: &Path) -> Result<Self> {
        let config = Config::load(taskdesk_dir)?;
        let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(taskdesk_dir));
        Self::with_parts(config, tokens)
    }

    /// Create a context from an explicit config and token store
    pub fn with_parts(config: Config, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let http = HttpClient::new(&config.api_url, supplier_from(Arc::clone(&tokens)))?;
        let session = SessionStore::new(http.clone(), Arc::clone(&tokens));
        let tasks = TaskApi::new(http.clone());

        Ok(Self {
            config,
            tokens,
            http,
            session,
            tasks,
        })
    }

    /// Drop the session: clears the persisted token and the cached user
    pub fn reset(&self) {
        self.session.logout();
    }
}
