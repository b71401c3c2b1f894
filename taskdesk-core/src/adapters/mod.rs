//! Adapter implementations
//!
//! Adapters implement the ports with concrete technologies:
//! - reqwest HTTP client for the task backend
//! - JSON credentials file (and an in-memory store) for the TokenStore port
//! - In-process mock backend for tests and local experiments

pub mod http;
pub mod mock_backend;
pub mod token_store;
