//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. Services depend
//! only on these, not on a concrete storage mechanism.

mod token_store;

pub use token_store::{anonymous, supplier_from, TokenStore, TokenSupplier, TOKEN_KEY};
