//! Bearer token storage port
//!
//! The persisted token is the only piece of session state that survives a
//! restart. Its presence means a login once succeeded; its absence means the
//! user is logged out. Reads and writes are synchronous.

use std::sync::Arc;

use crate::domain::result::Result;

/// Fixed key the bearer token is stored under
pub const TOKEN_KEY: &str = "token";

/// Durable storage for the single bearer token
pub trait TokenStore: Send + Sync {
    /// Current token, if one is stored
    fn load(&self) -> Option<String>;

    /// Persist a token, replacing any previous one
    fn save(&self, token: &str) -> Result<()>;

    /// Remove the stored token. Removing an absent token is not an error.
    fn clear(&self) -> Result<()>;
}

/// Capability the HTTP client calls before every request to obtain the
/// bearer token to attach
pub type TokenSupplier = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Supplier that reads the given store on every call
pub fn supplier_from(store: Arc<dyn TokenStore>) -> TokenSupplier {
    Arc::new(move || store.load())
}

/// Supplier that never yields a token
pub fn anonymous() -> TokenSupplier {
    Arc::new(|| None)
}
