//! Session store - current user, loading flag and login error
//!
//! The persisted token is the source of truth; the in-memory user is a cache
//! derived from it. Every `login`, `load_user` and `logout` starts a new
//! epoch, and a response that arrives after its epoch has been superseded is
//! dropped without touching the token or the session. The state lock is
//! never held across an `.await`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::adapters::http::HttpClient;
use crate::domain::result::{Error, Result};
use crate::domain::{Session, SessionState, User};
use crate::ports::TokenStore;

/// Shown when a failed login carries no backend detail
pub const LOGIN_FAILED: &str = "Login failed";

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
}

/// Client-side authentication state
pub struct SessionStore {
    http: HttpClient,
    tokens: Arc<dyn TokenStore>,
    state: Mutex<Session>,
    epoch: AtomicU64,
}

impl SessionStore {
    pub fn new(http: HttpClient, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            http,
            tokens,
            state: Mutex::new(Session::default()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Copy of the current session
    pub fn snapshot(&self) -> Session {
        self.lock().clone()
    }

    pub fn state(&self) -> SessionState {
        self.lock().state()
    }

    pub fn current_user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    /// Whether a token survives from an earlier login
    pub fn has_persisted_token(&self) -> bool {
        self.tokens.load().is_some()
    }

    /// Exchange credentials for a token, persist it, then fetch the user
    ///
    /// On failure the session error is set to the backend's detail (or
    /// [`LOGIN_FAILED`]) and the error is also returned. A token that was
    /// already persisted stays in place when only the user fetch fails.
    /// If a newer session operation started meanwhile, the response is
    /// discarded either way and [`Error::Superseded`] is returned.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let epoch = self.begin(|session| {
            session.is_loading = true;
            session.error = None;
        });

        match self.authenticate(epoch, email, password).await {
            Ok(user) => {
                let applied = self.apply(epoch, |session| {
                    session.user = Some(user.clone());
                    session.is_loading = false;
                });
                if !applied {
                    debug!("discarding superseded login response");
                    return Err(Error::Superseded);
                }
                info!(user_id = user.id, "login succeeded");
                Ok(user)
            }
            Err(Error::Superseded) => {
                debug!("discarding superseded login response");
                Err(Error::Superseded)
            }
            Err(e) => {
                let message = e.detail().unwrap_or(LOGIN_FAILED).to_string();
                let applied = self.apply(epoch, |session| {
                    session.error = Some(message);
                    session.is_loading = false;
                });
                if !applied {
                    debug!(error = %e, "discarding superseded login failure");
                    return Err(Error::Superseded);
                }
                warn!(error = %e, "login failed");
                Err(e)
            }
        }
    }

    async fn authenticate(&self, epoch: u64, email: &str, password: &str) -> Result<User> {
        let grant: TokenGrant = self
            .http
            .post_form("/auth/login", &[("username", email), ("password", password)])
            .await?;

        {
            let _session = self.lock();
            if !self.is_current(epoch) {
                return Err(Error::Superseded);
            }
            self.tokens.save(&grant.access_token)?;
        }

        self.http
            .get_json_as("/users/me", &grant.access_token)
            .await
    }

    /// Forget the token and the user
    ///
    /// Idempotent. Storage failures are logged, never returned. A login
    /// error message from an earlier attempt is left as is.
    pub fn logout(&self) {
        self.begin(|session| {
            self.clear_token();
            session.user = None;
            session.is_loading = false;
        });
        debug!("logged out");
    }

    /// Restore the user from a persisted token
    ///
    /// Without a token this does nothing at all. If the backend rejects the
    /// token (or the request fails for any other reason) the token and user
    /// are cleared silently; the session error is not touched.
    pub async fn load_user(&self) -> Option<User> {
        let token = self.tokens.load()?;
        let epoch = self.begin(|session| session.is_loading = true);

        match self.http.get_json_as::<User>("/users/me", &token).await {
            Ok(user) => {
                let applied = self.apply(epoch, |session| {
                    session.user = Some(user.clone());
                    session.is_loading = false;
                });
                if applied {
                    Some(user)
                } else {
                    debug!("discarding superseded user load");
                    None
                }
            }
            Err(e) => {
                let applied = self.apply(epoch, |session| {
                    self.clear_token();
                    session.user = None;
                    session.is_loading = false;
                });
                if applied {
                    warn!(error = %e, "stored token rejected, session cleared");
                }
                None
            }
        }
    }

    /// Start a new epoch and mutate the session under the same lock
    fn begin(&self, update: impl FnOnce(&mut Session)) -> u64 {
        let mut session = self.lock();
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        update(&mut session);
        epoch
    }

    /// Mutate the session only if `epoch` is still current
    fn apply(&self, epoch: u64, update: impl FnOnce(&mut Session)) -> bool {
        let mut session = self.lock();
        if !self.is_current(epoch) {
            return false;
        }
        update(&mut session);
        true
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn clear_token(&self) {
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "failed to clear persisted token");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock_backend::{
        MockBackend, MockConfig, ADMIN_EMAIL, ADMIN_PASSWORD, MEMBER_EMAIL, MEMBER_ID,
        MEMBER_PASSWORD,
    };
    use crate::adapters::token_store::MemoryTokenStore;
    use crate::domain::UserRole;
    use crate::ports::supplier_from;

    fn store_for(server: &MockBackend, tokens: Arc<MemoryTokenStore>) -> Arc<SessionStore> {
        let http = HttpClient::new(&server.base_url(), supplier_from(tokens.clone())).unwrap();
        Arc::new(SessionStore::new(http, tokens))
    }

    #[tokio::test]
    async fn test_login_sets_user_and_token() {
        let server = MockBackend::start(MockConfig::default()).unwrap();
        let tokens = Arc::new(MemoryTokenStore::new());
        let store = store_for(&server, tokens.clone());

        let user = store.login(MEMBER_EMAIL, MEMBER_PASSWORD).await.unwrap();

        assert_eq!(user.id, MEMBER_ID);
        assert_eq!(user.role, UserRole::Member);
        assert_eq!(store.state(), SessionState::LoggedIn);
        assert_eq!(tokens.load(), server.token_for(MEMBER_EMAIL));
        assert!(!store.snapshot().is_loading);
    }

    #[tokio::test]
    async fn test_login_persists_token_before_fetching_user() {
        let server = MockBackend::start(MockConfig::default()).unwrap();
        let tokens = Arc::new(MemoryTokenStore::new());
        let store = store_for(&server, tokens.clone());

        store.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].path, "/api/v1/auth/login");
        assert!(requests[0].authorization().is_none());
        assert_eq!(requests[1].path, "/api/v1/users/me");
        assert_eq!(
            requests[1].authorization(),
            Some(format!("Bearer {}", server.token_for(ADMIN_EMAIL).unwrap()).as_str())
        );
    }

    #[tokio::test]
    async fn test_failed_user_fetch_keeps_token() {
        let server = MockBackend::start(MockConfig::default()).unwrap();
        let tokens = Arc::new(MemoryTokenStore::new());
        let store = store_for(&server, tokens.clone());
        server.set_config(MockConfig {
            reject_tokens: true,
            ..Default::default()
        });

        let result = store.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

        assert!(matches!(result, Err(Error::Unauthorized(_))));
        assert!(tokens.load().is_some());
        let session = store.snapshot();
        assert!(session.user.is_none());
        assert_eq!(session.error.as_deref(), Some("Could not validate credentials"));
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let server = MockBackend::start(MockConfig::default()).unwrap();
        let tokens = Arc::new(MemoryTokenStore::new());
        let store = store_for(&server, tokens.clone());

        store.logout();
        store.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();
        store.logout();
        store.logout();

        assert!(tokens.load().is_none());
        assert_eq!(store.state(), SessionState::LoggedOut);
    }

    #[tokio::test]
    async fn test_logout_discards_in_flight_login() {
        let server = MockBackend::start(MockConfig::default()).unwrap();
        let tokens = Arc::new(MemoryTokenStore::new());
        let store = store_for(&server, tokens.clone());

        let pending = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.login(ADMIN_EMAIL, ADMIN_PASSWORD).await })
        };
        // Let the login reach its first network await
        tokio::task::yield_now().await;
        assert!(store.snapshot().is_loading);

        store.logout();
        let result = pending.await.unwrap();

        assert!(matches!(result, Err(Error::Superseded)));
        assert!(tokens.load().is_none());
        let session = store.snapshot();
        assert!(session.user.is_none());
        assert!(!session.is_loading);
    }

    #[tokio::test]
    async fn test_load_user_success() {
        let server = MockBackend::start(MockConfig::default()).unwrap();
        let tokens = Arc::new(MemoryTokenStore::with_token(
            server.token_for(MEMBER_EMAIL).unwrap(),
        ));
        let store = store_for(&server, tokens);

        let user = store.load_user().await.unwrap();
        assert_eq!(user.email, MEMBER_EMAIL);
        assert_eq!(store.current_user(), Some(user));
    }
}
