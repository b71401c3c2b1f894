//! Session lifecycle against the in-process mock backend
//!
//! Exercises login, logout and user restoration through a full
//! `TaskdeskContext` with a file-backed token store, the way the CLI runs.
//!
//! Run with: cargo test --test session_flow_test -- --nocapture

use std::sync::Arc;

use tempfile::TempDir;

use taskdesk_core::adapters::mock_backend::{
    MockBackend, MockConfig, ADMIN_EMAIL, ADMIN_PASSWORD, MANAGER_EMAIL, MANAGER_PASSWORD,
    MEMBER_EMAIL, MEMBER_PASSWORD,
};
use taskdesk_core::adapters::token_store::FileTokenStore;
use taskdesk_core::config::Config;
use taskdesk_core::ports::TokenStore;
use taskdesk_core::{Error, SessionState, TaskdeskContext};

// ============================================================================
// Test Helpers
// ============================================================================

fn start_backend() -> MockBackend {
    MockBackend::start(MockConfig::default()).expect("Failed to start mock backend")
}

/// Context rooted in a temp dir, pointed at the mock backend
fn context_for(server: &MockBackend, dir: &TempDir) -> TaskdeskContext {
    let mut config = Config::default();
    config
        .set_api_url(&server.base_url())
        .expect("Mock URL is valid");
    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(dir.path()));
    TaskdeskContext::with_parts(config, tokens).expect("Failed to build context")
}

// ============================================================================
// Login / Logout
// ============================================================================

#[tokio::test]
async fn test_login_then_logout_leaves_nothing_behind() {
    let server = start_backend();
    let dir = TempDir::new().unwrap();
    let ctx = context_for(&server, &dir);

    ctx.session.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();
    assert_eq!(ctx.session.state(), SessionState::LoggedIn);
    assert!(ctx.tokens.load().is_some());

    ctx.session.logout();

    assert!(ctx.tokens.load().is_none());
    assert!(ctx.session.current_user().is_none());
    assert_eq!(ctx.session.state(), SessionState::LoggedOut);
}

#[tokio::test]
async fn test_bad_password_reports_backend_detail() {
    let server = start_backend();
    let dir = TempDir::new().unwrap();
    let ctx = context_for(&server, &dir);

    let result = ctx.session.login(ADMIN_EMAIL, "wrong").await;

    match result {
        Err(Error::Unauthorized(detail)) => {
            assert_eq!(detail.as_deref(), Some("Incorrect credentials"))
        }
        other => panic!("expected 401, got {:?}", other),
    }
    let session = ctx.session.snapshot();
    assert_eq!(session.error.as_deref(), Some("Incorrect credentials"));
    assert!(session.user.is_none());
    assert!(!session.is_loading);
    assert!(ctx.tokens.load().is_none());
}

#[tokio::test]
async fn test_login_submits_form_encoded_credentials() {
    let server = start_backend();
    let dir = TempDir::new().unwrap();
    let ctx = context_for(&server, &dir);

    ctx.session.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

    let requests = server.requests();
    let login = &requests[0];
    assert_eq!(login.method, "POST");
    assert!(login.path.ends_with("/auth/login"));
    assert_eq!(
        login.header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert!(login.json_body().is_none());

    let fields: Vec<(String, String)> = url::form_urlencoded::parse(login.body.as_bytes())
        .into_owned()
        .collect();
    assert_eq!(
        fields,
        vec![
            ("username".to_string(), ADMIN_EMAIL.to_string()),
            ("password".to_string(), ADMIN_PASSWORD.to_string()),
        ]
    );
}

#[tokio::test]
async fn test_unreachable_backend_falls_back_to_generic_error() {
    let dir = TempDir::new().unwrap();
    let port = {
        let server = start_backend();
        server.port()
    };
    let mut config = Config::default();
    config
        .set_api_url(&format!("http://127.0.0.1:{}/api/v1", port))
        .unwrap();
    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(dir.path()));
    let ctx = TaskdeskContext::with_parts(config, tokens).unwrap();

    let result = ctx.session.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    assert!(result.unwrap_err().is_transport());
    assert_eq!(ctx.session.snapshot().error.as_deref(), Some("Login failed"));
}

#[tokio::test]
async fn test_new_login_clears_previous_error() {
    let server = start_backend();
    let dir = TempDir::new().unwrap();
    let ctx = context_for(&server, &dir);

    let _ = ctx.session.login(MEMBER_EMAIL, "nope").await;
    assert_eq!(ctx.session.state(), SessionState::Error);

    ctx.session.login(MEMBER_EMAIL, MEMBER_PASSWORD).await.unwrap();
    assert!(ctx.session.snapshot().error.is_none());
}

#[tokio::test]
async fn test_latest_login_wins() {
    let server = start_backend();
    let dir = TempDir::new().unwrap();
    let ctx = Arc::new(context_for(&server, &dir));

    let earlier = {
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move { ctx.session.login(MANAGER_EMAIL, MANAGER_PASSWORD).await })
    };
    tokio::task::yield_now().await;

    let admin = ctx.session.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();
    let earlier = earlier.await.unwrap();

    assert!(matches!(earlier, Err(Error::Superseded)));
    assert_eq!(ctx.session.current_user(), Some(admin));
    assert_eq!(ctx.tokens.load(), server.token_for(ADMIN_EMAIL));
}

#[tokio::test]
async fn test_superseded_failed_login_is_discarded() {
    let server = start_backend();
    let dir = TempDir::new().unwrap();
    let ctx = Arc::new(context_for(&server, &dir));

    let earlier = {
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move { ctx.session.login(MANAGER_EMAIL, "wrong").await })
    };
    tokio::task::yield_now().await;

    let admin = ctx.session.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();
    let earlier = earlier.await.unwrap();

    assert!(matches!(earlier, Err(Error::Superseded)));
    let session = ctx.session.snapshot();
    assert!(session.error.is_none());
    assert!(!session.is_loading);
    assert_eq!(session.user, Some(admin));
    assert_eq!(ctx.tokens.load(), server.token_for(ADMIN_EMAIL));
}

// ============================================================================
// Restoring a session
// ============================================================================

#[tokio::test]
async fn test_load_user_without_token_is_a_no_op() {
    let server = start_backend();
    let dir = TempDir::new().unwrap();
    let ctx = context_for(&server, &dir);
    let before = ctx.session.snapshot();

    assert!(ctx.session.load_user().await.is_none());

    assert!(server.requests().is_empty());
    assert_eq!(ctx.session.snapshot(), before);
}

#[tokio::test]
async fn test_load_user_restores_across_contexts() {
    let server = start_backend();
    let dir = TempDir::new().unwrap();

    context_for(&server, &dir)
        .session
        .login(MANAGER_EMAIL, MANAGER_PASSWORD)
        .await
        .unwrap();

    let restarted = context_for(&server, &dir);
    assert!(restarted.session.current_user().is_none());
    let user = restarted.session.load_user().await.unwrap();

    assert_eq!(user.email, MANAGER_EMAIL);
    assert_eq!(restarted.session.state(), SessionState::LoggedIn);
}

#[tokio::test]
async fn test_rejected_token_is_cleared_silently() {
    let server = start_backend();
    let dir = TempDir::new().unwrap();
    let ctx = context_for(&server, &dir);
    ctx.tokens.save("expired-token").unwrap();

    assert!(ctx.session.load_user().await.is_none());

    let session = ctx.session.snapshot();
    assert!(session.user.is_none());
    assert!(session.error.is_none());
    assert!(!session.is_loading);
    assert!(ctx.tokens.load().is_none());
}

#[tokio::test]
async fn test_reset_logs_out() {
    let server = start_backend();
    let dir = TempDir::new().unwrap();
    let ctx = context_for(&server, &dir);
    ctx.session.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

    ctx.reset();

    assert!(ctx.tokens.load().is_none());
    assert!(ctx.session.current_user().is_none());
}

// ============================================================================
// Bearer injection
// ============================================================================

#[tokio::test]
async fn test_bearer_header_tracks_persisted_token() {
    let server = start_backend();
    let dir = TempDir::new().unwrap();
    let ctx = context_for(&server, &dir);

    ctx.tasks.list_tasks().await;
    ctx.session.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();
    ctx.tasks.list_tasks().await;
    ctx.session.logout();
    ctx.tasks.list_tasks().await;

    let task_requests: Vec<_> = server
        .requests()
        .into_iter()
        .filter(|r| r.path == "/api/v1/tasks")
        .collect();
    assert_eq!(task_requests.len(), 3);

    let expected = format!("Bearer {}", server.token_for(ADMIN_EMAIL).unwrap());
    assert_eq!(task_requests[0].authorization(), None);
    assert_eq!(task_requests[1].authorization(), Some(expected.as_str()));
    assert_eq!(task_requests[2].authorization(), None);
}

#[tokio::test]
async fn test_requests_default_to_json_content_type() {
    let server = start_backend();
    let dir = TempDir::new().unwrap();
    let ctx = context_for(&server, &dir);

    ctx.tasks.list_tasks().await;

    let request = server.requests().pop().unwrap();
    assert_eq!(request.header("content-type"), Some("application/json"));
}
