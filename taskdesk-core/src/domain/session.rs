//! Client-side session snapshot

use serde::Serialize;

use super::User;

/// Coarse authentication state derived from a [`Session`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    LoggedOut,
    Loading,
    LoggedIn,
    Error,
}

/// Current user, loading flag and last login error
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user: Option<User>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Session {
    pub fn state(&self) -> SessionState {
        if self.is_loading {
            SessionState::Loading
        } else if self.user.is_some() {
            SessionState::LoggedIn
        } else if self.error.is_some() {
            SessionState::Error
        } else {
            SessionState::LoggedOut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;

    #[test]
    fn test_state_derivation() {
        let mut session = Session::default();
        assert_eq!(session.state(), SessionState::LoggedOut);

        session.error = Some("Login failed".to_string());
        assert_eq!(session.state(), SessionState::Error);

        session.is_loading = true;
        assert_eq!(session.state(), SessionState::Loading);

        session.is_loading = false;
        session.error = None;
        session.user = Some(User::new(1, "a@b.com", "A", UserRole::Admin));
        assert_eq!(session.state(), SessionState::LoggedIn);
    }
}
