//! Result and error types for the core library

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// HTTP failures are classified by status code; each carries the backend's
/// `detail` message when one was sent.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Not authenticated: {}", .0.as_deref().unwrap_or("invalid or expired token"))]
    Unauthorized(Option<String>),

    #[error("Validation error: {}", .0.as_deref().unwrap_or("invalid input"))]
    Validation(Option<String>),

    #[error("Permission denied: {}", .0.as_deref().unwrap_or("not enough permissions"))]
    Forbidden(Option<String>),

    #[error("Not found: {}", .0.as_deref().unwrap_or("resource does not exist"))]
    NotFound(Option<String>),

    #[error("Server error (HTTP {status}): {}", .detail.as_deref().unwrap_or("no details"))]
    Api { status: u16, detail: Option<String> },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Superseded by a newer session operation")]
    Superseded,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Classify a non-2xx response
    pub fn from_status(status: u16, detail: Option<String>) -> Self {
        match status {
            401 => Self::Unauthorized(detail),
            403 => Self::Forbidden(detail),
            404 => Self::NotFound(detail),
            422 => Self::Validation(detail),
            _ => Self::Api { status, detail },
        }
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// HTTP status of the failed response, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::Validation(_) => Some(422),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message sent by the backend, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Unauthorized(d)
            | Self::Forbidden(d)
            | Self::NotFound(d)
            | Self::Validation(d) => d.as_deref(),
            Self::Api { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// True when no response was received at all
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result for `--json` output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(Error::from_status(401, None), Error::Unauthorized(None)));
        assert!(matches!(Error::from_status(403, None), Error::Forbidden(None)));
        assert!(matches!(Error::from_status(404, None), Error::NotFound(None)));
        assert!(matches!(Error::from_status(422, None), Error::Validation(None)));
        assert!(matches!(
            Error::from_status(500, None),
            Error::Api { status: 500, detail: None }
        ));
    }

    #[test]
    fn test_status_and_detail_roundtrip() {
        let err = Error::from_status(403, Some("Users can only update task status".to_string()));
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.detail(), Some("Users can only update task status"));
        assert!(err.to_string().contains("Users can only update task status"));

        let err = Error::Transport("connection refused".to_string());
        assert_eq!(err.status(), None);
        assert!(err.is_transport());
    }

    #[test]
    fn test_operation_result_fail() {
        let result: OperationResult<i32> = OperationResult::fail("Something went wrong");
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.error, Some("Something went wrong".to_string()));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "data": null, "error": "Something went wrong"})
        );
    }

    #[test]
    fn test_from_result() {
        let ok: Result<i32> = Ok(42);
        let result: OperationResult<i32> = ok.into();
        assert!(result.success);
        assert_eq!(result.data, Some(42));

        let err: Result<i32> = Err(Error::from_status(422, None));
        let result: OperationResult<i32> = err.into();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Validation error"));
    }
}
