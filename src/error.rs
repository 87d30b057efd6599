//! Error types for the Drone client.
//!
//! Every failure is scoped to the operation that produced it: one request, or
//! one pushed message. Nothing in this crate is fatal to the process.
//!
//! | Variant | Raised by | Error sink |
//! |---------|-----------|------------|
//! | [`DroneError::Request`] | status `>= 300` | invoked |
//! | [`DroneError::Transport`] | network failure before a status arrived | not invoked |
//! | [`DroneError::Json`] | unparsable JSON body or stream message | not invoked |
//! | [`DroneError::Stream`] | push connection refused by the server | n/a |

use std::fmt;
use thiserror::Error;

/// Result type for Drone client operations.
pub type Result<T> = std::result::Result<T, DroneError>;

/// A request the server answered with a status of 300 or above.
///
/// `message` carries the raw response body, untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFailure {
    /// HTTP status code returned by the server.
    pub status: u16,
    /// Raw response body.
    pub message: String,
}

impl RequestFailure {
    /// Create a failure value from a status and raw body.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        RequestFailure {
            status,
            message: message.into(),
        }
    }

    /// Whether the server rejected the credentials (401 or 403).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status, 401 | 403)
    }
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for RequestFailure {}

/// Errors produced by the Drone client.
#[derive(Error, Debug)]
pub enum DroneError {
    /// The server answered with a failure status.
    #[error("Request failed with status {0}")]
    Request(RequestFailure),

    /// The exchange could not be established or completed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A body or stream message was not valid JSON, or a payload could not be encoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server refused to open an event stream.
    #[error("Stream error: {0}")]
    Stream(String),
}

impl DroneError {
    /// The HTTP status behind this error, if the server sent one.
    pub fn status(&self) -> Option<u16> {
        match self {
            DroneError::Request(failure) => Some(failure.status),
            _ => None,
        }
    }

    /// The structured failure for status errors.
    pub fn as_request_failure(&self) -> Option<&RequestFailure> {
        match self {
            DroneError::Request(failure) => Some(failure),
            _ => None,
        }
    }

    /// Check if this is a status failure (`>= 300`)
    pub fn is_request_failure(&self) -> bool {
        matches!(self, DroneError::Request(_))
    }

    /// Check if the exchange never produced a status
    pub fn is_transport(&self) -> bool {
        matches!(self, DroneError::Transport(_))
    }
}

impl From<RequestFailure> for DroneError {
    fn from(failure: RequestFailure) -> Self {
        DroneError::Request(failure)
    }
}

impl From<reqwest::Error> for DroneError {
    fn from(err: reqwest::Error) -> Self {
        DroneError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_failure_display() {
        let err = DroneError::from(RequestFailure::new(403, "Not Authorized"));
        assert_eq!(err.to_string(), "Request failed with status 403: Not Authorized");
        assert_eq!(err.status(), Some(403));
        assert!(err.is_request_failure());
        assert!(!err.is_transport());
    }

    #[test]
    fn test_transport_error_has_no_status() {
        let err = DroneError::Transport("connection refused".into());
        assert_eq!(err.status(), None);
        assert!(err.as_request_failure().is_none());
        assert!(err.is_transport());
    }

    #[test]
    fn test_unauthorized_statuses() {
        assert!(RequestFailure::new(401, "").is_unauthorized());
        assert!(RequestFailure::new(403, "").is_unauthorized());
        assert!(!RequestFailure::new(404, "").is_unauthorized());
    }
}
