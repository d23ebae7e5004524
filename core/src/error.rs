//! Error types for the entity client and the sync store.
//!
//! # Design
//! `ApiError` describes what went wrong on one HTTP exchange. `StoreError`
//! is what the store records for the UI: either the caller is not signed in
//! (detected locally, no request sent) or a remote call failed. The store
//! never returns these as `Err`; they land in `StoreState::last_error`.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Errors returned by `EntityClient` parse methods and `HttpExecutor`s.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The server returned 401, with its message if it sent one.
    #[error("not authenticated")]
    Unauthorized(Option<String>),

    /// The server returned 404, with its message if it sent one.
    #[error("resource not found")]
    NotFound(Option<String>),

    /// The server returned another non-2xx status.
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("no details"))]
    HttpError { status: u16, message: Option<String> },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}

impl ApiError {
    /// Human-readable explanation, or `None` when the failure carries none.
    pub fn detail(&self) -> Option<String> {
        match self {
            ApiError::HttpError { message, .. } => message.clone(),
            ApiError::Unauthorized(Some(msg)) | ApiError::NotFound(Some(msg)) => Some(msg.clone()),
            ApiError::Transport(msg) if msg.trim().is_empty() => None,
            ApiError::Transport(msg) => Some(msg.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Classify a non-2xx status, pulling the message out of a JSON error
    /// body such as `{"error": "..."}` or `{"message": "..."}`.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = error_message(body);
        match status {
            401 => ApiError::Unauthorized(message),
            404 => ApiError::NotFound(message),
            _ => ApiError::HttpError { status, message },
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed
            .error
            .or(parsed.message)
            .filter(|m| !m.trim().is_empty()),
        Err(_) => Some(body.to_string()),
    }
}

/// The store operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Fetch,
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Message recorded when the failure itself says nothing.
    pub fn fallback_message(self) -> &'static str {
        match self {
            Operation::Fetch => "failed to fetch entities",
            Operation::Create => "failed to create entity",
            Operation::Update => "failed to update entity",
            Operation::Delete => "failed to delete entity",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Fetch => "fetch",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Failures recorded by `EntityStore`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No signed-in user; no request was sent.
    #[error("user not authenticated")]
    AuthenticationRequired,

    /// The remote call failed.
    #[error("{message}")]
    RemoteOperationFailed { operation: Operation, message: String },
}

impl StoreError {
    pub fn remote(operation: Operation, err: &ApiError) -> Self {
        StoreError::RemoteOperationFailed {
            operation,
            message: err
                .detail()
                .unwrap_or_else(|| operation.fallback_message().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_error_body_is_unwrapped() {
        let err = ApiError::from_status(400, r#"{"error":"name is required"}"#);
        assert_eq!(err.detail().as_deref(), Some("name is required"));

        let err = ApiError::from_status(422, r#"{"message":"bad type"}"#);
        assert_eq!(err.detail().as_deref(), Some("bad type"));
    }

    #[test]
    fn plain_text_body_is_kept() {
        let err = ApiError::from_status(500, "internal error");
        assert_eq!(err.detail().as_deref(), Some("internal error"));
        assert_eq!(err.to_string(), "HTTP 500: internal error");
    }

    #[test]
    fn empty_body_has_no_detail() {
        assert_eq!(ApiError::from_status(502, "").detail(), None);
        assert_eq!(ApiError::from_status(502, "{}").detail(), None);
        assert_eq!(ApiError::Transport(String::new()).detail(), None);
    }

    #[test]
    fn auth_and_missing_statuses_keep_server_message() {
        let err = ApiError::from_status(404, r#"{"error":"category not found"}"#);
        assert_eq!(err, ApiError::NotFound(Some("category not found".to_string())));
        assert_eq!(err.detail().as_deref(), Some("category not found"));

        let err = ApiError::from_status(401, "");
        assert_eq!(err, ApiError::Unauthorized(None));
        assert_eq!(err.detail().as_deref(), Some("not authenticated"));
    }

    #[test]
    fn store_error_falls_back_per_operation() {
        let silent = ApiError::from_status(503, "");
        let err = StoreError::remote(Operation::Delete, &silent);
        assert_eq!(err.to_string(), "failed to delete entity");

        let loud = ApiError::Transport("connection refused".into());
        let err = StoreError::remote(Operation::Fetch, &loud);
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn authentication_message_is_fixed() {
        assert_eq!(
            StoreError::AuthenticationRequired.to_string(),
            "user not authenticated"
        );
    }
}
