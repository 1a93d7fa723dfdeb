// src/error.rs
//! Error taxonomy.
//!
//! [`ClientError`] covers every failure a client caller can observe.
//! Transport-class failures (`Transport`, `Server`) make no claim about the
//! state of the remote certificate store. [`ServerError`] is the reference
//! server's side of the same contract, one variant per status it emits.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::storage::StoreError;

/// Result alias used across the client side of the crate.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Failures surfaced by client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Credential missing, expired or rejected. Forces a logout.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Malformed input, detected locally or reported by the server.
    #[error("{message}")]
    Validation {
        /// Offending input field, when known
        field: Option<String>,
        message: String,
    },

    /// No certificate (or admin) behind the given identifier.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request contradicts current server state, e.g. a second revocation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Network failure, timeout or an undecodable response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server fault reported with a non-success status.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Local storage (token store, downloaded documents) failed.
    #[error("local storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// Validation failure attributed to a single input field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ClientError::Validation {
            field: Some(field.to_string()),
            message: message.into(),
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, ClientError::Authentication(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }

    /// True for failures that say nothing about the certificate itself.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Server { .. })
    }

    /// Maps a non-success HTTP status and its body onto the taxonomy.
    ///
    /// The message comes from the server's `error` (or `message`) field when
    /// the body is JSON, falling back to the canonical status text.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = ErrorBody::message_from(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string()
        });

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::UNPROCESSABLE_ENTITY => {
                ClientError::Authentication(message)
            }
            StatusCode::BAD_REQUEST => ClientError::Validation {
                field: None,
                message,
            },
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::CONFLICT => ClientError::Conflict(message),
            _ => ClientError::Server {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// Failures of reference server operations, mapped onto HTTP statuses by the
/// API layer.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ServerError {
    /// 400
    #[error("{0}")]
    BadRequest(String),
    /// 401
    #[error("{0}")]
    Unauthorized(String),
    /// 404
    #[error("{0}")]
    NotFound(String),
    /// 409
    #[error("{0}")]
    Conflict(String),
    /// 500
    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ServerError::NotFound(err.to_string()),
            StoreError::AlreadyRevoked => ServerError::Conflict(err.to_string()),
            StoreError::EmptyReason => ServerError::BadRequest(err.to_string()),
            StoreError::DuplicateUuid(_) | StoreError::DuplicateAdmin(_) => {
                ServerError::Internal(err.to_string())
            }
        }
    }
}

impl From<ClientError> for ServerError {
    /// Input validation shares its rules with the client; anything else
    /// reaching the server this way is an internal fault.
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Validation { message, .. } => ServerError::BadRequest(message),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

/// Error payload shape used by the certificate API.
#[derive(Deserialize, Debug, Default)]
pub(crate) struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

impl ErrorBody {
    pub(crate) fn message_from(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        parsed
            .error
            .or(parsed.message)
            .filter(|m| !m.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = ClientError::from_response(StatusCode::CONFLICT, r#"{"error":"Certificate already revoked"}"#);
        assert!(matches!(err, ClientError::Conflict(ref m) if m == "Certificate already revoked"));

        let err = ClientError::from_response(StatusCode::UNAUTHORIZED, "");
        assert!(err.is_authentication());

        let err = ClientError::from_response(StatusCode::NOT_FOUND, r#"{"message":"Certificate not found"}"#);
        assert!(err.is_not_found());

        let err = ClientError::from_response(StatusCode::BAD_GATEWAY, "<html>");
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "server error (502): Bad Gateway");
    }

    #[test]
    fn test_validation_message_from_server() {
        let err = ClientError::from_response(StatusCode::BAD_REQUEST, r#"{"error":"Program is required"}"#);
        match err {
            ClientError::Validation { field, message } => {
                assert!(field.is_none());
                assert_eq!(message, "Program is required");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_store_errors_map_to_server_statuses() {
        assert_eq!(
            ServerError::from(StoreError::AlreadyRevoked),
            ServerError::Conflict("Certificate already revoked".into())
        );
        assert!(matches!(ServerError::from(StoreError::NotFound), ServerError::NotFound(_)));
        assert!(matches!(ServerError::from(StoreError::EmptyReason), ServerError::BadRequest(_)));

        let err = ServerError::from(ClientError::invalid_field("program", "Program is required"));
        assert_eq!(err, ServerError::BadRequest("Program is required".into()));
    }
}
