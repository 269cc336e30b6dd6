//! Error types for the request boundary and the outbound Instagram and Discord calls.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Rejects a request before any interaction handling. Rendered as a plain-text HTTP error.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Invalid signature")]
    Unauthorized,

    #[error("Invalid JSON")]
    InvalidBody(#[source] serde_json::Error),

    #[error("Invalid application command data")]
    InvalidCommandData(#[source] serde_json::Error),

    #[error("Invalid modal submit data")]
    InvalidModalData(#[source] serde_json::Error),

    /// Instagram webhook body without a decodable `entry[0].messaging[0]`.
    #[error("Invalid webhook payload")]
    InvalidWebhook,
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::Unauthorized => StatusCode::UNAUTHORIZED,
            RequestError::InvalidBody(_)
            | RequestError::InvalidCommandData(_)
            | RequestError::InvalidModalData(_)
            | RequestError::InvalidWebhook => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Outbound send failure. The display string is the raw detail shown to the Discord user.
#[derive(Debug, Error)]
pub enum SendError {
    /// Transport-level failure (DNS, TLS, connection reset, ...).
    #[error("Request error: {0}")]
    Http(String),

    /// The API answered with a non-200 status; `body` is its raw response.
    #[error("{body}")]
    Rejected { status: u16, body: String },
}

/// Key or signature could not be parsed.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("invalid hex {what}: {source}")]
    Hex {
        what: &'static str,
        #[source]
        source: hex::FromHexError,
    },

    #[error("{what} must be {expected} bytes, got {got}")]
    Length {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("invalid Ed25519 public key")]
    InvalidKey,
}
