//! Error types for the client core.

use crate::request::ResponseMetadata;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the client core.
///
/// Transport and API errors propagate to the caller immediately; there
/// is no silent local retry. Token acquisition is retried up to a fixed
/// budget before failing.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request never received a response (network/timeout).
    #[error("transport error: {message}")]
    Transport {
        /// Underlying transport message.
        message: String,
    },

    /// The server responded with a structured failure.
    ///
    /// Carries the same metadata shape as a success, so rate-limit
    /// information stays available on error.
    #[error("{message}")]
    Api {
        /// Human-readable message (`"<domain> error code <code>: <serverMessage>"`).
        message: String,
        /// Server-supplied code, or the HTTP status when absent.
        code: u16,
        /// Response metadata, including the HTTP status and rate limits.
        metadata: ResponseMetadata,
    },

    /// The credential provider exhausted its retry budget.
    #[error("gave up acquiring credentials after {attempts} tries: {message}")]
    TokenAcquisition {
        /// Number of attempts made.
        attempts: u32,
        /// Last provider error.
        message: String,
    },

    /// A request or response body could not be (de)serialized.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Any other failure during request execution.
    #[error("unexpected client error: {message}")]
    Unknown {
        /// Description of the failure, with the original cause preserved.
        message: String,
    },
}

impl ClientError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Wraps an unexpected failure.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Returns the machine-checkable error code for API errors.
    pub fn code(&self) -> Option<u16> {
        match self {
            ClientError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns response metadata when the server responded.
    pub fn metadata(&self) -> Option<&ResponseMetadata> {
        match self {
            ClientError::Api { metadata, .. } => Some(metadata),
            _ => None,
        }
    }
}
