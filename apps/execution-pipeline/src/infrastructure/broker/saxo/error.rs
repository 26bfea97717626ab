//! Saxo transport error types.

use thiserror::Error;

use crate::application::ports::{CredentialError, RateLimitSnapshot, VenueError};

/// Errors from the Saxo HTTP transport.
#[derive(Debug, Error, Clone)]
pub enum TransportError {
    /// 401 or 403.
    #[error("authentication rejected (HTTP {status})")]
    Authentication {
        /// HTTP status.
        status: u16,
    },

    /// 429 after the retry budget was spent.
    #[error("rate limited after {attempts} attempt(s)")]
    RateLimited {
        /// Attempts made.
        attempts: u32,
        /// Rate-limit headers of the last response.
        rate_limits: RateLimitSnapshot,
    },

    /// Any other non-2xx response.
    #[error("HTTP {status}: {message}")]
    Remote {
        /// HTTP status.
        status: u16,
        /// Venue `ErrorCode`, when the body carried one.
        error_code: Option<String>,
        /// Venue `Message`, or a body excerpt.
        message: String,
        /// Rate-limit headers of the last response.
        rate_limits: RateLimitSnapshot,
    },

    /// Timeout or connection failure after the retry budget was spent.
    #[error("transient failure: {message}")]
    Transient {
        /// Error description.
        message: String,
        /// Whether the request timed out.
        timeout: bool,
    },

    /// The body was not the JSON we expected.
    #[error("malformed response: {message}")]
    MalformedResponse {
        /// Parse error.
        message: String,
    },

    /// No bearer token available.
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    /// The request could not be built or encoded.
    #[error("invalid request: {0}")]
    Request(String),
}

impl TransportError {
    /// Build a malformed-response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// HTTP status, when the error came from a response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status } | Self::Remote { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transient {
            timeout: err.is_timeout(),
            message: err.to_string(),
        }
    }
}

impl From<TransportError> for VenueError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Authentication { status } => Self::Authentication { status },
            TransportError::RateLimited {
                attempts,
                rate_limits,
            } => Self::RateLimited {
                attempts,
                rate_limits,
            },
            TransportError::Remote {
                status: 404,
                message,
                ..
            } => Self::NotFound { what: message },
            TransportError::Remote {
                status,
                error_code,
                message,
                rate_limits,
            } => Self::Remote {
                status,
                code: error_code,
                message,
                rate_limits,
            },
            TransportError::Transient { message, timeout } => Self::Transient { message, timeout },
            TransportError::Request(message) => Self::Transient {
                message,
                timeout: false,
            },
            TransportError::MalformedResponse { message } => Self::MalformedResponse { message },
            TransportError::Credentials(e) => Self::Credentials {
                message: e.to_string(),
            },
        }
    }
}
