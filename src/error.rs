//! Error types for the warden crate

use thiserror::Error;

use crate::classify::{self, ErrorClass};

/// Result type for warden operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for warden operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Unexpected response format
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// A transient failure persisted through every retry attempt
    #[error("transient failure after {attempts} attempts: {source}")]
    TransientExhausted {
        /// Attempts made before giving up
        attempts: u32,
        /// The last underlying failure
        #[source]
        source: Box<Error>,
    },

    /// The remote quota did not clear within the retry window
    #[error("quota exhausted after {attempts} attempts: {source}")]
    QuotaExhausted {
        /// Attempts made before giving up
        attempts: u32,
        /// The last underlying failure
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Classify this error for retry purposes.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Http(_) => ErrorClass::Transient,
            Error::Api { status, message } => classify::classify(*status, message),
            Error::TransientExhausted { .. } => ErrorClass::Transient,
            Error::QuotaExhausted { .. } => ErrorClass::QuotaExhausted,
            Error::Auth(_) | Error::InvalidRequest(_) | Error::UnexpectedResponse(_) => {
                ErrorClass::Fatal
            }
        }
    }
}
