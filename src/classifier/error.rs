//! Error types for the classifier module

use thiserror::Error;

/// Error type for judgement-service calls
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Service error: {status_code} - {message}")]
    Service {
        /// HTTP status code
        status_code: u16,
        /// Response body
        message: String,
    },

    /// The attempt exceeded its time budget
    #[error("Attempt timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Response body did not have the expected envelope
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// Every attempt failed
    #[error("Judgement service unavailable after {attempts} attempts: {last}")]
    Unavailable {
        attempts: u32,
        last: String,
    },

    /// Other errors
    #[error("{0}")]
    Other(String),
}
