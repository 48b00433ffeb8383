//! Error types for the producer module

use thiserror::Error;

/// Error type for extraction producers
#[derive(Debug, Error)]
pub enum ProducerError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A CSS selector of a store profile is invalid
    #[error("Selector error: {0}")]
    Selector(String),

    /// The page could not be fetched within the retry budget
    #[error("Max retries exceeded for URL: {0}")]
    MaxRetriesExceeded(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
