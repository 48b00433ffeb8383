//! Error types for the arkereso crate

use thiserror::Error;

use crate::aggregator::AggregateError;
use crate::producer::ProducerError;

/// Result type for arkereso operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for arkereso operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Extraction producer error
    #[error("Producer error: {0}")]
    Producer(String),

    /// Aggregation bookkeeping error
    #[error("Aggregate error: {0}")]
    Aggregate(#[from] AggregateError),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<ProducerError> for Error {
    fn from(err: ProducerError) -> Self {
        match err {
            ProducerError::Http(e) => Error::Http(e),
            _ => Error::Producer(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_producer_errors_keep_their_message() {
        let err = Error::from(ProducerError::Selector("'li..x': bad".to_string()));
        assert!(matches!(&err, Error::Producer(msg) if msg.contains("li..x")));
    }

    #[test]
    fn test_aggregate_errors_convert() {
        let err = Error::from(AggregateError::RunFinished("stop of [OBI] saw".to_string()));
        assert!(matches!(err, Error::Aggregate(AggregateError::RunFinished(_))));
    }
}
