//! Error types for the aggregator module

use std::path::PathBuf;

use thiserror::Error;

/// Misuse of the producer lifecycle protocol
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    /// A stop arrived while no producer was open
    #[error("Producer stop without matching start: {store} / {search_term}")]
    UnbalancedStop { store: String, search_term: String },

    /// An event arrived after the report was already written
    #[error("Run already finished, event ignored: {0}")]
    RunFinished(String),
}

/// Error type for report output
#[derive(Debug, Error)]
pub enum SinkError {
    /// Filesystem error
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Could not find a free file name
    #[error("No free output file name for {0}")]
    NameExhausted(PathBuf),
}
