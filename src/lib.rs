//! # Arkereso - Hardware-Store Price Finder
//!
//! Searches several Hungarian hardware stores for a list of product terms,
//! checks every hit for relevance with a locally hosted language model and
//! writes a single consolidated report per run.
//!
//! ## Features
//!
//! - Store search producers for Bauhaus, OBI and Praktiker
//! - Relevance classification with retries, timeouts and a keyword fallback
//! - Completeness tracking: every (store, term) pair gets at least one row
//! - One sorted, timestamped report written when the last producer stops
//! - Async API with Tokio
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use arkereso::aggregator::{Aggregator, CsvSink};
//! use arkereso::classifier::{Classifier, ClassifierConfig};
//! use arkereso::driver::RunDriver;
//! use arkereso::producer::{HttpProducer, ProducerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let producers = HttpProducer::for_all_stores(&ProducerConfig::default())?;
//!     let classifier = Classifier::ollama(ClassifierConfig::default())?;
//!     let aggregator = Aggregator::new(CsvSink::new("."));
//!
//!     let outcome = RunDriver::new(producers, Arc::new(classifier), Arc::new(aggregator))
//!         .run(&["hammer".to_string()])
//!         .await?;
//!
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

mod error;

pub mod aggregator;
pub mod classifier;
pub mod driver;
pub mod input;
pub mod producer;
pub mod record;

pub use error::{Error, Result};

/// Re-export of the types most callers need
pub mod prelude {
    pub use crate::aggregator::{Aggregator, ProducerObserver, RunOutcome};
    pub use crate::classifier::{Classifier, ClassifierConfig};
    pub use crate::driver::RunDriver;
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::record::{ClassifiedRecord, MatchRecord, OutputRow, Status, Verdict};
}
