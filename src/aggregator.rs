//! # Aggregation Module
//!
//! Collects classified rows from many concurrently running producers and
//! turns them into exactly one report per run.
//!
//! ## Key Components
//!
//! - `ProducerObserver`: lifecycle callbacks a run driver wires to every producer
//! - `Aggregator`: the per-run collector; owns the open-producer counter, the
//!   expected and found (store, term) sets and the row list
//! - `sort_rows`: the deterministic final ordering
//! - `RowSink`: where the sorted rows go (`CsvSink`, `MemorySink`)
//!
//! ## Completeness
//!
//! Every (store, term) pair announced by a producer start ends up with at
//! least one row: when its producer stops without having delivered anything,
//! a NO_RESULT placeholder is synthesized. When the last open producer stops
//! the rows are sorted and written once.

mod error;
mod order;
mod sink;

pub use error::{AggregateError, SinkError};
pub use order::{sort_rows, status_priority};
pub use sink::{CsvSink, MemorySink, REPORT_PREFIX, RowSink};

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use chrono::{DateTime, Local};
use tracing::{debug, error, info, warn};

use crate::record::{ClassifiedRecord, Combination, OutputRow};

/// Lifecycle notifications from extraction producers.
///
/// Every `on_producer_started` must be followed by exactly one
/// `on_producer_stopped` for the same pair.
pub trait ProducerObserver: Send + Sync {
    fn on_producer_started(&self, store: &str, search_term: &str) -> Result<(), AggregateError>;

    fn on_record_received(&self, record: ClassifiedRecord) -> Result<(), AggregateError>;

    fn on_producer_stopped(&self, store: &str, search_term: &str) -> Result<(), AggregateError>;
}

/// How the run's report ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The report was written
    Written { path: PathBuf, rows: usize },
    /// Nothing was collected, no file was produced
    Empty,
    /// Writing failed; the collected rows are lost
    Failed { reason: String },
}

#[derive(Debug, Default)]
struct RunState {
    open_producers: usize,
    expected: HashSet<Combination>,
    found: HashSet<Combination>,
    placeholders: HashSet<Combination>,
    rows: Vec<OutputRow>,
    finished: bool,
}

/// Per-run result collector
pub struct Aggregator {
    state: Mutex<RunState>,
    sink: Box<dyn RowSink>,
    started_at: DateTime<Local>,
    outcome: OnceLock<RunOutcome>,
}

impl Aggregator {
    /// Collector for a run starting now
    pub fn new(sink: impl RowSink + 'static) -> Self {
        Self::started_at(sink, Local::now())
    }

    pub fn started_at(sink: impl RowSink + 'static, started_at: DateTime<Local>) -> Self {
        Self {
            state: Mutex::new(RunState::default()),
            sink: Box::new(sink),
            started_at,
            outcome: OnceLock::new(),
        }
    }

    pub fn run_started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Set once the last producer stopped and the report was handled
    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.get()
    }

    pub fn open_producers(&self) -> usize {
        self.lock().open_producers
    }

    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// Rows collected and not yet written
    pub fn pending_rows(&self) -> usize {
        self.lock().rows.len()
    }

    /// Expected pairs that have not delivered a record yet, sorted
    pub fn outstanding(&self) -> Vec<Combination> {
        let state = self.lock();
        let mut outstanding: Vec<Combination> =
            state.expected.difference(&state.found).cloned().collect();
        outstanding.sort();
        outstanding
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, mut rows: Vec<OutputRow>) {
        let outcome = if rows.is_empty() {
            warn!("No rows collected, no report written");
            RunOutcome::Empty
        } else {
            sort_rows(&mut rows);
            match self.sink.write(&rows, self.started_at) {
                Ok(path) => {
                    info!("Saved {} rows to {}", rows.len(), path.display());
                    log_summary(&rows);
                    RunOutcome::Written {
                        path,
                        rows: rows.len(),
                    }
                }
                Err(e) => {
                    error!("Failed to write report: {}", e);
                    RunOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        };

        if self.outcome.set(outcome).is_err() {
            error!("Run outcome was already recorded");
        }
    }
}

impl ProducerObserver for Aggregator {
    fn on_producer_started(&self, store: &str, search_term: &str) -> Result<(), AggregateError> {
        let combination = Combination::new(store, search_term);
        let mut state = self.lock();
        if state.finished {
            return Err(AggregateError::RunFinished(format!("start of {}", combination)));
        }

        state.open_producers += 1;
        info!(
            "Producer started: {} (open: {})",
            combination, state.open_producers
        );
        if !combination.search_term.is_empty() {
            state.expected.insert(combination);
        }
        Ok(())
    }

    fn on_record_received(&self, record: ClassifiedRecord) -> Result<(), AggregateError> {
        let combination = Combination::new(&record.record.store, &record.record.search_term);
        let mut state = self.lock();
        if state.finished {
            return Err(AggregateError::RunFinished(format!("record for {}", combination)));
        }

        let row = OutputRow::from(record);
        if combination.is_complete() {
            state.found.insert(combination.clone());
        }

        if row.is_blank() {
            debug!("Dropping blank row for {}", combination);
            return Ok(());
        }

        info!(
            "Row added: {} -> {}",
            combination,
            row.name.chars().take(60).collect::<String>()
        );
        state.rows.push(row);
        Ok(())
    }

    fn on_producer_stopped(&self, store: &str, search_term: &str) -> Result<(), AggregateError> {
        let combination = Combination::new(store, search_term);
        let rows = {
            let mut state = self.lock();
            if state.finished {
                return Err(AggregateError::RunFinished(format!("stop of {}", combination)));
            }
            if state.open_producers == 0 {
                return Err(AggregateError::UnbalancedStop {
                    store: combination.store,
                    search_term: combination.search_term,
                });
            }

            if combination.is_complete()
                && state.expected.contains(&combination)
                && !state.found.contains(&combination)
                && !state.placeholders.contains(&combination)
            {
                info!("No result for {}, placeholder row added", combination);
                state.rows.push(OutputRow::no_result(&combination));
                state.placeholders.insert(combination.clone());
            }

            state.open_producers -= 1;
            info!(
                "Producer stopped: {} (open: {})",
                combination, state.open_producers
            );
            if state.open_producers > 0 {
                return Ok(());
            }

            state.finished = true;
            std::mem::take(&mut state.rows)
        };

        self.finish(rows);
        Ok(())
    }
}

fn log_summary(rows: &[OutputRow]) {
    let mut counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for row in rows {
        *counts
            .entry((row.store.as_str(), row.search_term.as_str()))
            .or_default() += 1;
    }

    info!("Rows per store and search term:");
    for ((store, term), count) in counts {
        info!("   - {} | {}: {} rows", store, term, count);
    }
}
