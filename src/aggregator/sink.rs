//! Report output
//!
//! `CsvSink` writes one spreadsheet-compatible file per run, named after the
//! run's start time. The file is always created fresh: when the name is
//! taken a numeric suffix is added instead of overwriting.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Local};
use tracing::debug;

use crate::aggregator::error::SinkError;
use crate::record::{OUTPUT_COLUMNS, OutputRow};

/// File name prefix of run reports
pub const REPORT_PREFIX: &str = "output_ARKERESO";

const MAX_NAME_SUFFIX: u32 = 1000;

/// Destination of the sorted report rows.
///
/// `write` is synchronous and may block on file I/O. It runs inside the last
/// `on_producer_stopped` call, which async callers should issue from the
/// blocking pool.
pub trait RowSink: Send + Sync {
    /// Persist `rows` for the run started at `started_at` and return where they went
    fn write(
        &self,
        rows: &[OutputRow],
        started_at: DateTime<Local>,
    ) -> Result<PathBuf, SinkError>;
}

/// Writes `output_ARKERESO_{YYYYmmdd_HHMMSS}.csv` into a directory
#[derive(Debug, Clone)]
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Base file name for a run
    pub fn file_name(started_at: DateTime<Local>) -> String {
        format!("{}_{}", REPORT_PREFIX, started_at.format("%Y%m%d_%H%M%S"))
    }

    fn create_unique(&self, stem: &str) -> Result<(PathBuf, File), SinkError> {
        for n in 0..MAX_NAME_SUFFIX {
            let name = if n == 0 {
                format!("{}.csv", stem)
            } else {
                format!("{}_{}.csv", stem, n)
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("{} exists, trying next name", path.display());
                }
                Err(source) => return Err(SinkError::Io { path, source }),
            }
        }
        Err(SinkError::NameExhausted(self.dir.join(stem)))
    }
}

impl RowSink for CsvSink {
    fn write(
        &self,
        rows: &[OutputRow],
        started_at: DateTime<Local>,
    ) -> Result<PathBuf, SinkError> {
        let (path, file) = self.create_unique(&Self::file_name(started_at))?;

        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(OUTPUT_COLUMNS)?;
        for row in rows {
            writer.write_record(row.to_csv_record())?;
        }
        writer.flush().map_err(|source| SinkError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }
}

/// Keeps every written batch in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    batches: Arc<Mutex<Vec<Vec<OutputRow>>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All batches written so far
    pub fn batches(&self) -> Vec<Vec<OutputRow>> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RowSink for MemorySink {
    fn write(
        &self,
        rows: &[OutputRow],
        _started_at: DateTime<Local>,
    ) -> Result<PathBuf, SinkError> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(rows.to_vec());
        Ok(Path::new("memory").to_path_buf())
    }
}
