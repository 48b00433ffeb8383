//! Search-term input table
//!
//! Terms come from a CSV file with a header row. The term column is looked up
//! by name; values are trimmed, blanks dropped and repeats kept once.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

/// Default name of the term column
pub const DEFAULT_TERM_COLUMN: &str = "termek";

/// Accepted when the configured column is missing
pub const ALTERNATE_TERM_COLUMN: &str = "search_term";

/// Error type for reading the input table
#[derive(Debug, Error)]
pub enum InputError {
    /// The input file does not exist
    #[error("Input file not found: {0}")]
    NotFound(PathBuf),

    /// CSV decoding error
    #[error("Could not read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The term column is not in the header
    #[error("{path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: String },

    /// No usable terms
    #[error("{0} contains no search terms")]
    Empty(PathBuf),
}

/// Read the search terms from `path`
pub fn load_search_terms(path: &Path, column: &str) -> Result<Vec<String>, InputError> {
    if !path.exists() {
        return Err(InputError::NotFound(path.to_path_buf()));
    }

    let csv_error = |source| InputError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(csv_error)?;

    let headers = reader.headers().map_err(csv_error)?.clone();
    let index = headers
        .iter()
        .position(|h| h == column)
        .or_else(|| headers.iter().position(|h| h == ALTERNATE_TERM_COLUMN))
        .ok_or_else(|| InputError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        })?;

    let mut seen = HashSet::new();
    let mut terms = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let Some(term) = record.get(index).map(str::trim) else {
            continue;
        };
        if !term.is_empty() && seen.insert(term.to_string()) {
            terms.push(term.to_string());
        }
    }

    if terms.is_empty() {
        return Err(InputError::Empty(path.to_path_buf()));
    }

    info!("Loaded {} search terms from {}", terms.len(), path.display());
    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_input(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_reads_trimmed_unique_terms() {
        let file = write_input("id,termek\n1, hammer \n2,\n3,E27 bulb\n4,hammer\n5\n");
        let terms = load_search_terms(file.path(), DEFAULT_TERM_COLUMN).unwrap();
        assert_eq!(terms, vec!["hammer", "E27 bulb"]);
    }

    #[test]
    fn test_alternate_column_name() {
        let file = write_input("search_term\nsaw\n");
        let terms = load_search_terms(file.path(), DEFAULT_TERM_COLUMN).unwrap();
        assert_eq!(terms, vec!["saw"]);
    }

    #[test]
    fn test_missing_file() {
        let result = load_search_terms(Path::new("/definitely/not/here.csv"), "termek");
        assert!(matches!(result, Err(InputError::NotFound(_))));
    }

    #[test]
    fn test_missing_column() {
        let file = write_input("name\nhammer\n");
        let result = load_search_terms(file.path(), DEFAULT_TERM_COLUMN);
        assert!(matches!(result, Err(InputError::MissingColumn { .. })));
    }

    #[test]
    fn test_no_terms() {
        let file = write_input("termek\n \n\n");
        let result = load_search_terms(file.path(), DEFAULT_TERM_COLUMN);
        assert!(matches!(result, Err(InputError::Empty(_))));
    }
}
