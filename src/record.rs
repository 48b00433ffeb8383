//! # Record Types
//!
//! Fixed-shape records flowing through a run:
//!
//! - `MatchRecord`: one scraped candidate as emitted by an extraction producer
//! - `Annotation`: the relevance judgement attached by the classifier
//! - `ClassifiedRecord`: a match plus its annotation, the unit the aggregator consumes
//! - `Combination`: a (store, search term) pair, the unit of completeness tracking
//! - `OutputRow`: a materialised report row, either classified data or a
//!   synthesized NO_RESULT placeholder

use std::fmt;

use serde::{Deserialize, Serialize};

/// Candidate name used for synthesized rows
pub const NO_RESULT_NAME: &str = "NO_RESULT";

/// Filler for price and url on synthesized rows
pub const PLACEHOLDER: &str = "-";

/// Column order of the output report
pub const OUTPUT_COLUMNS: [&str; 9] = [
    "store",
    "search_term",
    "name",
    "price",
    "url",
    "verdict",
    "score",
    "rationale",
    "status",
];

/// One scraped candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Display name of the store
    pub store: String,

    /// The input term this candidate was searched for
    pub search_term: String,

    /// Candidate product name
    pub name: Option<String>,

    /// Price with currency markers stripped
    pub price: Option<String>,

    /// Product page
    pub url: Option<String>,
}

impl MatchRecord {
    pub fn new(
        store: impl Into<String>,
        search_term: impl Into<String>,
        name: Option<String>,
        price: Option<String>,
        url: Option<String>,
    ) -> Self {
        Self {
            store: store.into(),
            search_term: search_term.into(),
            name,
            price,
            url,
        }
    }

    pub fn name_str(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn price_str(&self) -> &str {
        self.price.as_deref().unwrap_or_default()
    }

    pub fn url_str(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }
}

/// Relevance verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Relevant,
    NotRelevant,
    Error,
    Disabled,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Relevant => "RELEVANT",
            Verdict::NotRelevant => "NOT_RELEVANT",
            Verdict::Error => "ERROR",
            Verdict::Disabled => "DISABLED",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row status in the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Accepted,
    RejectedByAi,
    AiError,
    AiDisabled,
    NoResult,
    /// A row that never went through classification
    Unclassified,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Accepted => "ACCEPTED",
            Status::RejectedByAi => "REJECTED_BY_AI",
            Status::AiError => "AI_ERROR",
            Status::AiDisabled => "AI_DISABLED",
            Status::NoResult => "NO_RESULT",
            Status::Unclassified => "N/A",
        }
    }

    /// Status derived from a judgement that reached the model
    pub fn from_judgement(verdict: Verdict, score: u8, accept_threshold: u8) -> Self {
        if verdict == Verdict::Relevant && score >= accept_threshold {
            Status::Accepted
        } else {
            Status::RejectedByAi
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The classifier's judgement about one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub verdict: Verdict,
    /// Confidence, 0..=100
    pub score: u8,
    pub rationale: String,
    pub status: Status,
}

/// A match record with its relevance annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    pub record: MatchRecord,
    /// `None` for rows that bypassed classification
    pub annotation: Option<Annotation>,
}

impl ClassifiedRecord {
    pub fn new(record: MatchRecord, annotation: Annotation) -> Self {
        Self {
            record,
            annotation: Some(annotation),
        }
    }

    pub fn unclassified(record: MatchRecord) -> Self {
        Self {
            record,
            annotation: None,
        }
    }
}

/// A (store, search term) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Combination {
    pub store: String,
    pub search_term: String,
}

impl Combination {
    /// Build a combination from raw values, trimming both sides.
    pub fn new(store: &str, search_term: &str) -> Self {
        Self {
            store: store.trim().to_string(),
            search_term: search_term.trim().to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.store.is_empty() && !self.search_term.is_empty()
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.store, self.search_term)
    }
}

/// A row of the final report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRow {
    pub store: String,
    pub search_term: String,
    pub name: String,
    pub price: String,
    pub url: String,
    pub verdict: Option<Verdict>,
    pub score: u8,
    pub rationale: String,
    pub status: Status,
}

impl OutputRow {
    /// Placeholder asserting that `combination` was attempted and yielded nothing
    pub fn no_result(combination: &Combination) -> Self {
        Self {
            store: combination.store.clone(),
            search_term: combination.search_term.clone(),
            name: NO_RESULT_NAME.to_string(),
            price: PLACEHOLDER.to_string(),
            url: PLACEHOLDER.to_string(),
            verdict: None,
            score: 0,
            rationale: "no result".to_string(),
            status: Status::NoResult,
        }
    }

    /// True when none of name, price and url carry data
    pub fn is_blank(&self) -> bool {
        self.name.is_empty() && self.price.is_empty() && self.url.is_empty()
    }

    pub fn to_csv_record(&self) -> Vec<String> {
        vec![
            self.store.clone(),
            self.search_term.clone(),
            self.name.clone(),
            self.price.clone(),
            self.url.clone(),
            self.verdict
                .map(|v| v.as_str().to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            self.score.to_string(),
            self.rationale.clone(),
            self.status.as_str().to_string(),
        ]
    }
}

impl From<ClassifiedRecord> for OutputRow {
    fn from(classified: ClassifiedRecord) -> Self {
        let ClassifiedRecord { record, annotation } = classified;
        let (verdict, score, rationale, status) = match annotation {
            Some(a) => (Some(a.verdict), a.score, a.rationale, a.status),
            None => (None, 0, "N/A".to_string(), Status::Unclassified),
        };
        Self {
            store: record.store.trim().to_string(),
            search_term: record.search_term.trim().to_string(),
            name: record.name.unwrap_or_default().trim().to_string(),
            price: record.price.unwrap_or_default().trim().to_string(),
            url: record.url.unwrap_or_default(),
            verdict,
            score,
            rationale,
            status,
        }
    }
}
