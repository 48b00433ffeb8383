//! Deterministic row ordering for the final report

use std::cmp::Ordering;

use crate::record::{OutputRow, Status};

/// Rank of a status within one (store, term) group; lower sorts first.
pub fn status_priority(status: Status) -> u8 {
    match status {
        Status::Accepted => 0,
        Status::RejectedByAi => 1,
        Status::AiError => 2,
        Status::AiDisabled => 3,
        Status::NoResult => 4,
        Status::Unclassified => 5,
    }
}

fn compare_rows(a: &OutputRow, b: &OutputRow) -> Ordering {
    a.store
        .cmp(&b.store)
        .then_with(|| a.search_term.cmp(&b.search_term))
        .then_with(|| status_priority(a.status).cmp(&status_priority(b.status)))
        .then_with(|| a.name.cmp(&b.name))
}

/// Sort by store, term, status priority and name. Stable, so rows with equal
/// keys keep their arrival order.
pub fn sort_rows(rows: &mut [OutputRow]) {
    rows.sort_by(compare_rows);
}
