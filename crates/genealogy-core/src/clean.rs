//! Pre-build passes over the edge table.
//!
//! The query layer can report the same `(child trace, parent trace)` pair
//! several times with different statuses when a part was issued and later
//! pulled back out. Those pairs are collapsed to their `Removed` rows so the
//! pruner sees the removal. A description filter narrows the table to the
//! parts a report cares about.

use std::collections::HashSet;

use tracing::debug;

use crate::edge::{EdgeTable, Status};

/// Collapse multi-status installation pairs.
///
/// Rows are grouped by `(child_trace_id, parent_trace_id)`. When a group
/// contains at least one `Removed` row only its `Removed` rows survive;
/// otherwise the group is kept as is. Surviving rows keep their order.
#[must_use]
pub fn collapse_removed_status(table: EdgeTable) -> EdgeTable {
    let removed_pairs: HashSet<(String, String)> = table
        .rows()
        .iter()
        .filter(|row| row.status == Status::Removed)
        .map(|row| (row.child_trace_id.clone(), row.parent_trace_id.clone()))
        .collect();

    if removed_pairs.is_empty() {
        return table;
    }

    let before = table.len();
    let collapsed = table.retain(|row| {
        row.status == Status::Removed
            || !removed_pairs.contains(&(row.child_trace_id.clone(), row.parent_trace_id.clone()))
    });
    debug!(
        dropped = before - collapsed.len(),
        pairs = removed_pairs.len(),
        "collapsed removed installation pairs"
    );
    collapsed
}

/// Keep rows whose child description contains any of `patterns`.
///
/// An empty pattern list keeps everything.
#[must_use]
pub fn retain_child_descriptions(table: EdgeTable, patterns: &[String]) -> EdgeTable {
    if patterns.is_empty() {
        return table;
    }
    let before = table.len();
    let kept = table.retain(|row| {
        patterns
            .iter()
            .any(|p| row.child_description.contains(p.as_str()))
    });
    debug!(dropped = before - kept.len(), "filtered rows by child description");
    kept
}
