//! Flat installation-event relation consumed by the tree builder.
//!
//! # Overview
//!
//! Each [`EdgeRow`] links one parent component instance to one child
//! component instance and carries the child's work order, test reference
//! and lifecycle [`Status`]. The query layer that produces these rows is an
//! external collaborator; this module only holds the rows, indexes them by
//! [`ParentKey`], and loads snapshots from JSON or SQLite.
//!
//! ## Matching key
//!
//! Children are looked up by `(part_number, description, trace_id)` of the
//! parent. The serial number is deliberately not part of the key: lot-tracked
//! parts have none.
//!
//! ## Content hash
//!
//! [`EdgeTable::content_hash`] is a BLAKE3 hash over the ordered rows, so two
//! snapshots can be compared without diffing them row by row.

#![allow(clippy::module_name_repetitions)]

pub mod source;
pub mod sqlite;
pub mod status;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{GenealogyError, Result};

pub use source::{EdgeSource, SnapshotSource};
pub use sqlite::SqliteEdgeSource;
pub use status::Status;

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One parent → child installation event.
///
/// Field names on the wire follow the query layer's column aliases. A
/// missing or null key column reads as an empty string, the same as a NULL
/// in a SQLite snapshot, so one partial row never rejects a whole table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRow {
    #[serde(rename = "ParentTraceID", default, deserialize_with = "ids::text")]
    pub parent_trace_id: String,
    #[serde(rename = "ParentDesc", default, deserialize_with = "ids::text")]
    pub parent_description: String,
    #[serde(rename = "ParentPN", default, deserialize_with = "ids::text")]
    pub parent_part_number: String,
    #[serde(rename = "ParentSN", default, deserialize_with = "ids::optional")]
    pub parent_serial: Option<String>,
    #[serde(rename = "ChildTraceID", default, deserialize_with = "ids::text")]
    pub child_trace_id: String,
    #[serde(rename = "ChildDesc", default, deserialize_with = "ids::text")]
    pub child_description: String,
    #[serde(rename = "ChildPN", default, deserialize_with = "ids::text")]
    pub child_part_number: String,
    #[serde(rename = "ChildSN", default, deserialize_with = "ids::optional")]
    pub child_serial: Option<String>,
    #[serde(rename = "WoID", default, deserialize_with = "ids::optional")]
    pub work_order: Option<String>,
    #[serde(rename = "TestSerialNumber", default, deserialize_with = "ids::optional")]
    pub test_serial: Option<String>,
    #[serde(rename = "Status", default, deserialize_with = "Status::deserialize_lenient")]
    pub status: Status,
}

impl EdgeRow {
    /// Key of the parent side of this row.
    #[must_use]
    pub fn parent_key(&self) -> ParentKey {
        ParentKey::new(
            &self.parent_part_number,
            &self.parent_description,
            &self.parent_trace_id,
        )
    }

    /// Key the child would have when it becomes a parent further down.
    #[must_use]
    pub fn child_key(&self) -> ParentKey {
        ParentKey::new(
            &self.child_part_number,
            &self.child_description,
            &self.child_trace_id,
        )
    }

    /// Rows linking a part number to itself carry no genealogy.
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.parent_part_number == self.child_part_number
    }
}

/// `(part_number, description, trace_id)` of a parent component instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParentKey {
    pub part_number: String,
    pub description: String,
    pub trace_id: String,
}

impl ParentKey {
    #[must_use]
    pub fn new(part_number: &str, description: &str, trace_id: &str) -> Self {
        Self {
            part_number: part_number.to_string(),
            description: description.to_string(),
            trace_id: trace_id.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// EdgeTable
// ---------------------------------------------------------------------------

/// Immutable, ordered edge relation indexed by parent key.
///
/// A table pulled for one root identity (see [`EdgeTable::scoped`]) is
/// trusted to hold only that root's rows. Any other table may mix several
/// roots, and the tree builder then selects top-level rows by parent serial.
#[derive(Debug, Clone, Default)]
pub struct EdgeTable {
    rows: Vec<EdgeRow>,
    by_parent: HashMap<ParentKey, Vec<usize>>,
    scope: Option<String>,
}

impl EdgeTable {
    /// Index `rows`, keeping their order within every parent slice.
    #[must_use]
    pub fn new(rows: Vec<EdgeRow>) -> Self {
        let mut by_parent: HashMap<ParentKey, Vec<usize>> = HashMap::new();
        for (pos, row) in rows.iter().enumerate() {
            by_parent.entry(row.parent_key()).or_default().push(pos);
        }
        Self {
            rows,
            by_parent,
            scope: None,
        }
    }

    /// Mark the table as already restricted to `root`'s rows.
    #[must_use]
    pub fn scoped(mut self, root: impl Into<String>) -> Self {
        self.scope = Some(root.into());
        self
    }

    /// Root identity the rows were pulled for, if any.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    #[must_use]
    pub fn is_scoped_to(&self, root: &str) -> bool {
        self.scope() == Some(root)
    }

    /// Parse a JSON array of rows.
    ///
    /// # Errors
    ///
    /// Returns [`GenealogyError::Json`] if the payload is not an array of rows.
    pub fn from_json_reader(reader: impl Read) -> Result<Self> {
        let rows: Vec<EdgeRow> = serde_json::from_reader(reader)?;
        debug!(rows = rows.len(), "parsed edge rows from JSON");
        Ok(Self::new(rows))
    }

    /// Load a JSON snapshot from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsed.
    #[instrument]
    pub fn from_json_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| GenealogyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_reader(BufReader::new(file))
    }

    #[must_use]
    pub fn rows(&self) -> &[EdgeRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows whose parent matches `key`, in table order.
    pub fn children_of<'a>(
        &'a self,
        key: &ParentKey,
    ) -> impl Iterator<Item = &'a EdgeRow> + use<'a> {
        let rows = &self.rows;
        self.by_parent
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(move |&pos| &rows[pos])
    }

    /// Whether any row names `key` as its parent.
    #[must_use]
    pub fn has_children(&self, key: &ParentKey) -> bool {
        self.by_parent.contains_key(key)
    }

    /// Keep only rows satisfying `keep`, preserving order.
    #[must_use]
    pub fn retain(self, mut keep: impl FnMut(&EdgeRow) -> bool) -> Self {
        let kept = Self::new(self.rows.into_iter().filter(|row| keep(row)).collect());
        Self {
            scope: self.scope,
            ..kept
        }
    }

    /// BLAKE3 hash over the ordered rows, `blake3:`-prefixed.
    #[must_use]
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for row in &self.rows {
            for field in [
                Some(row.parent_trace_id.as_str()),
                Some(row.parent_description.as_str()),
                Some(row.parent_part_number.as_str()),
                row.parent_serial.as_deref(),
                Some(row.child_trace_id.as_str()),
                Some(row.child_description.as_str()),
                Some(row.child_part_number.as_str()),
                row.child_serial.as_deref(),
                row.work_order.as_deref(),
                row.test_serial.as_deref(),
                Some(row.status.as_str()),
            ] {
                match field {
                    Some(value) => {
                        hasher.update(value.as_bytes());
                        hasher.update(b"\x00");
                    }
                    None => {
                        hasher.update(b"\x01");
                    }
                }
            }
            hasher.update(b"\n");
        }
        format!("blake3:{}", hasher.finalize())
    }
}

impl FromIterator<EdgeRow> for EdgeTable {
    fn from_iter<I: IntoIterator<Item = EdgeRow>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Identifier decoding
// ---------------------------------------------------------------------------

/// Identifier columns arrive as strings or numbers depending on the exporter;
/// dataframe exports also turn integer ids into `11072.0`.
mod ids {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::{Number, Value};

    /// Key column: null reads as an empty string.
    pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(optional(deserializer)?.unwrap_or_default())
    }

    pub fn optional<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) => Ok(Some(number_text(&n))),
            other => Err(D::Error::custom(format!(
                "expected string, number or null identifier, got {other}"
            ))),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn number_text(n: &Number) -> String {
        match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
