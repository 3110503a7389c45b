//! Where a root's edge table comes from.

use std::collections::HashMap;

use crate::edge::EdgeTable;
use crate::error::Result;

/// Supplies the edge table for one root identity.
///
/// Implementations must hand out independent tables: each pipeline run owns
/// the table it was given and never shares it mutably with another root.
pub trait EdgeSource {
    /// Edge rows relevant to `root`.
    ///
    /// An empty table is a valid answer; the tree builder turns it into
    /// `RootNotFound`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    fn edges_for(&self, root: &str) -> Result<EdgeTable>;
}

/// Immutable in-memory snapshot, safe to read from several threads.
#[derive(Debug, Clone)]
pub enum SnapshotSource {
    /// One table shared by every root. Top-level rows are told apart by
    /// their parent serial.
    Shared(EdgeTable),
    /// A separate table per root identity.
    PerRoot(HashMap<String, EdgeTable>),
}

impl SnapshotSource {
    /// Per-root snapshot whose tables are scoped to the root they are
    /// filed under.
    #[must_use]
    pub fn per_root(tables: impl IntoIterator<Item = (String, EdgeTable)>) -> Self {
        Self::PerRoot(
            tables
                .into_iter()
                .map(|(root, table)| {
                    let table = table.scoped(root.as_str());
                    (root, table)
                })
                .collect(),
        )
    }

    /// Borrow the table for `root` without cloning it.
    #[must_use]
    pub fn table_for(&self, root: &str) -> Option<&EdgeTable> {
        match self {
            Self::Shared(table) => Some(table),
            Self::PerRoot(tables) => tables.get(root),
        }
    }
}

impl EdgeSource for SnapshotSource {
    fn edges_for(&self, root: &str) -> Result<EdgeTable> {
        Ok(self.table_for(root).cloned().unwrap_or_default())
    }
}
