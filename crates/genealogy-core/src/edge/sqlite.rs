//! Edge tables read from a SQLite snapshot of the query layer's output.
//!
//! The snapshot holds one `genealogy_edges` table. Each row is an edge row
//! plus the `root_serial` it was pulled for, so one file can carry a whole
//! batch of roots. Identifier columns may be stored as TEXT or INTEGER.

use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row, params};
use tracing::{debug, instrument};

use crate::edge::{EdgeRow, EdgeSource, EdgeTable, Status};
use crate::error::Result;

/// DDL for the snapshot table.
pub const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS genealogy_edges (
    root_serial      TEXT NOT NULL,
    ParentTraceID    TEXT NOT NULL,
    ParentDesc       TEXT NOT NULL,
    ParentPN         TEXT NOT NULL,
    ParentSN         TEXT,
    ChildTraceID     TEXT NOT NULL,
    ChildDesc        TEXT NOT NULL,
    ChildPN          TEXT NOT NULL,
    ChildSN          TEXT,
    WoID             TEXT,
    TestSerialNumber TEXT,
    Status           TEXT
);
CREATE INDEX IF NOT EXISTS idx_genealogy_edges_root ON genealogy_edges(root_serial);
";

const SELECT_FOR_ROOT: &str = "
SELECT ParentTraceID, ParentDesc, ParentPN, ParentSN,
       ChildTraceID, ChildDesc, ChildPN, ChildSN,
       WoID, TestSerialNumber, Status
FROM genealogy_edges
WHERE root_serial = ?1
ORDER BY rowid";

/// [`EdgeSource`] backed by a SQLite connection. Tables it returns are
/// scoped to the requested root by the `root_serial` column.
#[derive(Debug)]
pub struct SqliteEdgeSource {
    conn: Connection,
}

impl SqliteEdgeSource {
    /// Open a snapshot file read-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened as a SQLite database.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    #[must_use]
    pub const fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Distinct root identities present in the snapshot, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn roots(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT root_serial FROM genealogy_edges ORDER BY root_serial")?;
        let roots = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(roots)
    }
}

impl EdgeSource for SqliteEdgeSource {
    #[instrument(skip(self))]
    fn edges_for(&self, root: &str) -> Result<EdgeTable> {
        let mut stmt = self.conn.prepare(SELECT_FOR_ROOT)?;
        let rows = stmt
            .query_map(params![root], edge_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(rows = rows.len(), "loaded edge rows from sqlite");
        Ok(EdgeTable::new(rows).scoped(root))
    }
}

/// Create the snapshot table and append `table` under `root`.
///
/// # Errors
///
/// Returns an error if the DDL or an insert fails.
pub fn write_snapshot(conn: &mut Connection, root: &str, table: &EdgeTable) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO genealogy_edges (
                root_serial, ParentTraceID, ParentDesc, ParentPN, ParentSN,
                ChildTraceID, ChildDesc, ChildPN, ChildSN,
                WoID, TestSerialNumber, Status
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )?;
        for row in table.rows() {
            stmt.execute(params![
                root,
                row.parent_trace_id,
                row.parent_description,
                row.parent_part_number,
                row.parent_serial,
                row.child_trace_id,
                row.child_description,
                row.child_part_number,
                row.child_serial,
                row.work_order,
                row.test_serial,
                row.status.as_str(),
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

fn edge_from_row(row: &Row<'_>) -> rusqlite::Result<EdgeRow> {
    Ok(EdgeRow {
        parent_trace_id: text(row, 0)?.unwrap_or_default(),
        parent_description: text(row, 1)?.unwrap_or_default(),
        parent_part_number: text(row, 2)?.unwrap_or_default(),
        parent_serial: text(row, 3)?,
        child_trace_id: text(row, 4)?.unwrap_or_default(),
        child_description: text(row, 5)?.unwrap_or_default(),
        child_part_number: text(row, 6)?.unwrap_or_default(),
        child_serial: text(row, 7)?,
        work_order: text(row, 8)?,
        test_serial: text(row, 9)?,
        status: Status::lenient(text(row, 10)?.as_deref()),
    })
}

/// Read any SQLite storage class as text; NULL becomes `None`.
fn text(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    })
}
