//! Command handlers and the edge-loading glue they share.

pub mod batch;
pub mod export;
pub mod info;
pub mod tree;

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, bail};
use genealogy_core::{
    EdgeSource, EdgeTable, GenealogyConfig, Pipeline, PipelineOutput, SnapshotSource,
    SqliteEdgeSource,
};
use tracing::debug;

use crate::output::OutputMode;

/// What every handler needs besides its own arguments.
#[derive(Debug)]
pub struct CmdContext {
    pub config: GenealogyConfig,
    pub output: OutputMode,
}

impl CmdContext {
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.config.clone())
    }
}

/// An opened `--edges` argument.
pub enum EdgeInput {
    /// A JSON export, used for every requested root. Its top-level rows are
    /// told apart by parent serial.
    Json(SnapshotSource),
    Sqlite(SqliteEdgeSource),
}

impl EdgeInput {
    /// Open a `.json` export or a `.db` / `.sqlite` snapshot.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let input = match ext.as_str() {
            "json" => Self::Json(SnapshotSource::Shared(
                EdgeTable::from_json_path(path)
                    .with_context(|| format!("loading edge table {}", path.display()))?,
            )),
            "db" | "sqlite" | "sqlite3" => Self::Sqlite(
                SqliteEdgeSource::open(path)
                    .with_context(|| format!("opening edge snapshot {}", path.display()))?,
            ),
            other => bail!(
                "unsupported edge file {} (extension {other:?}); expected .json, .db or .sqlite",
                path.display()
            ),
        };
        debug!(path = %path.display(), "opened edge input");
        Ok(input)
    }

    pub fn source(&self) -> &dyn EdgeSource {
        match self {
            Self::Json(snapshot) => snapshot,
            Self::Sqlite(sqlite) => sqlite,
        }
    }

    /// Roots known to the input; JSON exports do not record any.
    pub fn known_roots(&self) -> anyhow::Result<Vec<String>> {
        match self {
            Self::Json(_) => Ok(Vec::new()),
            Self::Sqlite(sqlite) => Ok(sqlite.roots()?),
        }
    }

    /// An in-memory snapshot covering `roots`, for parallel batches.
    pub fn into_snapshot(self, roots: &[String]) -> anyhow::Result<SnapshotSource> {
        match self {
            Self::Json(snapshot) => Ok(snapshot),
            Self::Sqlite(sqlite) => {
                let mut tables = HashMap::with_capacity(roots.len());
                for root in roots {
                    let table = sqlite
                        .edges_for(root)
                        .with_context(|| format!("reading edges for root {root}"))?;
                    tables.insert(root.clone(), table);
                }
                Ok(SnapshotSource::per_root(tables))
            }
        }
    }
}

/// Load the edges for `root` and run the pipeline over them.
pub fn run_root(
    ctx: &CmdContext,
    edges: &Path,
    root: &str,
    prune: bool,
) -> anyhow::Result<PipelineOutput> {
    let input = EdgeInput::open(edges)?;
    let table = input
        .source()
        .edges_for(root)
        .with_context(|| format!("reading edges for root {root}"))?;
    let pipeline = if prune {
        ctx.pipeline()
    } else {
        ctx.pipeline().without_pruning()
    };
    pipeline
        .run(&table, root)
        .with_context(|| format!("building genealogy for root {root}"))
}
