//! genealogy-core: rebuild which parts are installed in an assembly from a
//! flat table of installation events.
//!
//! # Stages
//!
//! ```text
//! EdgeTable ─clean─▶ TreeBuilder::build ─▶ ComponentTree
//!     ─materialize─▶ GenealogyGraph ─prune─▶ GenealogyGraph
//!     ─flatten─▶ InfoTable    ─GraphExport::from_graph─▶ GraphExport
//! ```
//!
//! [`pipeline::Pipeline`] strings the stages together for one root or a
//! batch of roots.
//!
//! # Conventions
//!
//! - **Errors**: [`error::GenealogyError`] with a stable [`error::ErrorCode`].
//!   Pruning, flattening and export are total and return plain values.
//! - **Logging**: `tracing` macros; stage entry points carry `#[instrument]`.

#![forbid(unsafe_code)]

pub mod clean;
pub mod config;
pub mod edge;
pub mod error;
pub mod extract;
pub mod graph;
pub mod pipeline;
pub mod timing;
pub mod tree;

pub use config::GenealogyConfig;
pub use edge::{EdgeRow, EdgeSource, EdgeTable, SnapshotSource, SqliteEdgeSource, Status};
pub use error::{ErrorCode, GenealogyError, Result};
pub use extract::{InfoRow, InfoTable, flatten};
pub use graph::{GenealogyGraph, GraphExport, PruneReport, materialize, prune, render_tree};
pub use pipeline::{BatchReport, Pipeline, PipelineOutput};
pub use tree::{ComponentInstance, ComponentTree, NodeId, TreeBuilder};
