//! End-to-end genealogy runs: clean → build → materialize → prune → flatten.
//!
//! Every run owns its tree and graph. Nothing built for one root is visible
//! to another, so a batch can fail one root and carry on, and roots can be
//! spread over threads that share only the immutable edge snapshot.

use std::borrow::Cow;
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::clean::{collapse_removed_status, retain_child_descriptions};
use crate::config::GenealogyConfig;
use crate::edge::{EdgeSource, EdgeTable, SnapshotSource};
use crate::error::{ErrorCode, GenealogyError, Result};
use crate::extract::{InfoTable, flatten};
use crate::graph::{GenealogyGraph, GraphExport, PruneReport, materialize};
use crate::timing::{self, timed};
use crate::tree::{BuildStats, TreeBuilder};

/// Everything one root's run produces.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub root: String,
    /// Hash of the edge table the run started from, before cleaning.
    pub content_hash: String,
    pub build: BuildStats,
    pub prune: PruneReport,
    pub export: GraphExport,
    pub info: InfoTable,
    #[serde(skip)]
    pub graph: GenealogyGraph,
}

/// Runs the genealogy stages under one configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: GenealogyConfig,
    prune: bool,
}

impl Pipeline {
    #[must_use]
    pub const fn new(config: GenealogyConfig) -> Self {
        Self {
            config,
            prune: true,
        }
    }

    /// Keep removed components in the output (history view).
    #[must_use]
    pub fn without_pruning(mut self) -> Self {
        self.prune = false;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &GenealogyConfig {
        &self.config
    }

    /// Run every stage for `root` over `table`.
    ///
    /// # Errors
    ///
    /// Returns [`GenealogyError::RootNotFound`] when no top-level row of
    /// `root` survives cleaning.
    #[instrument(skip(self, table), fields(rows = table.len()))]
    pub fn run(&self, table: &EdgeTable, root: &str) -> Result<PipelineOutput> {
        let content_hash = table.content_hash();
        let cleaned = timed("clean", || self.clean(table));

        let built = timed("build", || {
            TreeBuilder::new(&self.config.top_level).build(&cleaned, root)
        })?;
        let mut graph = timed("materialize", || materialize(&built.tree));

        let prune = if self.prune {
            timed("prune", || graph.prune_removed(self.config.removal_status))
        } else {
            PruneReport::default()
        };
        let info = timed("flatten", || flatten(&graph));
        let export = timed("export", || GraphExport::from_graph(&graph));

        info!(
            root,
            nodes = graph.node_count(),
            removed = prune.removed.len(),
            rows = info.len(),
            "genealogy built"
        );
        Ok(PipelineOutput {
            root: root.to_string(),
            content_hash,
            build: built.stats,
            prune,
            export,
            info,
            graph,
        })
    }

    fn clean<'t>(&self, table: &'t EdgeTable) -> Cow<'t, EdgeTable> {
        let opts = &self.config.clean;
        if !opts.collapse_removed && opts.child_descriptions.is_empty() {
            return Cow::Borrowed(table);
        }
        let mut owned = table.clone();
        if opts.collapse_removed {
            owned = collapse_removed_status(owned);
        }
        Cow::Owned(retain_child_descriptions(owned, &opts.child_descriptions))
    }

    /// Run each root in turn, pulling its table from `source`.
    ///
    /// A failing root is recorded in the report and logged; the remaining
    /// roots still run.
    #[instrument(skip(self, source, roots), fields(roots = roots.len()))]
    pub fn run_batch(&self, source: &dyn EdgeSource, roots: &[String]) -> BatchReport {
        let outcomes = roots
            .iter()
            .map(|root| {
                let result = source
                    .edges_for(root)
                    .and_then(|table| self.run(&table, root));
                RootOutcome::new(root, result)
            })
            .collect();
        BatchReport::finish(outcomes)
    }

    /// Like [`Pipeline::run_batch`], spread over up to `workers` scoped
    /// threads. Outcomes come back in `roots` order.
    ///
    /// A panic inside one root's run is caught and reported for that root
    /// as an internal error.
    #[instrument(skip(self, source, roots), fields(roots = roots.len()))]
    pub fn run_batch_parallel(
        &self,
        source: &SnapshotSource,
        roots: &[String],
        workers: usize,
    ) -> BatchReport {
        let workers = workers.clamp(1, roots.len().max(1));
        if workers == 1 {
            return self.run_batch(source, roots);
        }

        let empty = EdgeTable::default();
        let mut slots: Vec<Option<RootOutcome>> = vec![None; roots.len()];

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let empty = &empty;
                    scope.spawn(move || {
                        let mut done = Vec::new();
                        for (pos, root) in roots.iter().enumerate().skip(worker).step_by(workers) {
                            let table = source.table_for(root).unwrap_or(empty);
                            let result = catch_unwind(AssertUnwindSafe(|| self.run(table, root)));
                            let outcome = match result {
                                Ok(result) => RootOutcome::new(root, result),
                                Err(_) => RootOutcome::internal(root, "pipeline panicked"),
                            };
                            done.push((pos, outcome));
                        }
                        (done, timing::take_samples())
                    })
                })
                .collect();

            for handle in handles {
                if let Ok((done, samples)) = handle.join() {
                    timing::absorb_samples(samples);
                    for (pos, outcome) in done {
                        slots[pos] = Some(outcome);
                    }
                }
            }
        });

        let outcomes = slots
            .into_iter()
            .zip(roots)
            .map(|(slot, root)| {
                slot.unwrap_or_else(|| RootOutcome::internal(root, "batch worker exited early"))
            })
            .collect();
        BatchReport::finish(outcomes)
    }
}

/// Why one root of a batch produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootFailure {
    pub code: ErrorCode,
    pub message: String,
    pub hint: Option<&'static str>,
}

impl From<&GenealogyError> for RootFailure {
    fn from(err: &GenealogyError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            hint: err.hint(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RootOutcome {
    pub root: String,
    pub result: std::result::Result<Box<PipelineOutput>, RootFailure>,
}

impl RootOutcome {
    fn new(root: &str, result: Result<PipelineOutput>) -> Self {
        let result = result.map(Box::new).map_err(|err| {
            warn!(root, code = err.code().code(), error = %err, "root skipped");
            RootFailure::from(&err)
        });
        Self {
            root: root.to_string(),
            result,
        }
    }

    fn internal(root: &str, message: &str) -> Self {
        let code = ErrorCode::InternalUnexpected;
        warn!(root, code = code.code(), reason = message, "root skipped");
        Self {
            root: root.to_string(),
            result: Err(RootFailure {
                code,
                message: message.to_string(),
                hint: code.hint(),
            }),
        }
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    #[must_use]
    pub fn summary(&self) -> RootSummary {
        match &self.result {
            Ok(out) => RootSummary {
                root: self.root.clone(),
                ok: true,
                nodes: out.graph.node_count(),
                removed: out.prune.removed.len(),
                rows: out.info.len(),
                failure: None,
            },
            Err(failure) => RootSummary {
                root: self.root.clone(),
                ok: false,
                nodes: 0,
                removed: 0,
                rows: 0,
                failure: Some(failure.clone()),
            },
        }
    }
}

/// Flat per-root line for batch listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootSummary {
    pub root: String,
    pub ok: bool,
    pub nodes: usize,
    pub removed: usize,
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<RootFailure>,
}

/// Outcomes of a batch, in the order the roots were given.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<RootOutcome>,
}

impl BatchReport {
    fn finish(outcomes: Vec<RootOutcome>) -> Self {
        let report = Self { outcomes };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "batch complete"
        );
        report
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    #[must_use]
    pub fn summaries(&self) -> Vec<RootSummary> {
        self.outcomes.iter().map(RootOutcome::summary).collect()
    }

    /// Output for `root`, if it ran successfully.
    #[must_use]
    pub fn output(&self, root: &str) -> Option<&PipelineOutput> {
        self.outcomes
            .iter()
            .find(|o| o.root == root)
            .and_then(|o| o.result.as_ref().ok())
            .map(|out| &**out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopLevelPattern;
    use crate::edge::{EdgeRow, Status};
    use crate::edge::tests::row;
    use crate::tree::NodeId;

    const S1: (&str, &str, &str) = ("S1", "SATELLITE", "t0");
    const ASM: (&str, &str, &str) = ("ASM-1", "ASSEMBLY", "t1");

    fn pipeline() -> Pipeline {
        Pipeline::new(GenealogyConfig {
            top_level: vec![TopLevelPattern::new("SATELLITE", "ASSEMBLY")],
            ..GenealogyConfig::default()
        })
    }

    /// Top-level row of satellite `serial`.
    fn installed_in(serial: &str, child: (&str, &str, &str)) -> EdgeRow {
        let mut edge = row(S1, child, Status::Issued);
        edge.parent_serial = Some(serial.to_string());
        edge
    }

    fn scenario() -> EdgeTable {
        EdgeTable::new(vec![
            installed_in("S1", ASM),
            row(ASM, ("MAG-A", "MAGNET A", "t2"), Status::Issued),
            row(ASM, ("MAG-B", "MAGNET B", "t3"), Status::Removed),
        ])
    }

    #[test]
    fn removed_magnet_is_pruned_end_to_end() {
        let out = pipeline().run(&scenario(), "S1").expect("run");
        let parts: Vec<&str> = out.export.nodes.iter().map(|n| n.part_number.as_str()).collect();
        assert_eq!(parts, vec!["S1", "ASM-1", "MAG-A"]);
        assert_eq!(out.graph.edge_count(), 2);
        assert_eq!(out.info.len(), 3);
        assert_eq!(out.prune.removed, vec![NodeId(3)]);
        assert!(out.content_hash.starts_with("blake3:"));
    }

    #[test]
    fn history_view_keeps_removed_parts() {
        let out = pipeline().without_pruning().run(&scenario(), "S1").expect("run");
        assert_eq!(out.graph.node_count(), 4);
        assert!(out.prune.is_noop());
    }

    #[test]
    fn description_filter_runs_before_build() {
        let mut config = pipeline().config().clone();
        config.clean.child_descriptions = vec!["ASSEMBLY".into(), "MAGNET A".into()];
        let out = Pipeline::new(config).run(&scenario(), "S1").expect("run");
        assert_eq!(out.graph.node_count(), 3);
        assert!(out.prune.is_noop());
    }

    #[test]
    fn batch_isolates_failing_roots() {
        let source = SnapshotSource::per_root([
            ("S1".to_string(), scenario()),
            (
                "S2".to_string(),
                EdgeTable::new(vec![row(ASM, ("MAG-A", "MAGNET A", "t2"), Status::Issued)]),
            ),
        ]);
        let roots: Vec<String> = ["S2", "S1", "S3"].iter().map(ToString::to_string).collect();

        let report = pipeline().run_batch(&source, &roots);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.output("S1").expect("S1").info.len(), 3);

        let summaries = report.summaries();
        assert_eq!(summaries[0].root, "S2");
        let failure = summaries[0].failure.as_ref().expect("S2 fails");
        assert_eq!(failure.code, ErrorCode::RootNotFound);
    }

    #[test]
    fn shared_table_runs_each_satellite_separately() {
        let mut rows = scenario().rows().to_vec();
        rows.push(installed_in("S2", ("ASM-2", "ASSEMBLY", "t7")));
        let source = SnapshotSource::Shared(EdgeTable::new(rows));
        let roots: Vec<String> = ["S1", "S2", "S9"].iter().map(ToString::to_string).collect();

        let report = pipeline().run_batch(&source, &roots);
        assert_eq!(report.output("S1").expect("S1").graph.node_count(), 3);
        let s2 = report.output("S2").expect("S2");
        assert_eq!(s2.graph.node_count(), 2);
        assert_eq!(s2.export.nodes[1].part_number, "ASM-2");
        assert!(report.output("S9").is_none());
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn unknown_root_is_not_found_under_default_config() {
        let sat = ("SL02-100", "STARLINK SATELLITE", "t0");
        let mut top = row(sat, ("TA-7", "THRUSTER ASSEMBLY", "t1"), Status::Issued);
        top.parent_serial = Some("11072".into());
        let table = EdgeTable::new(vec![top]);
        let pipeline = Pipeline::new(GenealogyConfig::default());

        let err = pipeline.run(&table, "99999").unwrap_err();
        assert_eq!(err.code(), ErrorCode::RootNotFound);

        let out = pipeline.run(&table, "11072").expect("11072");
        let root = out.graph.attrs(NodeId::ROOT).expect("root");
        assert_eq!(root.serial_or_lot.as_deref(), Some("11072"));
    }

    #[test]
    fn parallel_batch_matches_sequential_order() {
        let mut rows = scenario().rows().to_vec();
        rows.push(installed_in("S4", ("ASM-4", "ASSEMBLY", "t4")));
        let source = SnapshotSource::Shared(EdgeTable::new(rows));
        let roots: Vec<String> = (0..7).map(|i| format!("S{i}")).collect();

        let seq = pipeline().run_batch(&source, &roots);
        let par = pipeline().run_batch_parallel(&source, &roots, 3);
        assert_eq!(seq.summaries(), par.summaries());
        assert_eq!(par.succeeded(), 2);
    }

    #[test]
    fn parallel_batch_with_no_roots_is_empty() {
        let source = SnapshotSource::Shared(scenario());
        let report = pipeline().run_batch_parallel(&source, &[], 4);
        assert!(report.outcomes.is_empty());
    }
}
