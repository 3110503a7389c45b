//! `genealogy batch`: many roots, one report. A root that fails is listed
//! with its error code; the others still run.

use std::io::Write;
use std::path::PathBuf;

use anyhow::bail;
use clap::Args;
use genealogy_core::pipeline::RootSummary;
use serde::Serialize;
use tracing::info;

use super::{CmdContext, EdgeInput};
use crate::output::{pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Edge table: a JSON export or a SQLite snapshot.
    #[arg(long)]
    pub edges: PathBuf,

    /// Root identities to process. Defaults to every root in a SQLite
    /// snapshot.
    #[arg(long, num_args = 1..)]
    pub roots: Vec<String>,

    /// Worker threads; 1 runs the roots in order on this thread.
    #[arg(long, default_value_t = 1)]
    pub workers: usize,
}

#[derive(Serialize)]
struct BatchView {
    generated_at: String,
    succeeded: usize,
    failed: usize,
    roots: Vec<RootSummary>,
}

pub fn run_batch(args: &BatchArgs, ctx: &CmdContext) -> anyhow::Result<()> {
    let input = EdgeInput::open(&args.edges)?;
    let roots = if args.roots.is_empty() {
        input.known_roots()?
    } else {
        args.roots.clone()
    };
    if roots.is_empty() {
        bail!("no roots to process; pass --roots (JSON exports do not list their roots)");
    }

    let pipeline = ctx.pipeline();
    let report = if args.workers > 1 {
        let snapshot = input.into_snapshot(&roots)?;
        pipeline.run_batch_parallel(&snapshot, &roots, args.workers)
    } else {
        pipeline.run_batch(input.source(), &roots)
    };
    info!(
        roots = roots.len(),
        workers = args.workers,
        failed = report.failed(),
        "batch finished"
    );

    let view = BatchView {
        generated_at: chrono::Utc::now().to_rfc3339(),
        succeeded: report.succeeded(),
        failed: report.failed(),
        roots: report.summaries(),
    };

    render_mode(
        ctx.output,
        &view,
        |v, w| {
            for s in &v.roots {
                let status = s.failure.as_ref().map_or("ok", |f| f.code.code());
                writeln!(w, "{}\t{status}\t{}\t{}\t{}", s.root, s.nodes, s.removed, s.rows)?;
            }
            Ok(())
        },
        |v, w| {
            pretty_section(w, &format!("Batch of {} roots", v.roots.len()))?;
            writeln!(
                w,
                "{:<16} {:<8} {:>6} {:>8} {:>6}",
                "root", "status", "nodes", "removed", "rows"
            )?;
            for s in &v.roots {
                match &s.failure {
                    None => writeln!(
                        w,
                        "{:<16} {:<8} {:>6} {:>8} {:>6}",
                        s.root, "ok", s.nodes, s.removed, s.rows
                    )?,
                    Some(f) => writeln!(w, "{:<16} {:<8} {}", s.root, f.code.code(), f.message)?,
                }
            }
            writeln!(w)?;
            pretty_kv(w, "succeeded", v.succeeded.to_string())?;
            pretty_kv(w, "failed", v.failed.to_string())?;
            pretty_kv(w, "generated", &v.generated_at)
        },
    )
}
