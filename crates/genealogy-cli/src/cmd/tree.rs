//! `genealogy tree`: show the installed (or full) genealogy of one root.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use genealogy_core::render_tree;
use genealogy_core::tree::BuildStats;
use genealogy_core::{GraphExport, PruneReport};
use serde::Serialize;

use super::{CmdContext, run_root};
use crate::output::{pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Edge table: a JSON export or a SQLite snapshot.
    #[arg(long)]
    pub edges: PathBuf,

    /// Root identity (satellite serial).
    #[arg(long)]
    pub root: String,

    /// Keep removed components instead of pruning them.
    #[arg(long)]
    pub all: bool,
}

#[derive(Serialize)]
struct TreeView {
    root: String,
    content_hash: String,
    pruned: bool,
    build: BuildStats,
    prune: PruneReport,
    graph: GraphExport,
    #[serde(skip)]
    art: String,
}

pub fn run_tree(args: &TreeArgs, ctx: &CmdContext) -> anyhow::Result<()> {
    let out = run_root(ctx, &args.edges, &args.root, !args.all)?;
    let view = TreeView {
        art: render_tree(&out.graph),
        root: out.root,
        content_hash: out.content_hash,
        pruned: !args.all,
        build: out.build,
        prune: out.prune,
        graph: out.export,
    };

    render_mode(
        ctx.output,
        &view,
        |v, w| w.write_all(v.art.as_bytes()),
        |v, w| {
            let heading = if v.pruned { "Installed genealogy" } else { "Full genealogy" };
            pretty_section(w, &format!("{heading} of {}", v.root))?;
            w.write_all(v.art.as_bytes())?;
            writeln!(w)?;
            pretty_kv(w, "nodes", v.graph.nodes.len().to_string())?;
            pretty_kv(w, "removed", v.prune.removed.len().to_string())?;
            pretty_kv(w, "self-loops", v.build.self_loops_skipped.to_string())?;
            if v.build.cycle_cuts > 0 {
                pretty_kv(w, "cycle cuts", v.build.cycle_cuts.to_string())?;
            }
            pretty_kv(w, "edges hash", &v.content_hash)
        },
    )
}
