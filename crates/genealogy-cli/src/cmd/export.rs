//! `genealogy export`: node/edge structure for an external renderer.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;

use super::{CmdContext, run_root};
use crate::output::{pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Edge table: a JSON export or a SQLite snapshot.
    #[arg(long)]
    pub edges: PathBuf,

    /// Root identity (satellite serial).
    #[arg(long)]
    pub root: String,

    /// Emit Graphviz DOT instead of the selected output format.
    #[arg(long)]
    pub dot: bool,

    /// Keep removed components instead of pruning them.
    #[arg(long)]
    pub all: bool,
}

pub fn run_export(args: &ExportArgs, ctx: &CmdContext) -> anyhow::Result<()> {
    let out = run_root(ctx, &args.edges, &args.root, !args.all)?;
    let export = out.export;

    if args.dot {
        let stdout = io::stdout();
        let mut w = stdout.lock();
        w.write_all(export.to_dot().as_bytes())?;
        return Ok(());
    }

    render_mode(
        ctx.output,
        &export,
        |e, w| {
            for node in &e.nodes {
                writeln!(
                    w,
                    "node\t{}\t{}\t{}\t{}",
                    node.id,
                    node.part_number,
                    node.description,
                    node.serial_or_lot.as_deref().unwrap_or("-")
                )?;
            }
            for edge in &e.edges {
                writeln!(w, "edge\t{}\t{}", edge.parent, edge.child)?;
            }
            Ok(())
        },
        |e, w| {
            pretty_section(w, &format!("{} nodes, {} edges", e.nodes.len(), e.edges.len()))?;
            for node in &e.nodes {
                writeln!(w, "  [{}] {} {}", node.id, node.part_number, node.description)?;
            }
            for edge in &e.edges {
                writeln!(w, "  {} -> {}", edge.parent, edge.child)?;
            }
            Ok(())
        },
    )
}
