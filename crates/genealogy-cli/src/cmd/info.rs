//! `genealogy info`: flattened, deduplicated rows of the installed parts.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use genealogy_core::InfoTable;

use super::{CmdContext, run_root};
use crate::output::{pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Edge table: a JSON export or a SQLite snapshot.
    #[arg(long)]
    pub edges: PathBuf,

    /// Root identity (satellite serial).
    #[arg(long)]
    pub root: String,

    /// Only rows whose description contains this text (e.g. MAGNET).
    #[arg(long)]
    pub description: Option<String>,
}

const COLUMNS: [&str; 5] = [
    "PartNumber",
    "SerialNumber",
    "Description",
    "WorkOrderID",
    "TestSerialNumber",
];

pub fn run_info(args: &InfoArgs, ctx: &CmdContext) -> anyhow::Result<()> {
    let out = run_root(ctx, &args.edges, &args.root, true)?;
    let table = match &args.description {
        Some(needle) => out.info.filter_description(needle),
        None => out.info,
    };

    render_mode(
        ctx.output,
        &table,
        |t, w| {
            writeln!(w, "{}", COLUMNS.join("\t"))?;
            for row in t {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}",
                    row.part_number,
                    opt(row.serial_or_lot.as_deref()),
                    row.description,
                    opt(row.work_order.as_deref()),
                    opt(row.test_reference.as_deref()),
                )?;
            }
            Ok(())
        },
        |t, w| render_pretty(t, &args.root, w),
    )
}

fn render_pretty(table: &InfoTable, root: &str, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("Installed parts of {root} ({} rows)", table.len()))?;
    let desc_width = table
        .iter()
        .map(|r| r.description.len())
        .max()
        .unwrap_or(0)
        .max("Description".len());
    writeln!(
        w,
        "{:<16} {:<16} {:<desc_width$} {:<12} {}",
        "PartNumber", "SerialNumber", "Description", "WorkOrderID", "TestSerialNumber"
    )?;
    for row in table {
        writeln!(
            w,
            "{:<16} {:<16} {:<desc_width$} {:<12} {}",
            row.part_number,
            opt(row.serial_or_lot.as_deref()),
            row.description,
            opt(row.work_order.as_deref()),
            opt(row.test_reference.as_deref()),
        )?;
    }
    Ok(())
}

fn opt(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}
