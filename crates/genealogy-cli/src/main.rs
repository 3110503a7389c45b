#![forbid(unsafe_code)]

mod cmd;
mod output;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use genealogy_core::config::resolve_config;
use genealogy_core::timing;
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "genealogy: rebuild installed-part trees from installation records",
    long_about = None
)]
struct Cli {
    /// Config file (default: ./genealogy.toml, then the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Emit a per-stage timing report to stderr.
    #[arg(long, global = true)]
    timing: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Show the genealogy tree of one root",
        after_help = "EXAMPLES:\n    # Installed parts only\n    genealogy tree --edges edges.json --root 11072\n\n    # Include removed parts\n    genealogy tree --edges edges.db --root 11072 --all"
    )]
    Tree(cmd::tree::TreeArgs),

    #[command(
        about = "List installed parts as deduplicated rows",
        after_help = "EXAMPLES:\n    # Magnet rows for test matching\n    genealogy info --edges edges.json --root 11072 --description MAGNET\n\n    # Machine-readable\n    genealogy info --edges edges.json --root 11072 --json"
    )]
    Info(cmd::info::InfoArgs),

    #[command(
        about = "Export nodes and edges for a renderer",
        after_help = "EXAMPLES:\n    # JSON node/edge lists\n    genealogy export --edges edges.json --root 11072 --json\n\n    # Graphviz\n    genealogy export --edges edges.json --root 11072 --dot | dot -Tsvg"
    )]
    Export(cmd::export::ExportArgs),

    #[command(
        about = "Run many roots and report each outcome",
        after_help = "EXAMPLES:\n    # Every root in a snapshot, four threads\n    genealogy batch --edges edges.db --workers 4\n\n    # Selected roots\n    genealogy batch --edges edges.json --roots 11072 11073"
    )]
    Batch(cmd::batch::BatchArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("GENEALOGY_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "genealogy=debug,info"
        } else {
            "genealogy=info,warn"
        })
    });

    let format = env::var("GENEALOGY_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());
    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
            .init(),
        _ => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
    }
}

fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();
    let timing_enabled = cli.timing || timing::enabled_from_env();
    timing::set_enabled(timing_enabled);

    let output = resolve_output_mode(cli.format, cli.json);
    let cwd = env::current_dir().context("reading current directory")?;

    let command_result = resolve_config(cli.config.as_deref(), &cwd)
        .context("loading configuration")
        .and_then(|(config, path)| {
            if let Some(path) = path {
                debug!(path = %path.display(), "config loaded");
            }
            let ctx = cmd::CmdContext { config, output };
            match &cli.command {
                Commands::Tree(args) => {
                    timing::timed("cmd.tree", || cmd::tree::run_tree(args, &ctx))
                }
                Commands::Info(args) => {
                    timing::timed("cmd.info", || cmd::info::run_info(args, &ctx))
                }
                Commands::Export(args) => {
                    timing::timed("cmd.export", || cmd::export::run_export(args, &ctx))
                }
                Commands::Batch(args) => {
                    timing::timed("cmd.batch", || cmd::batch::run_batch(args, &ctx))
                }
            }
        });

    if timing_enabled {
        let report = timing::collect_report();
        eprintln!("timing report:");
        eprint!("{}", report.table());
        if output.is_json() {
            eprintln!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    match command_result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            render_error(output, &CliError::from(&err))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::parse_from([
            "genealogy",
            "tree",
            "--edges",
            "e.json",
            "--root",
            "S1",
            "--timing",
            "--json",
        ]);
        assert!(cli.timing);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Tree(ref a) if a.root == "S1" && !a.all));
    }

    #[test]
    fn format_flag_takes_value_enum() {
        let cli = Cli::parse_from([
            "genealogy",
            "--format",
            "text",
            "info",
            "--edges",
            "e.db",
            "--root",
            "S1",
            "--description",
            "MAGNET",
        ]);
        assert_eq!(cli.format, Some(OutputMode::Text));
        let Commands::Info(args) = cli.command else {
            panic!("expected info");
        };
        assert_eq!(args.description.as_deref(), Some("MAGNET"));
    }

    #[test]
    fn batch_accepts_many_roots() {
        let cli = Cli::parse_from([
            "genealogy",
            "batch",
            "--edges",
            "e.json",
            "--roots",
            "S1",
            "S2",
            "S3",
            "--workers",
            "2",
        ]);
        let Commands::Batch(args) = cli.command else {
            panic!("expected batch");
        };
        assert_eq!(args.roots, vec!["S1", "S2", "S3"]);
        assert_eq!(args.workers, 2);
    }

    #[test]
    fn config_path_is_global() {
        let cli = Cli::parse_from([
            "genealogy",
            "export",
            "--edges",
            "e.json",
            "--root",
            "S1",
            "--dot",
            "--config",
            "g.toml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("g.toml")));
        assert!(matches!(cli.command, Commands::Export(ref a) if a.dot));
    }

    #[test]
    fn root_is_required() {
        assert!(Cli::try_parse_from(["genealogy", "tree", "--edges", "e.json"]).is_err());
    }
}
