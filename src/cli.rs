//! Command-line surface of the `assetline` binary.

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};

use crate::error::BuildError;
use crate::executor::Executor;
use crate::pipeline::{self, Layout, Options};

/// Command-line arguments for `assetline`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetline",
    version,
    about = "Build the web application's static assets.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run. Runs `default` when omitted.
    #[arg(value_name = "TASK")]
    pub task: Option<String>,

    /// Project root every source and destination path is relative to.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: Utf8PathBuf,

    /// Copy bespoke scripts through as-is instead of bundling them.
    #[arg(long)]
    pub skip_minify: bool,

    /// Run tasks one at a time in plan order.
    #[arg(long)]
    pub sequential: bool,

    /// Print every task with its prerequisites and exit.
    #[arg(long, conflicts_with = "graph")]
    pub list: bool,

    /// Print the task graph as a Mermaid diagram and exit.
    #[arg(long)]
    pub graph: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETLINE_LOG` or `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

/// Execute whatever the arguments ask for.
pub fn run(args: &CliArgs) -> Result<(), BuildError> {
    let options = Options {
        skip_minify: args.skip_minify,
    };
    let graph = pipeline::graph(Layout::new(&args.root), options)?;

    if args.list {
        for name in graph.names() {
            let prerequisites = graph.prerequisites(name).unwrap_or_default();
            if prerequisites.is_empty() {
                println!("{name}");
            } else {
                println!("{name} <- {}", prerequisites.join(", "));
            }
        }
        return Ok(());
    }

    if args.graph {
        print!("{graph}");
        return Ok(());
    }

    let diagnostics = Executor::new(&graph)
        .parallel(!args.sequential)
        .run(args.task.as_deref())?;

    tracing::debug!("{}", diagnostics.render_mermaid(&graph));

    Ok(())
}
