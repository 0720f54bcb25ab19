use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use source_graph::export::ExportFormat;

/// Inspect and query the source graphs that packages register for their loadable types.
///
/// source-graph builds per-package graph artifacts from declaration lists and merges
/// artifacts, in order, the way packages load at runtime.
#[derive(Parser, Debug)]
#[command(
    name = "source-graph",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    /// Project root holding `source-graph.toml`.
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for query results.
#[derive(Clone, Debug, ValueEnum, Default)]
pub enum OutputFormat {
    /// Compact one-line-per-result format (default).
    #[default]
    Compact,
    /// Human-readable columnar table with optional ANSI color when stdout is a terminal.
    Table,
    /// Structured JSON suitable for programmatic consumption.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a package's graph artifact from a JSON array of declarations.
    ///
    /// Declarations that cannot reach the marker are excluded. Invalid declarations are
    /// reported on stderr without aborting the package.
    Build {
        /// JSON file holding the package's declarations.
        declarations: PathBuf,

        /// Package name every declaration must belong to.
        #[arg(short, long)]
        package: String,

        /// Artifact of an already-built dependency (repeatable).
        #[arg(short, long = "dependency")]
        dependencies: Vec<PathBuf>,

        /// Marker capability (defaults to the configured one).
        #[arg(long)]
        marker: Option<String>,

        /// Write the artifact here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Node counts per kind, opaque stubs and edges per relation.
    Stats {
        /// Artifacts merged in order (defaults to the configured list).
        artifacts: Vec<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Search qualified names by regex (e.g. "app/.*Logger").
    Find {
        pattern: String,

        artifacts: Vec<PathBuf>,

        /// Case-insensitive pattern matching.
        #[arg(short = 'i', long)]
        case_insensitive: bool,

        /// Filter by kind (comma-separated: class,interface,type,variable,opaque).
        #[arg(long, value_delimiter = ',')]
        kind: Vec<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Closures, type bindings and members of one node.
    Show {
        qualified_name: String,

        artifacts: Vec<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// The base children of a node: what plugin discovery would enumerate.
    Implementations {
        qualified_name: String,

        artifacts: Vec<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Export the merged graph to DOT or Mermaid.
    Export {
        artifacts: Vec<PathBuf>,

        #[arg(long, value_enum, default_value_t = ExportFormat::Dot)]
        format: ExportFormat,

        /// Export only this node and its neighborhood.
        #[arg(long)]
        focus: Option<String>,

        /// Hop depth around --focus.
        #[arg(long, default_value_t = 1)]
        depth: usize,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
