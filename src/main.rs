mod cli;
mod output;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use source_graph::config::SourceGraphConfig;
use source_graph::export::{ExportParams, export_graph};
use source_graph::query::{find, show, stats};
use source_graph::{Declaration, GraphBuilder, Registry, SerializedGraph};

fn init_logging(config: &SourceGraphConfig) {
    let fallback = config.log.clone().unwrap_or_else(|| "warn".to_owned());
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();
}

/// Merge the given artifacts in order, or the configured ones when none are given.
fn load_registry(root: &Path, config: &SourceGraphConfig, artifacts: Vec<PathBuf>) -> Result<Registry> {
    let artifacts = if artifacts.is_empty() {
        config.artifact_paths(root)
    } else {
        artifacts
    };
    if artifacts.is_empty() {
        anyhow::bail!(
            "no artifacts given and none configured in {}",
            root.join(source_graph::config::CONFIG_FILE).display()
        );
    }

    let registry = Registry::new();
    for path in &artifacts {
        let report = registry.merge_file(path)?;
        debug!(artifact = %path.display(), ?report, "merged artifact");
        if report.conflicts > 0 {
            warn!(
                artifact = %path.display(),
                conflicts = report.conflicts,
                "artifact redefines declarations already loaded; first definition kept"
            );
        }
    }
    Ok(registry)
}

fn write_or_print(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = SourceGraphConfig::load(&cli.root);
    init_logging(&config);

    match cli.command {
        Commands::Build {
            declarations,
            package,
            dependencies,
            marker,
            output,
        } => {
            let json = std::fs::read_to_string(&declarations)
                .with_context(|| format!("failed to read {}", declarations.display()))?;
            let declared: Vec<Declaration> = serde_json::from_str(&json)
                .with_context(|| format!("invalid declarations in {}", declarations.display()))?;

            let marker = marker.unwrap_or_else(|| config.marker.clone());
            let mut builder = GraphBuilder::new(&package, marker);
            for path in &dependencies {
                builder.dependency(&SerializedGraph::from_file(path)?);
            }
            for decl in declared {
                builder.declare(decl);
            }
            let built = builder.build();

            for diagnostic in &built.diagnostics {
                eprintln!("error: {}", diagnostic);
            }
            for name in &built.excluded {
                eprintln!("excluded: {} does not reach the marker", name);
            }

            let mut artifact = built.graph.to_json_pretty()?;
            artifact.push('\n');
            write_or_print(&artifact, output.as_deref())?;
            if let Some(path) = output {
                eprintln!(
                    "Built {} ({} nodes, {} edges) -> {}",
                    package,
                    built.graph.nodes.len(),
                    built.graph.edges.len(),
                    path.display()
                );
            }
        }

        Commands::Stats { artifacts, format } => {
            let registry = load_registry(&cli.root, &config, artifacts)?;
            output::format_stats(&stats::graph_stats(&registry), &format);
        }

        Commands::Find {
            pattern,
            artifacts,
            case_insensitive,
            kind,
            format,
        } => {
            let registry = load_registry(&cli.root, &config, artifacts)?;
            let results =
                find::find_declarations(&registry.flattened(), &pattern, case_insensitive, &kind)?;
            if results.is_empty() {
                eprintln!("no nodes matching '{}'", pattern);
                std::process::exit(1);
            }
            output::format_find_results(&results, &format);
        }

        Commands::Show {
            qualified_name,
            artifacts,
            format,
        } => {
            let registry = load_registry(&cli.root, &config, artifacts)?;
            let details = show::show_node(&registry, &qualified_name)?;
            output::format_node_details(&details, &format);
        }

        Commands::Implementations {
            qualified_name,
            artifacts,
            format,
        } => {
            let registry = load_registry(&cli.root, &config, artifacts)?;
            let found = show::implementations(&registry, &qualified_name)?;
            output::format_implementations(&qualified_name, &found, &format);
        }

        Commands::Export {
            artifacts,
            format,
            focus,
            depth,
            output,
        } => {
            let registry = load_registry(&cli.root, &config, artifacts)?;
            let params = ExportParams {
                format,
                focus,
                depth,
            };
            let result = export_graph(&registry.snapshot(), &params)?;
            write_or_print(&result.content, output.as_deref())?;
            if let Some(path) = output {
                eprintln!(
                    "Exported {} nodes, {} edges -> {}",
                    result.node_count,
                    result.edge_count,
                    path.display()
                );
            }
        }
    }

    Ok(())
}
