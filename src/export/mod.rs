pub mod dot;
pub mod mermaid;

use std::collections::{BTreeMap, HashSet};

use anyhow::bail;
use petgraph::Direction;
use petgraph::stable_graph::NodeIndex;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use tracing::warn;

use crate::graph::SourceGraph;
use crate::graph::edge::Relation;
use crate::graph::node::split_qualified_name;

/// Output format for graph export.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum, serde::Serialize, serde::Deserialize)]
pub enum ExportFormat {
    /// Graphviz DOT format (default). Suitable for large graphs and tooling.
    Dot,
    /// Mermaid flowchart format. Best for small-to-medium graphs in markdown.
    Mermaid,
}

/// Parameters controlling a graph export operation.
pub struct ExportParams {
    pub format: ExportFormat,
    /// Export a node and its N-hop neighborhood instead of the whole graph.
    pub focus: Option<String>,
    /// Hop depth for the focus neighborhood, following edges both ways.
    pub depth: usize,
}

/// Result of a graph export operation.
pub struct ExportResult {
    /// The rendered graph content (DOT or Mermaid text).
    pub content: String,
    pub node_count: usize,
    pub edge_count: usize,
    /// Scale guard messages. Already logged by `export_graph`.
    pub warnings: Vec<String>,
}

/// Nodes and edges selected for rendering, in deterministic order.
pub struct View<'a> {
    /// Visible nodes grouped by package name, each group sorted by qualified name.
    pub packages: BTreeMap<&'a str, Vec<NodeIndex>>,
    /// Edges between visible nodes, sorted by (source, target) qualified name.
    pub edges: Vec<(NodeIndex, NodeIndex, Relation)>,
}

/// Export the merged graph to DOT or Mermaid format.
pub fn export_graph(graph: &SourceGraph, params: &ExportParams) -> anyhow::Result<ExportResult> {
    let visible = match &params.focus {
        Some(name) => {
            let Some(start) = graph.node_index(name) else {
                bail!("'{}' is not in the graph", name);
            };
            neighborhood(graph, start, params.depth)
        }
        None => graph.graph.node_indices().collect(),
    };
    let view = build_view(graph, &visible);
    let node_count = visible.len();
    let edge_count = view.edges.len();

    let mut warnings: Vec<String> = Vec::new();
    if params.format == ExportFormat::Mermaid && edge_count > 500 {
        let msg = format!(
            "Large graph: {} edges may render poorly in Mermaid. \
             Consider --focus or --format dot.",
            edge_count
        );
        warn!("{}", msg);
        warnings.push(msg);
    }

    let content = match params.format {
        ExportFormat::Dot => dot::render_dot(graph, &view)?,
        ExportFormat::Mermaid => mermaid::render_mermaid(graph, &view)?,
    };

    Ok(ExportResult {
        content,
        node_count,
        edge_count,
        warnings,
    })
}

/// BFS outward from `start` over parent and child edges, up to `depth` hops.
fn neighborhood(graph: &SourceGraph, start: NodeIndex, depth: usize) -> HashSet<NodeIndex> {
    let mut visited: HashSet<NodeIndex> = HashSet::from([start]);
    let mut frontier = vec![start];

    for _ in 0..depth {
        let mut next = Vec::new();
        for idx in frontier {
            let around = graph
                .graph
                .neighbors_directed(idx, Direction::Outgoing)
                .chain(graph.graph.neighbors_directed(idx, Direction::Incoming));
            for neighbor in around {
                if visited.insert(neighbor) {
                    next.push(neighbor);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    visited
}

fn build_view<'a>(graph: &'a SourceGraph, visible: &HashSet<NodeIndex>) -> View<'a> {
    let name = move |idx: NodeIndex| graph.graph[idx].qualified_name();

    let mut packages: BTreeMap<&str, Vec<NodeIndex>> = BTreeMap::new();
    for &idx in visible {
        let package = split_qualified_name(name(idx)).map_or("", |(package, _)| package);
        packages.entry(package).or_default().push(idx);
    }
    for members in packages.values_mut() {
        members.sort_by_key(|&idx| name(idx));
    }

    let mut edges: Vec<(NodeIndex, NodeIndex, Relation)> = graph
        .graph
        .edge_references()
        .filter(|e| visible.contains(&e.source()) && visible.contains(&e.target()))
        .map(|e| (e.source(), e.target(), *e.weight()))
        .collect();
    edges.sort_by(|a, b| {
        (name(a.0), name(a.1), a.2.label()).cmp(&(name(b.0), name(b.1), b.2.label()))
    });

    View { packages, edges }
}
