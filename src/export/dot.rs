use std::fmt::Write;

use crate::export::View;
use crate::graph::SourceGraph;
use crate::graph::edge::Relation;
use crate::graph::node::{DeclarationKind, GraphNode};

/// Sanitize a string for use as a DOT node ID or subgraph name.
///
/// Replaces non-alphanumeric characters with `_`. Prepends `n` if the result
/// starts with a digit (DOT IDs must not start with a digit).
pub fn sanitize_dot_id(s: &str) -> String {
    let mut result: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, 'n');
    }
    if result.is_empty() {
        result = "node".to_string();
    }
    result
}

fn escape_dot_label(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn kind_fillcolor(kind: Option<DeclarationKind>) -> &'static str {
    match kind {
        Some(DeclarationKind::Class) => "#A9DFBF",
        Some(DeclarationKind::Interface) => "#F9E79F",
        Some(DeclarationKind::TypeAlias) => "#D7BDE2",
        Some(DeclarationKind::Variable) => "#FAD7A0",
        None => "#EAECEE",
    }
}

fn edge_style(relation: Relation) -> &'static str {
    match relation {
        Relation::ExtendsClass => "style=solid arrowhead=onormal",
        Relation::ImplementsInterface => "style=dashed arrowhead=onormal",
        Relation::ExtendsInterface => "style=solid arrowhead=onormal color=goldenrod",
        Relation::ExtendsType => "style=dotted arrowhead=onormal",
        Relation::HasType => "style=dotted arrowhead=vee",
    }
}

/// Render the selected nodes as a DOT digraph, one cluster per package.
///
/// Edges point from child to parent.
pub fn render_dot(graph: &SourceGraph, view: &View<'_>) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(out, "digraph source_graph {{")?;
    writeln!(out, "    rankdir=BT;")?;
    writeln!(out, "    node [shape=box style=filled fontname=monospace];")?;

    for (package, members) in &view.packages {
        let cluster = sanitize_dot_id(package);
        writeln!(out, "    subgraph cluster_{} {{", cluster)?;
        writeln!(out, "        label=\"{}\";", escape_dot_label(package))?;
        for &idx in members {
            let node = &graph.graph[idx];
            let label = match node {
                GraphNode::Declaration(decl) => {
                    let kind = decl.kind.as_str();
                    let suffix = if decl.is_abstract { " abstract" } else { "" };
                    format!("{}\\n({}{})", escape_dot_label(&decl.name), kind, suffix)
                }
                GraphNode::Opaque { qualified_name } => escape_dot_label(qualified_name),
            };
            let style = if node.is_opaque() {
                " style=\"filled,dashed\""
            } else {
                ""
            };
            writeln!(
                out,
                "        n{} [label=\"{}\" fillcolor=\"{}\"{}];",
                idx.index(),
                label,
                kind_fillcolor(node.kind()),
                style
            )?;
        }
        writeln!(out, "    }}")?;
    }

    for &(from, to, relation) in &view.edges {
        writeln!(
            out,
            "    n{} -> n{} [{} tooltip=\"{}\"];",
            from.index(),
            to.index(),
            edge_style(relation),
            relation.label()
        )?;
    }

    writeln!(out, "}}")?;
    Ok(out)
}
