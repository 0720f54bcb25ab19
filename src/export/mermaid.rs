use std::fmt::Write;

use crate::export::View;
use crate::graph::SourceGraph;
use crate::graph::edge::Relation;
use crate::graph::node::GraphNode;

/// Escape characters that break Mermaid node labels.
fn escape_mermaid_label(s: &str) -> String {
    s.replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('{', "&#123;")
        .replace('}', "&#125;")
}

fn arrow(relation: Relation) -> &'static str {
    match relation {
        Relation::ExtendsClass | Relation::ExtendsInterface => "-->",
        Relation::ImplementsInterface | Relation::ExtendsType => "-.->",
        Relation::HasType => "==>",
    }
}

/// Render the selected nodes as a Mermaid flowchart, one subgraph per package.
pub fn render_mermaid(graph: &SourceGraph, view: &View<'_>) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(out, "flowchart BT")?;
    writeln!(out, "    classDef opaque stroke-dasharray: 5 5,fill:#EAECEE")?;

    let mut opaque = Vec::new();
    for (i, (package, members)) in view.packages.iter().enumerate() {
        writeln!(out, "    subgraph pkg{}[\"{}\"]", i, escape_mermaid_label(package))?;
        for &idx in members {
            let node = &graph.graph[idx];
            let label = match node {
                GraphNode::Declaration(decl) => {
                    format!("{} ({})", escape_mermaid_label(&decl.name), decl.kind)
                }
                GraphNode::Opaque { qualified_name } => {
                    opaque.push(idx.index());
                    escape_mermaid_label(qualified_name)
                }
            };
            writeln!(out, "        n{}[\"{}\"]", idx.index(), label)?;
        }
        writeln!(out, "    end")?;
    }

    for &(from, to, relation) in &view.edges {
        writeln!(
            out,
            "    n{} {}|{}| n{}",
            from.index(),
            arrow(relation),
            relation.label(),
            to.index()
        )?;
    }

    if !opaque.is_empty() {
        let ids: Vec<String> = opaque.iter().map(|i| format!("n{}", i)).collect();
        writeln!(out, "    class {} opaque", ids.join(","))?;
    }
    Ok(out)
}
