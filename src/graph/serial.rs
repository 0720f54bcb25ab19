//! The portable artifact: `{options, nodes, edges}` JSON embedded in each package's
//! generated module.

use std::path::Path;

use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use serde::{Deserialize, Serialize};

use super::SourceGraph;
use super::edge::Relation;
use super::node::{Declaration, GraphNode};
use crate::error::{GraphError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphOptions {
    pub directed: bool,
    pub multigraph: bool,
    pub compound: bool,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            directed: true,
            multigraph: false,
            compound: false,
        }
    }
}

/// A node entry. `value` is absent for opaque stubs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNode {
    pub v: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Declaration>,
}

/// An edge entry: `v` is the declarer, `w` the referenced parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedEdge {
    pub v: String,
    pub w: String,
    pub value: Relation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedGraph {
    #[serde(default)]
    pub options: GraphOptions,
    #[serde(default)]
    pub nodes: Vec<SerializedNode>,
    #[serde(default)]
    pub edges: Vec<SerializedEdge>,
}

impl SerializedGraph {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Qualified names of the nodes that carry a full definition.
    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|n| n.value.is_some())
            .map(|n| n.v.as_str())
    }
}

impl From<&SourceGraph> for SerializedGraph {
    /// Nodes are sorted by qualified name and edges by `(v, w, relation)` so equal graphs
    /// produce byte-identical artifacts.
    fn from(source: &SourceGraph) -> Self {
        let mut nodes: Vec<SerializedNode> = source
            .graph
            .node_indices()
            .map(|idx| match &source.graph[idx] {
                GraphNode::Declaration(decl) => SerializedNode {
                    v: decl.qualified_name.clone(),
                    value: Some(decl.clone()),
                },
                GraphNode::Opaque { qualified_name } => SerializedNode {
                    v: qualified_name.clone(),
                    value: None,
                },
            })
            .collect();
        nodes.sort_by(|a, b| a.v.cmp(&b.v));

        let mut edges: Vec<SerializedEdge> = source
            .graph
            .edge_references()
            .map(|edge| SerializedEdge {
                v: source.graph[edge.source()].qualified_name().to_owned(),
                w: source.graph[edge.target()].qualified_name().to_owned(),
                value: *edge.weight(),
            })
            .collect();
        edges.sort_by(|a, b| (&a.v, &a.w, a.value).cmp(&(&b.v, &b.w, b.value)));

        Self {
            options: GraphOptions::default(),
            nodes,
            edges,
        }
    }
}
