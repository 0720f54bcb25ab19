//! The source graph: loadable declarations and the typing relations between them.
//!
//! Nodes live in a petgraph arena and are addressed by `NodeIndex`; the qualified-name
//! index gives O(1) lookup from the globally unique `<package>/<name>` id.

pub mod builder;
pub mod edge;
pub mod node;
pub mod serial;

use std::collections::HashMap;

use petgraph::Directed;
use petgraph::stable_graph::{NodeIndex, StableGraph};

use edge::Relation;
use node::{Declaration, DeclarationKind, GraphNode};

/// Outcome of inserting a full declaration into the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// The name was new.
    Added,
    /// An opaque stub was replaced by the full definition.
    Upgraded,
    /// An identical definition was already present.
    Unchanged,
    /// A different full definition was already present and was kept.
    Conflict,
}

/// A directed, non-multi graph of declarations. Edges point from the declarer to the
/// parent it references; each ordered pair carries at most one edge per relation.
#[derive(Debug, Clone)]
pub struct SourceGraph {
    pub graph: StableGraph<GraphNode, Relation, Directed>,
    /// Maps qualified names to their node indices.
    pub index: HashMap<String, NodeIndex>,
}

impl SourceGraph {
    pub fn new() -> Self {
        Self {
            graph: StableGraph::new(),
            index: HashMap::new(),
        }
    }

    pub fn node_index(&self, qualified_name: &str) -> Option<NodeIndex> {
        self.index.get(qualified_name).copied()
    }

    pub fn node(&self, qualified_name: &str) -> Option<&GraphNode> {
        self.node_index(qualified_name).map(|idx| &self.graph[idx])
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.index.contains_key(qualified_name)
    }

    /// Return the node for `qualified_name`, adding an opaque stub if the name is new.
    pub fn add_stub(&mut self, qualified_name: &str) -> NodeIndex {
        if let Some(&existing) = self.index.get(qualified_name) {
            return existing;
        }
        let idx = self.graph.add_node(GraphNode::Opaque {
            qualified_name: qualified_name.to_owned(),
        });
        self.index.insert(qualified_name.to_owned(), idx);
        idx
    }

    /// Insert a full declaration. A stub is upgraded in place so its edges survive; an
    /// existing full definition always wins over a later one.
    pub fn upsert_declaration(&mut self, decl: Declaration) -> (NodeIndex, Upsert) {
        let Some(idx) = self.index.get(&decl.qualified_name).copied() else {
            let name = decl.qualified_name.clone();
            let idx = self.graph.add_node(GraphNode::Declaration(decl));
            self.index.insert(name, idx);
            return (idx, Upsert::Added);
        };

        let outcome = match &self.graph[idx] {
            GraphNode::Opaque { .. } => Upsert::Upgraded,
            GraphNode::Declaration(existing) if *existing == decl => Upsert::Unchanged,
            GraphNode::Declaration(_) => Upsert::Conflict,
        };
        if outcome == Upsert::Upgraded {
            self.graph[idx] = GraphNode::Declaration(decl);
        }
        (idx, outcome)
    }

    /// Add `from -> to` with the given relation. Returns false if that exact edge exists.
    pub fn add_relation(&mut self, from: NodeIndex, to: NodeIndex, relation: Relation) -> bool {
        let exists = self
            .graph
            .edges_connecting(from, to)
            .any(|edge| *edge.weight() == relation);
        if exists {
            return false;
        }
        self.graph.add_edge(from, to, relation);
        true
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn opaque_count(&self) -> usize {
        self.graph
            .node_indices()
            .filter(|&i| self.graph[i].is_opaque())
            .count()
    }

    /// Every full declaration, in no particular order.
    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.graph
            .node_indices()
            .filter_map(|i| self.graph[i].declaration())
    }

    /// Return a count of declarations broken down by kind.
    pub fn declarations_by_kind(&self) -> HashMap<DeclarationKind, usize> {
        let mut map: HashMap<DeclarationKind, usize> = HashMap::new();
        for decl in self.declarations() {
            *map.entry(decl.kind).or_insert(0) += 1;
        }
        map
    }

    /// Return a count of edges broken down by relation.
    pub fn edges_by_relation(&self) -> HashMap<Relation, usize> {
        let mut map: HashMap<Relation, usize> = HashMap::new();
        for e in self.graph.edge_indices() {
            *map.entry(self.graph[e]).or_insert(0) += 1;
        }
        map
    }
}

impl Default for SourceGraph {
    fn default() -> Self {
        Self::new()
    }
}
