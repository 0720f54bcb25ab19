//! The flattened source graph: per-node transitive closures over the merged graph.
//!
//! Parents follow outgoing edges (declarer -> referenced parent) and children follow the
//! reversed edges. `root_parents` keeps the ancestors that have no parents themselves and
//! `base_children` keeps the descendants nothing else extends: the concrete implementers
//! that plugin discovery enumerates.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::Direction;
use petgraph::stable_graph::NodeIndex;
use serde::Serialize;
use tracing::debug;

use crate::graph::SourceGraph;
use crate::graph::node::{Declaration, DeclarationKind, GraphNode};

/// A reference to another node of the flattened graph. `kind` is `None` for opaque stubs
/// and for type arguments that are not part of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRef {
    pub qualified_name: String,
    pub kind: Option<DeclarationKind>,
}

/// Relation sets keyed by qualified name.
pub type NodeMap = BTreeMap<String, NodeRef>;

#[derive(Debug, Clone, Serialize)]
pub struct FlatNode {
    pub qualified_name: String,
    /// `None` for opaque stubs, which take part in closures without metadata.
    pub declaration: Option<Declaration>,
    pub direct_parents: NodeMap,
    pub all_parents: NodeMap,
    pub root_parents: NodeMap,
    pub direct_children: NodeMap,
    pub all_children: NodeMap,
    pub base_children: NodeMap,
    /// Parent qualified name -> type arguments bound at that edge, in order.
    pub type_parameters: BTreeMap<String, Vec<NodeRef>>,
}

impl FlatNode {
    pub fn kind(&self) -> Option<DeclarationKind> {
        self.declaration.as_ref().map(|d| d.kind)
    }

    pub fn is_opaque(&self) -> bool {
        self.declaration.is_none()
    }
}

/// The four kind-partitioned views plus the opaque stubs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FlattenedSourceGraph {
    pub classes: BTreeMap<String, FlatNode>,
    pub interfaces: BTreeMap<String, FlatNode>,
    pub type_aliases: BTreeMap<String, FlatNode>,
    pub variables: BTreeMap<String, FlatNode>,
    pub opaque: BTreeMap<String, FlatNode>,
}

impl FlattenedSourceGraph {
    pub fn build(source: &SourceGraph) -> Self {
        let parents = closures(source, Direction::Outgoing);
        let children = closures(source, Direction::Incoming);

        let node_ref = |idx: NodeIndex| NodeRef {
            qualified_name: source.graph[idx].qualified_name().to_owned(),
            kind: source.graph[idx].kind(),
        };
        let to_map = |set: &mut dyn Iterator<Item = NodeIndex>| -> NodeMap {
            set.map(|i| {
                let r = node_ref(i);
                (r.qualified_name.clone(), r)
            })
            .collect()
        };
        let is_root = |idx: NodeIndex| {
            source
                .graph
                .neighbors_directed(idx, Direction::Outgoing)
                .next()
                .is_none()
        };
        let is_base = |idx: NodeIndex| {
            source
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .next()
                .is_none()
        };

        let mut flat = Self::default();
        for idx in source.graph.node_indices() {
            let all_parents = &parents[&idx];
            let all_children = &children[&idx];
            let node = &source.graph[idx];

            let type_parameters: BTreeMap<String, Vec<NodeRef>> = node
                .declaration()
                .map(|decl| {
                    decl.parents()
                        .into_iter()
                        .filter(|(p, _)| !p.type_arguments.is_empty())
                        .map(|(p, _)| {
                            let args: Vec<NodeRef> = p
                                .type_arguments
                                .iter()
                                .map(|arg| NodeRef {
                                    qualified_name: arg.clone(),
                                    kind: source.node(arg).and_then(GraphNode::kind),
                                })
                                .collect();
                            (p.qualified_name.clone(), args)
                        })
                        .collect()
                })
                .unwrap_or_default();

            let flat_node = FlatNode {
                qualified_name: node.qualified_name().to_owned(),
                declaration: node.declaration().cloned(),
                direct_parents: to_map(
                    &mut source.graph.neighbors_directed(idx, Direction::Outgoing),
                ),
                all_parents: to_map(&mut all_parents.iter().copied()),
                root_parents: to_map(&mut all_parents.iter().copied().filter(|&p| is_root(p))),
                direct_children: to_map(
                    &mut source.graph.neighbors_directed(idx, Direction::Incoming),
                ),
                all_children: to_map(&mut all_children.iter().copied()),
                base_children: to_map(
                    &mut all_children.iter().copied().filter(|&c| is_base(c)),
                ),
                type_parameters,
            };

            let bucket = match flat_node.kind() {
                Some(DeclarationKind::Class) => &mut flat.classes,
                Some(DeclarationKind::Interface) => &mut flat.interfaces,
                Some(DeclarationKind::TypeAlias) => &mut flat.type_aliases,
                Some(DeclarationKind::Variable) => &mut flat.variables,
                None => &mut flat.opaque,
            };
            bucket.insert(flat_node.qualified_name.clone(), flat_node);
        }

        debug!(
            classes = flat.classes.len(),
            interfaces = flat.interfaces.len(),
            type_aliases = flat.type_aliases.len(),
            variables = flat.variables.len(),
            opaque = flat.opaque.len(),
            "flattened source graph"
        );
        flat
    }

    /// Look a node up in every partition, opaque stubs included.
    pub fn get(&self, qualified_name: &str) -> Option<&FlatNode> {
        self.classes
            .get(qualified_name)
            .or_else(|| self.interfaces.get(qualified_name))
            .or_else(|| self.type_aliases.get(qualified_name))
            .or_else(|| self.variables.get(qualified_name))
            .or_else(|| self.opaque.get(qualified_name))
    }

    pub fn of_kind(&self, kind: DeclarationKind) -> &BTreeMap<String, FlatNode> {
        match kind {
            DeclarationKind::Class => &self.classes,
            DeclarationKind::Interface => &self.interfaces,
            DeclarationKind::TypeAlias => &self.type_aliases,
            DeclarationKind::Variable => &self.variables,
        }
    }

    /// Every declared (non-opaque) node, partition by partition.
    pub fn declared(&self) -> impl Iterator<Item = &FlatNode> {
        self.classes
            .values()
            .chain(self.interfaces.values())
            .chain(self.type_aliases.values())
            .chain(self.variables.values())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
            + self.interfaces.len()
            + self.type_aliases.len()
            + self.variables.len()
            + self.opaque.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Transitive closure of every node along `direction`.
///
/// Memoized iterative post-order DFS: a node's closure is its neighbors plus their
/// closures. The on-path set stops the walk at back edges, so cyclic input terminates
/// (closures inside a cycle may be partial). A node never belongs to its own closure.
fn closures(
    source: &SourceGraph,
    direction: Direction,
) -> HashMap<NodeIndex, HashSet<NodeIndex>> {
    let graph = &source.graph;
    let mut memo: HashMap<NodeIndex, HashSet<NodeIndex>> = HashMap::new();
    let mut on_path: HashSet<NodeIndex> = HashSet::new();

    for start in graph.node_indices() {
        if memo.contains_key(&start) {
            continue;
        }
        let mut stack: Vec<(NodeIndex, bool)> = vec![(start, false)];

        while let Some((node, expanded)) = stack.pop() {
            if memo.contains_key(&node) {
                continue;
            }
            if expanded {
                on_path.remove(&node);
                let mut acc: HashSet<NodeIndex> = HashSet::new();
                for next in graph.neighbors_directed(node, direction) {
                    acc.insert(next);
                    if let Some(sub) = memo.get(&next) {
                        acc.extend(sub.iter().copied());
                    }
                }
                acc.remove(&node);
                memo.insert(node, acc);
                continue;
            }
            if !on_path.insert(node) {
                continue;
            }
            stack.push((node, true));
            for next in graph.neighbors_directed(node, direction) {
                if !memo.contains_key(&next) && !on_path.contains(&next) {
                    stack.push((next, false));
                }
            }
        }
    }

    memo
}
