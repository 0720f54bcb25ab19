use serde::Serialize;

use crate::graph::edge::Relation;
use crate::graph::node::DeclarationKind;
use crate::registry::Registry;

/// Aggregated statistics derived from the merged graph.
#[derive(Debug, Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub classes: usize,
    pub interfaces: usize,
    pub type_aliases: usize,
    pub variables: usize,
    /// References whose defining package has not been merged.
    pub opaque: usize,
    pub edge_count: usize,
    pub extends_class: usize,
    pub implements_interface: usize,
    pub extends_interface: usize,
    pub extends_type: usize,
    pub has_type: usize,
    /// Declarations bound to a live value.
    pub linked: usize,
    /// Nodes without parents.
    pub roots: usize,
    /// Nodes nothing extends.
    pub leaves: usize,
}

/// Compute statistics from the registry's current merged graph.
pub fn graph_stats(registry: &Registry) -> GraphStats {
    let graph = registry.snapshot();
    let flat = registry.flattened();
    let by_kind = graph.declarations_by_kind();
    let by_relation = graph.edges_by_relation();
    let kind = |k: DeclarationKind| *by_kind.get(&k).unwrap_or(&0);
    let relation = |r: Relation| *by_relation.get(&r).unwrap_or(&0);

    let all = || flat.declared().chain(flat.opaque.values());

    GraphStats {
        node_count: graph.node_count(),
        classes: kind(DeclarationKind::Class),
        interfaces: kind(DeclarationKind::Interface),
        type_aliases: kind(DeclarationKind::TypeAlias),
        variables: kind(DeclarationKind::Variable),
        opaque: graph.opaque_count(),
        edge_count: graph.edge_count(),
        extends_class: relation(Relation::ExtendsClass),
        implements_interface: relation(Relation::ImplementsInterface),
        extends_interface: relation(Relation::ExtendsInterface),
        extends_type: relation(Relation::ExtendsType),
        has_type: relation(Relation::HasType),
        linked: registry.linked_count(),
        roots: all().filter(|n| n.direct_parents.is_empty()).count(),
        leaves: all().filter(|n| n.direct_children.is_empty()).count(),
    }
}
