use serde::Serialize;

use crate::error::{GraphError, Result};
use crate::flatten::FlatNode;
use crate::graph::node::DeclarationKind;
use crate::registry::Registry;
use crate::registry::links::SourceLink;

/// Everything known about one node: its payload, relation closures, and link state.
#[derive(Debug, Serialize)]
pub struct NodeDetails {
    #[serde(flatten)]
    pub node: FlatNode,
    pub linked: bool,
}

/// A base child of the queried node, with whether `objects` would yield a value for it.
#[derive(Debug, Serialize)]
pub struct Implementation {
    pub qualified_name: String,
    /// `None` for opaque stubs.
    pub kind: Option<DeclarationKind>,
    pub is_abstract: bool,
    pub linked: bool,
    pub resolvable: bool,
}

pub fn show_node(registry: &Registry, qualified_name: &str) -> Result<NodeDetails> {
    let flat = registry.flattened();
    let node = flat
        .get(qualified_name)
        .cloned()
        .ok_or_else(|| GraphError::NotFound(qualified_name.to_owned()))?;
    Ok(NodeDetails {
        linked: registry.is_linked(qualified_name),
        node,
    })
}

/// The base children of `qualified_name`, sorted by qualified name. This is the set
/// `Registry::objects` walks.
pub fn implementations(registry: &Registry, qualified_name: &str) -> Result<Vec<Implementation>> {
    let flat = registry.flattened();
    let node = flat
        .get(qualified_name)
        .ok_or_else(|| GraphError::NotFound(qualified_name.to_owned()))?;

    Ok(node
        .base_children
        .values()
        .map(|child| {
            let decl = flat
                .get(&child.qualified_name)
                .and_then(|n| n.declaration.as_ref());
            let is_abstract = decl.is_some_and(|d| d.is_abstract);
            let link = registry.link(&child.qualified_name);
            let resolvable = match &link {
                Some(SourceLink::Value(_)) => true,
                Some(SourceLink::Class(_)) => !is_abstract,
                None => decl.is_some_and(|d| d.kind == DeclarationKind::Variable && d.value.is_some()),
            };
            Implementation {
                qualified_name: child.qualified_name.clone(),
                kind: child.kind,
                is_abstract,
                linked: link.is_some(),
                resolvable,
            }
        })
        .collect())
}
