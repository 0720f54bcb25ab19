//! Graph builder: turns a package's registered declarations into its source graph.
//!
//! Each loadable type registers itself and its declared parents through [`GraphBuilder::declare`].
//! Only declarations whose parent chain reaches the marker capability are emitted; everything
//! else is dropped without leaving dangling references behind.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::SourceGraph;
use super::node::{Declaration, split_qualified_name};
use super::serial::SerializedGraph;
use crate::error::DeclarationError;

/// Result of building one package.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub graph: SerializedGraph,
    /// Valid declarations left out because no ancestor is the marker.
    pub excluded: Vec<String>,
    /// Declarations rejected outright. The rest of the package is unaffected.
    pub diagnostics: Vec<DeclarationError>,
}

pub struct GraphBuilder {
    package: String,
    marker: String,
    declarations: Vec<Declaration>,
    /// Names defined by already-built dependency graphs. All of them are loadable.
    known_loadable: HashSet<String>,
    /// Packages of those graphs. A reference into one of them that it does not declare
    /// was rejected there.
    dependency_packages: HashSet<String>,
}

impl GraphBuilder {
    pub fn new(package: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            marker: marker.into(),
            declarations: Vec::new(),
            known_loadable: HashSet::new(),
            dependency_packages: HashSet::new(),
        }
    }

    /// Make the declarations of a dependency's graph available for loadability checks.
    pub fn dependency(&mut self, graph: &SerializedGraph) -> &mut Self {
        for name in graph.declared_names() {
            if let Some((package, _)) = split_qualified_name(name) {
                self.dependency_packages.insert(package.to_owned());
            }
            self.known_loadable.insert(name.to_owned());
        }
        self
    }

    pub fn declare(&mut self, declaration: Declaration) -> &mut Self {
        self.declarations.push(declaration);
        self
    }

    pub fn build(&self) -> BuildOutput {
        let mut diagnostics = Vec::new();
        let mut local: HashMap<&str, &Declaration> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();

        for decl in &self.declarations {
            match self.validate(decl, &local) {
                Ok(()) => {
                    local.insert(decl.qualified_name.as_str(), decl);
                    order.push(decl.qualified_name.as_str());
                }
                Err(err) => {
                    debug!(package = %self.package, error = %err, "skipping declaration");
                    diagnostics.push(err);
                }
            }
        }

        let loadable = self.loadable(&order, &local);
        let mut excluded = Vec::new();
        let mut graph = SourceGraph::new();

        for &name in &order {
            if !loadable.contains(name) {
                excluded.push(name.to_owned());
                continue;
            }
            let mut decl = local[name].clone();
            // Parents rejected here or by a dependency would dangle; the rest become stubs.
            decl.retain_parents(|p| {
                let parent = p.qualified_name.as_str();
                if local.contains_key(parent) {
                    loadable.contains(parent)
                } else {
                    !self.rejected_by_dependency(parent)
                }
            });
            let parents: Vec<_> = decl
                .parents()
                .into_iter()
                .map(|(p, rel)| (p.qualified_name.clone(), rel))
                .collect();

            let (from, _) = graph.upsert_declaration(decl);
            for (parent, relation) in parents {
                let to = graph.add_stub(&parent);
                graph.add_relation(from, to, relation);
            }
        }

        excluded.sort();
        debug!(
            package = %self.package,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            excluded = excluded.len(),
            rejected = diagnostics.len(),
            "built source graph"
        );

        BuildOutput {
            graph: SerializedGraph::from(&graph),
            excluded,
            diagnostics,
        }
    }

    fn validate(
        &self,
        decl: &Declaration,
        seen: &HashMap<&str, &Declaration>,
    ) -> Result<(), DeclarationError> {
        let qualified_name = &decl.qualified_name;
        let Some((package, name)) = split_qualified_name(qualified_name) else {
            return Err(DeclarationError::MalformedName(qualified_name.clone()));
        };
        if package != self.package || decl.package_name != self.package || decl.name != name {
            return Err(DeclarationError::WrongPackage {
                qualified_name: qualified_name.clone(),
                package: self.package.clone(),
            });
        }
        if seen.contains_key(qualified_name.as_str()) {
            return Err(DeclarationError::Duplicate(qualified_name.clone()));
        }
        if decl
            .parents()
            .iter()
            .any(|(p, _)| p.qualified_name == *qualified_name)
        {
            return Err(DeclarationError::SelfReference(qualified_name.clone()));
        }
        Ok(())
    }

    fn rejected_by_dependency(&self, name: &str) -> bool {
        if name == self.marker || self.known_loadable.contains(name) {
            return false;
        }
        split_qualified_name(name)
            .is_some_and(|(package, _)| self.dependency_packages.contains(package))
    }

    /// A declaration is loadable if it is the marker, or if any parent is loadable.
    /// Propagates to a fixpoint, so a cycle only becomes loadable through an exit
    /// towards the marker.
    fn loadable<'a>(
        &self,
        order: &[&'a str],
        local: &HashMap<&'a str, &'a Declaration>,
    ) -> HashSet<&'a str> {
        let is_root = |name: &str| name == self.marker || self.known_loadable.contains(name);
        let mut loadable: HashSet<&'a str> =
            order.iter().copied().filter(|name| is_root(name)).collect();
        loop {
            let before = loadable.len();
            for &name in order {
                if loadable.contains(name) {
                    continue;
                }
                let reaches = local[name].parents().into_iter().any(|(parent, _)| {
                    let parent = parent.qualified_name.as_str();
                    is_root(parent) || loadable.contains(parent)
                });
                if reaches {
                    loadable.insert(name);
                }
            }
            if loadable.len() == before {
                return loadable;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::edge::Relation;

    const MARKER: &str = "core/Loadable";

    fn names(output: &BuildOutput) -> Vec<&str> {
        output.graph.nodes.iter().map(|n| n.v.as_str()).collect()
    }

    #[test]
    fn test_loadable_chain_is_emitted() {
        let mut builder = GraphBuilder::new("pkg", MARKER);
        builder
            .declare(
                Declaration::interface("pkg/I")
                    .extends(MARKER)
                    .property("a", "number"),
            )
            .declare(Declaration::class("pkg/C").implements("pkg/I"));
        let out = builder.build();

        assert_eq!(names(&out), vec!["core/Loadable", "pkg/C", "pkg/I"]);
        assert!(out.graph.nodes[0].value.is_none(), "marker is an opaque stub here");
        assert!(out.graph.edges.contains(&crate::graph::serial::SerializedEdge {
            v: "pkg/C".into(),
            w: "pkg/I".into(),
            value: Relation::ImplementsInterface,
        }));
        assert!(out.excluded.is_empty());
    }

    #[test]
    fn test_non_loadable_is_excluded_and_pruned() {
        let mut builder = GraphBuilder::new("pkg", MARKER);
        builder
            .declare(Declaration::interface("pkg/Plain"))
            .declare(
                Declaration::class("pkg/C")
                    .implements("pkg/Plain")
                    .implements(MARKER),
            );
        let out = builder.build();

        assert_eq!(out.excluded, vec!["pkg/Plain".to_owned()]);
        assert!(!names(&out).contains(&"pkg/Plain"));
        assert!(out.graph.edges.iter().all(|e| e.w != "pkg/Plain"));
        let c = out
            .graph
            .nodes
            .iter()
            .find(|n| n.v == "pkg/C")
            .and_then(|n| n.value.as_ref())
            .unwrap();
        assert_eq!(c.direct_parent_interfaces.len(), 1);
        assert_eq!(c.direct_parent_interfaces[0].qualified_name, MARKER);
    }

    #[test]
    fn test_dependency_declarations_are_loadable() {
        let mut dep = GraphBuilder::new("b", MARKER);
        dep.declare(Declaration::interface("b/FI").extends(MARKER));
        let dep_graph = dep.build().graph;

        let mut builder = GraphBuilder::new("a", MARKER);
        builder
            .dependency(&dep_graph)
            .declare(Declaration::class("a/AC").implements("b/FI"));
        let out = builder.build();
        assert!(out.excluded.is_empty());
        assert_eq!(names(&out), vec!["a/AC", "b/FI"]);
    }

    #[test]
    fn test_parent_rejected_by_dependency_is_pruned() {
        let mut dep = GraphBuilder::new("b", MARKER);
        dep.declare(Declaration::interface("b/FI").extends(MARKER))
            .declare(Declaration::interface("b/Plain"));
        let dep_out = dep.build();
        assert_eq!(dep_out.excluded, vec!["b/Plain".to_owned()]);

        let mut builder = GraphBuilder::new("a", MARKER);
        builder
            .dependency(&dep_out.graph)
            .declare(
                Declaration::class("a/AC")
                    .implements("b/FI")
                    .implements("b/Plain")
                    .implements("ext/Unknown"),
            );
        let out = builder.build();

        assert!(out.excluded.is_empty());
        assert_eq!(names(&out), vec!["a/AC", "b/FI", "ext/Unknown"]);
        assert!(out.graph.edges.iter().all(|e| e.w != "b/Plain"));
        let ac = out
            .graph
            .nodes
            .iter()
            .find(|n| n.v == "a/AC")
            .and_then(|n| n.value.as_ref())
            .unwrap();
        let parents: Vec<_> = ac
            .direct_parent_interfaces
            .iter()
            .map(|p| p.qualified_name.as_str())
            .collect();
        assert_eq!(parents, vec!["b/FI", "ext/Unknown"]);
    }

    #[test]
    fn test_invalid_declarations_do_not_abort_package() {
        let mut builder = GraphBuilder::new("pkg", MARKER);
        builder
            .declare(Declaration::class("NoPackage").implements(MARKER))
            .declare(Declaration::class("other/C").implements(MARKER))
            .declare(Declaration::class("pkg/Self").implements("pkg/Self"))
            .declare(Declaration::class("pkg/Ok").implements(MARKER))
            .declare(Declaration::class("pkg/Ok").implements(MARKER));
        let out = builder.build();

        assert_eq!(out.diagnostics.len(), 4);
        assert!(matches!(out.diagnostics[0], DeclarationError::MalformedName(_)));
        assert!(matches!(out.diagnostics[1], DeclarationError::WrongPackage { .. }));
        assert!(matches!(out.diagnostics[2], DeclarationError::SelfReference(_)));
        assert!(matches!(out.diagnostics[3], DeclarationError::Duplicate(_)));
        assert!(names(&out).contains(&"pkg/Ok"));
    }

    #[test]
    fn test_local_cycle_terminates() {
        let mut builder = GraphBuilder::new("pkg", MARKER);
        builder
            .declare(Declaration::interface("pkg/A").extends("pkg/B"))
            .declare(Declaration::interface("pkg/B").extends("pkg/A"));
        let out = builder.build();
        assert_eq!(out.excluded, vec!["pkg/A".to_owned(), "pkg/B".to_owned()]);
        assert!(out.graph.nodes.is_empty());
    }

    #[test]
    fn test_cycle_with_exit_to_marker_is_loadable() {
        let mut builder = GraphBuilder::new("pkg", MARKER);
        builder
            .declare(Declaration::interface("pkg/B").extends("pkg/A"))
            .declare(Declaration::interface("pkg/A").extends("pkg/B").extends(MARKER));
        let out = builder.build();
        assert!(out.excluded.is_empty());
        assert_eq!(names(&out), vec![MARKER, "pkg/A", "pkg/B"]);
    }

    #[test]
    fn test_marker_package_declares_marker() {
        let mut builder = GraphBuilder::new("core", MARKER);
        builder.declare(Declaration::interface(MARKER));
        let out = builder.build();
        assert_eq!(names(&out), vec![MARKER]);
        assert!(out.graph.nodes[0].value.is_some());
    }
}
