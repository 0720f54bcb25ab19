//! The process-wide registry: merges every package's source graph and source links, and
//! serves the flattened view and object resolution from the merged state.
//!
//! There is no global instance. Construct one `Registry` at startup and hand `&Registry`
//! (or an `Arc<Registry>`) to whatever needs it; loading a [`PackageModule`] registers its
//! dependencies first, so registration order follows the import order.

pub mod links;
pub mod module;
pub mod resolve;

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::error::Result;
use crate::flatten::FlattenedSourceGraph;
use crate::graph::serial::SerializedGraph;
use crate::graph::{SourceGraph, Upsert};
use links::{SourceLink, SourceLinks};
use module::PackageModule;
use resolve::Singletons;

/// What a single merge changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub nodes_added: usize,
    pub stubs_upgraded: usize,
    pub edges_added: usize,
    pub links_bound: usize,
    /// Full definitions ignored because a different one was merged first.
    pub conflicts: usize,
}

impl MergeReport {
    pub fn changed(&self) -> bool {
        self.nodes_added + self.stubs_upgraded + self.edges_added + self.links_bound > 0
    }
}

#[derive(Default)]
struct RegistryState {
    graph: SourceGraph,
    links: HashMap<String, SourceLink>,
    /// Packages loaded (or being loaded) through [`Registry::load`].
    packages: BTreeSet<String>,
    flattened: Option<Arc<FlattenedSourceGraph>>,
    generation: u64,
}

#[derive(Default)]
pub struct Registry {
    state: RwLock<RegistryState>,
    singletons: Mutex<Singletons>,
    singleton_ready: Condvar,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Union a package's graph and source links into the merged graph.
    ///
    /// Fail-soft and idempotent: merging the same artifact again adds nothing, and
    /// inconsistent entries are logged and skipped rather than rejected. Any change
    /// invalidates the cached flattening before the write lock is released.
    pub fn merge(&self, incoming: &SerializedGraph, links: SourceLinks) -> MergeReport {
        let mut state = self.write();
        let mut report = MergeReport::default();

        if !incoming.options.directed || incoming.options.multigraph || incoming.options.compound
        {
            warn!(options = ?incoming.options, "unexpected graph options, merging as a simple directed graph");
        }

        for node in &incoming.nodes {
            match &node.value {
                Some(decl) if decl.qualified_name == node.v => {
                    let (_, outcome) = state.graph.upsert_declaration(decl.clone());
                    match outcome {
                        Upsert::Added => report.nodes_added += 1,
                        Upsert::Upgraded => report.stubs_upgraded += 1,
                        Upsert::Unchanged => {}
                        Upsert::Conflict => {
                            warn!(qualified_name = %node.v, "conflicting definition ignored, keeping the first one merged");
                            report.conflicts += 1;
                        }
                    }
                }
                other => {
                    if let Some(decl) = other {
                        warn!(
                            node = %node.v,
                            payload = %decl.qualified_name,
                            "node id does not match its payload, merging it as an opaque stub"
                        );
                    }
                    if !state.graph.contains(&node.v) {
                        state.graph.add_stub(&node.v);
                        report.nodes_added += 1;
                    }
                }
            }
        }

        for edge in &incoming.edges {
            let graph = &mut state.graph;
            for endpoint in [&edge.v, &edge.w] {
                if !graph.contains(endpoint) {
                    debug!(qualified_name = %endpoint, "edge endpoint missing from node list, adding stub");
                    graph.add_stub(endpoint);
                    report.nodes_added += 1;
                }
            }
            let (Some(from), Some(to)) = (graph.node_index(&edge.v), graph.node_index(&edge.w))
            else {
                continue;
            };
            if from == to {
                warn!(qualified_name = %edge.v, "self-referencing edge skipped");
                continue;
            }
            if graph.add_relation(from, to, edge.value) {
                report.edges_added += 1;
            }
        }

        for (qualified_name, link) in links {
            if !state.graph.contains(&qualified_name) {
                warn!(%qualified_name, "source link names a declaration outside the merged graph");
                continue;
            }
            if state.links.contains_key(&qualified_name) {
                continue;
            }
            state.links.insert(qualified_name, link);
            report.links_bound += 1;
        }

        if report.changed() {
            state.flattened = None;
            state.generation += 1;
        }
        debug!(
            nodes_added = report.nodes_added,
            stubs_upgraded = report.stubs_upgraded,
            edges_added = report.edges_added,
            links_bound = report.links_bound,
            conflicts = report.conflicts,
            generation = state.generation,
            "merged source graph"
        );
        report
    }

    pub fn merge_json(&self, json: &str, links: SourceLinks) -> Result<MergeReport> {
        let graph = SerializedGraph::from_json(json)?;
        Ok(self.merge(&graph, links))
    }

    pub fn merge_file(&self, path: &Path) -> Result<MergeReport> {
        let graph = SerializedGraph::from_file(path)?;
        Ok(self.merge(&graph, SourceLinks::new()))
    }

    /// Load a package's generated module: its dependencies first, then the package itself.
    /// Each package is merged at most once, however many dependents import it.
    pub fn load(&self, module: &dyn PackageModule) -> Result<()> {
        {
            let mut state = self.write();
            if !state.packages.insert(module.package_name().to_owned()) {
                return Ok(());
            }
        }
        let graph = match self.prepare(module) {
            Ok(graph) => graph,
            Err(err) => {
                // Unmark so a later load can retry.
                self.write().packages.remove(module.package_name());
                return Err(err);
            }
        };
        debug!(package = module.package_name(), "loading package");
        self.merge(&graph, module.source_links());
        Ok(())
    }

    /// Load the dependencies, then parse the package's own graph.
    fn prepare(&self, module: &dyn PackageModule) -> Result<SerializedGraph> {
        for dependency in module.dependencies() {
            self.load(dependency)?;
        }
        module.source_graph()
    }

    pub fn is_loaded(&self, package: &str) -> bool {
        self.read().packages.contains(package)
    }

    /// Number of merges that changed the graph so far.
    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    /// The flattened view of the current merged graph, recomputed after any merge.
    pub fn flattened(&self) -> Arc<FlattenedSourceGraph> {
        if let Some(flat) = &self.read().flattened {
            return Arc::clone(flat);
        }
        let mut state = self.write();
        if let Some(flat) = &state.flattened {
            return Arc::clone(flat);
        }
        let flat = Arc::new(FlattenedSourceGraph::build(&state.graph));
        state.flattened = Some(Arc::clone(&flat));
        flat
    }

    /// A copy of the merged graph, e.g. for export.
    pub fn snapshot(&self) -> SourceGraph {
        self.read().graph.clone()
    }

    pub fn serialized(&self) -> SerializedGraph {
        SerializedGraph::from(&self.read().graph)
    }

    pub(crate) fn link(&self, qualified_name: &str) -> Option<SourceLink> {
        self.read().links.get(qualified_name).cloned()
    }

    pub fn is_linked(&self, qualified_name: &str) -> bool {
        self.read().links.contains_key(qualified_name)
    }

    pub fn linked_count(&self) -> usize {
        self.read().links.len()
    }
}
