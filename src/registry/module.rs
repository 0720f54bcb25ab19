//! The generated-module contract: each package exposes its embedded graph, its source
//! links and the generated modules of the packages it depends on.

use super::links::SourceLinks;
use crate::error::Result;
use crate::graph::serial::SerializedGraph;

pub trait PackageModule: Sync {
    fn package_name(&self) -> &str;

    /// Modules that must be loaded before this one.
    fn dependencies(&self) -> Vec<&dyn PackageModule> {
        Vec::new()
    }

    fn source_graph(&self) -> Result<SerializedGraph>;

    fn source_links(&self) -> SourceLinks {
        SourceLinks::new()
    }
}

/// A package's generated module, usable as a `static`:
///
/// ```
/// use source_graph::{GeneratedModule, SourceLinks};
///
/// static CORE: GeneratedModule = GeneratedModule::new(
///     "core",
///     r#"{"nodes": [{"v": "core/Loadable", "value": {
///         "packageName": "core", "name": "Loadable",
///         "qualifiedName": "core/Loadable", "sourceType": "interface"}}],
///       "edges": []}"#,
///     &[],
///     SourceLinks::new,
/// );
/// ```
pub struct GeneratedModule {
    name: &'static str,
    graph_json: &'static str,
    dependencies: &'static [&'static GeneratedModule],
    links: fn() -> SourceLinks,
}

impl GeneratedModule {
    pub const fn new(
        name: &'static str,
        graph_json: &'static str,
        dependencies: &'static [&'static GeneratedModule],
        links: fn() -> SourceLinks,
    ) -> Self {
        Self {
            name,
            graph_json,
            dependencies,
            links,
        }
    }
}

impl PackageModule for GeneratedModule {
    fn package_name(&self) -> &str {
        self.name
    }

    fn dependencies(&self) -> Vec<&dyn PackageModule> {
        self.dependencies
            .iter()
            .map(|module| *module as &dyn PackageModule)
            .collect()
    }

    fn source_graph(&self) -> Result<SerializedGraph> {
        SerializedGraph::from_json(self.graph_json)
    }

    fn source_links(&self) -> SourceLinks {
        (self.links)()
    }
}
