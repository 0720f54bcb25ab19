//! # source-graph
//!
//! A reflection engine over per-package declaration graphs. Every package registers the
//! declarations that opt into a marker capability (by default `core/Loadable`) together
//! with their typing relations; the [`Registry`] merges those graphs as packages load and
//! answers structural queries used for plugin discovery and dependency injection.
//!
//! ```
//! use source_graph::{Declaration, GraphBuilder, Registry, SourceLinks};
//!
//! #[derive(Default)]
//! struct Console;
//!
//! let mut builder = GraphBuilder::new("app", "core/Loadable");
//! builder
//!     .declare(Declaration::interface("app/Logger").extends("core/Loadable"))
//!     .declare(Declaration::class("app/Console").implements("app/Logger"));
//! let graph = builder.build().graph;
//!
//! let registry = Registry::new();
//! registry.merge(&graph, SourceLinks::new().class::<Console>("app/Console"));
//!
//! let loggers = registry.objects("app/Logger").unwrap();
//! assert_eq!(loggers[0].qualified_name, "app/Console");
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod flatten;
pub mod graph;
pub mod query;
pub mod registry;

pub use error::{DeclarationError, GraphError, Result};
pub use flatten::{FlatNode, FlattenedSourceGraph, NodeMap, NodeRef};
pub use graph::builder::{BuildOutput, GraphBuilder};
pub use graph::edge::Relation;
pub use graph::node::{
    Declaration, DeclarationKind, GraphNode, Method, Parameter, ParentRef, Property, Visibility,
};
pub use graph::serial::{GraphOptions, SerializedEdge, SerializedGraph, SerializedNode};
pub use graph::SourceGraph;
pub use registry::links::{Factory, Object, SourceLink, SourceLinks};
pub use registry::module::{GeneratedModule, PackageModule};
pub use registry::resolve::{InterfaceInfo, Relatives, Resolved};
pub use registry::{MergeReport, Registry};
