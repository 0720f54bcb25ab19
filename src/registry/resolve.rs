//! Object resolution: live values, singletons and structural queries by qualified name.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::sync::{Arc, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use serde::Serialize;
use tracing::debug;

use super::Registry;
use super::links::{Object, SourceLink};
use crate::error::{GraphError, Result};
use crate::flatten::{FlatNode, NodeMap, NodeRef};
use crate::graph::node::{DeclarationKind, Method, Property};

/// A singleton slot. `Building` records which thread runs the factory.
pub(crate) enum Slot {
    Building(ThreadId),
    Ready(Object),
}

/// Singleton slots plus, for each blocked thread, the name it waits for.
#[derive(Default)]
pub(crate) struct Singletons {
    slots: HashMap<String, Slot>,
    waiting: HashMap<ThreadId, String>,
}

impl Singletons {
    /// Whether `from`, following what each thread waits for, ends up blocked on `to`.
    fn waits_for(&self, from: ThreadId, to: ThreadId) -> bool {
        let mut thread = from;
        for _ in 0..=self.waiting.len() {
            if thread == to {
                return true;
            }
            match self.waiting.get(&thread).and_then(|name| self.slots.get(name)) {
                Some(Slot::Building(owner)) => thread = *owner,
                _ => return false,
            }
        }
        false
    }
}

/// A resolved base child, as returned by [`Registry::objects`].
#[derive(Clone)]
pub struct Resolved {
    pub qualified_name: String,
    pub value: Object,
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved")
            .field("qualified_name", &self.qualified_name)
            .finish_non_exhaustive()
    }
}

/// Declared members of a class or interface, for dispatching over its methods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceInfo {
    pub qualified_name: String,
    pub kind: DeclarationKind,
    pub properties: Vec<Property>,
    pub methods: Vec<Method>,
    pub type_parameters: Vec<String>,
}

impl InterfaceInfo {
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Which relation set of a node to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relatives {
    DirectParents,
    AllParents,
    RootParents,
    DirectChildren,
    AllChildren,
    BaseChildren,
}

impl Relatives {
    fn select(self, node: &FlatNode) -> &NodeMap {
        match self {
            Relatives::DirectParents => &node.direct_parents,
            Relatives::AllParents => &node.all_parents,
            Relatives::RootParents => &node.root_parents,
            Relatives::DirectChildren => &node.direct_children,
            Relatives::AllChildren => &node.all_children,
            Relatives::BaseChildren => &node.base_children,
        }
    }
}

/// Removes an unfinished `Building` slot if the factory unwinds.
struct BuildGuard<'a> {
    registry: &'a Registry,
    qualified_name: &'a str,
    finished: bool,
}

impl BuildGuard<'_> {
    fn finish(mut self, value: Object) {
        self.registry
            .singletons()
            .slots
            .insert(self.qualified_name.to_owned(), Slot::Ready(value));
        self.finished = true;
        self.registry.singleton_ready.notify_all();
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.registry.singletons().slots.remove(self.qualified_name);
            self.registry.singleton_ready.notify_all();
        }
    }
}

impl Registry {
    fn singletons(&self) -> MutexGuard<'_, Singletons> {
        self.singletons.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The live value bound to `qualified_name`.
    ///
    /// A `Value` link is returned as is. A `Class` link is constructed on first use and the
    /// instance is returned from then on. A variable without a link resolves to its captured
    /// value.
    pub fn object(&self, qualified_name: &str) -> Result<Object> {
        let flat = self.flattened();
        let node = flat
            .get(qualified_name)
            .ok_or_else(|| GraphError::NotFound(qualified_name.to_owned()))?;

        match self.link(qualified_name) {
            Some(SourceLink::Value(value)) => Ok(value),
            Some(SourceLink::Class(factory)) => {
                if node.declaration.as_ref().is_some_and(|d| d.is_abstract) {
                    return Err(GraphError::Abstract(qualified_name.to_owned()));
                }
                self.singleton(qualified_name, || factory())
            }
            None => {
                let captured = node
                    .declaration
                    .as_ref()
                    .filter(|d| d.kind == DeclarationKind::Variable)
                    .and_then(|d| d.value.clone());
                match captured {
                    Some(value) => self.singleton(qualified_name, move || Arc::new(value) as Object),
                    None if node.is_opaque() => Err(GraphError::Opaque(qualified_name.to_owned())),
                    None => Err(GraphError::Unlinked(qualified_name.to_owned())),
                }
            }
        }
    }

    /// [`Registry::object`], downcast to `T`.
    pub fn object_as<T: Any + Send + Sync>(&self, qualified_name: &str) -> Result<Arc<T>> {
        self.object(qualified_name)?
            .downcast::<T>()
            .map_err(|_| GraphError::TypeMismatch {
                qualified_name: qualified_name.to_owned(),
                expected: type_name::<T>(),
            })
    }

    /// The live values of every base child of `qualified_name`: each concrete implementation
    /// currently loaded. Base children that cannot produce a value (unlinked, abstract or
    /// opaque) are skipped.
    pub fn objects(&self, qualified_name: &str) -> Result<Vec<Resolved>> {
        let flat = self.flattened();
        let node = flat
            .get(qualified_name)
            .ok_or_else(|| GraphError::NotFound(qualified_name.to_owned()))?;

        let mut resolved = Vec::with_capacity(node.base_children.len());
        for child in node.base_children.keys() {
            match self.object(child) {
                Ok(value) => resolved.push(Resolved {
                    qualified_name: child.clone(),
                    value,
                }),
                Err(
                    err @ (GraphError::Unlinked(_) | GraphError::Abstract(_) | GraphError::Opaque(_)),
                ) => {
                    debug!(parent = qualified_name, child = %child, reason = %err, "skipping base child");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(resolved)
    }

    /// The base children of `qualified_name` that hold a `T`.
    pub fn objects_of<T: Any + Send + Sync>(&self, qualified_name: &str) -> Result<Vec<Arc<T>>> {
        Ok(self
            .objects(qualified_name)?
            .into_iter()
            .filter_map(|r| r.value.downcast::<T>().ok())
            .collect())
    }

    /// Declared members of a class or interface.
    pub fn interface(&self, qualified_name: &str) -> Result<InterfaceInfo> {
        let flat = self.flattened();
        let node = flat
            .get(qualified_name)
            .ok_or_else(|| GraphError::NotFound(qualified_name.to_owned()))?;
        let decl = node
            .declaration
            .as_ref()
            .ok_or_else(|| GraphError::Opaque(qualified_name.to_owned()))?;
        Ok(InterfaceInfo {
            qualified_name: decl.qualified_name.clone(),
            kind: decl.kind,
            properties: decl.properties.clone(),
            methods: decl.methods.clone(),
            type_parameters: decl.type_parameters.clone(),
        })
    }

    /// One relation set of `qualified_name`, without instantiating anything.
    pub fn relatives(&self, qualified_name: &str, which: Relatives) -> Result<Vec<NodeRef>> {
        let flat = self.flattened();
        let node = flat
            .get(qualified_name)
            .ok_or_else(|| GraphError::NotFound(qualified_name.to_owned()))?;
        Ok(which.select(node).values().cloned().collect())
    }

    pub fn direct_parents(&self, qualified_name: &str) -> Result<Vec<NodeRef>> {
        self.relatives(qualified_name, Relatives::DirectParents)
    }

    pub fn all_parents(&self, qualified_name: &str) -> Result<Vec<NodeRef>> {
        self.relatives(qualified_name, Relatives::AllParents)
    }

    pub fn root_parents(&self, qualified_name: &str) -> Result<Vec<NodeRef>> {
        self.relatives(qualified_name, Relatives::RootParents)
    }

    pub fn direct_children(&self, qualified_name: &str) -> Result<Vec<NodeRef>> {
        self.relatives(qualified_name, Relatives::DirectChildren)
    }

    pub fn all_children(&self, qualified_name: &str) -> Result<Vec<NodeRef>> {
        self.relatives(qualified_name, Relatives::AllChildren)
    }

    pub fn base_children(&self, qualified_name: &str) -> Result<Vec<NodeRef>> {
        self.relatives(qualified_name, Relatives::BaseChildren)
    }

    /// Build the singleton for `qualified_name` at most once.
    ///
    /// Other threads asking while construction runs wait for it. A request that would wait
    /// on itself gets `CyclicConstruction` instead: a factory that needs its own singleton,
    /// or factories on different threads that need each other's.
    fn singleton(&self, qualified_name: &str, build: impl FnOnce() -> Object) -> Result<Object> {
        let me = thread::current().id();
        {
            let mut table = self.singletons();
            loop {
                let builder = match table.slots.get(qualified_name) {
                    Some(Slot::Ready(value)) => return Ok(Arc::clone(value)),
                    Some(Slot::Building(owner)) => Some(*owner),
                    None => None,
                };
                match builder {
                    Some(owner) if table.waits_for(owner, me) => {
                        return Err(GraphError::CyclicConstruction(qualified_name.to_owned()));
                    }
                    Some(_) => {
                        table.waiting.insert(me, qualified_name.to_owned());
                        table = self
                            .singleton_ready
                            .wait(table)
                            .unwrap_or_else(PoisonError::into_inner);
                        table.waiting.remove(&me);
                    }
                    None => {
                        table
                            .slots
                            .insert(qualified_name.to_owned(), Slot::Building(me));
                        break;
                    }
                }
            }
        }

        let guard = BuildGuard {
            registry: self,
            qualified_name,
            finished: false,
        };
        debug!(qualified_name, "constructing singleton");
        let value = build();
        guard.finish(Arc::clone(&value));
        Ok(value)
    }
}
