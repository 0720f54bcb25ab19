use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A live runtime value bound to a qualified name.
pub type Object = Arc<dyn Any + Send + Sync>;

/// A no-argument constructor for a class-like declaration.
pub type Factory = Arc<dyn Fn() -> Object + Send + Sync>;

/// How a declaration produces its runtime value.
#[derive(Clone)]
pub enum SourceLink {
    /// A ready value: a variable's value or a pre-built instance.
    Value(Object),
    /// A constructible class. The registry calls the factory at most once and caches the
    /// result as the singleton for that name.
    Class(Factory),
}

impl SourceLink {
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        SourceLink::Value(Arc::new(value))
    }

    pub fn class<T: Default + Any + Send + Sync>() -> Self {
        SourceLink::Class(Arc::new(|| Arc::new(T::default()) as Object))
    }

    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn() -> Object + Send + Sync + 'static,
    {
        SourceLink::Class(Arc::new(factory))
    }
}

impl fmt::Debug for SourceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLink::Value(_) => f.write_str("SourceLink::Value(..)"),
            SourceLink::Class(_) => f.write_str("SourceLink::Class(..)"),
        }
    }
}

/// The source links a package supplies for its locally defined declarations.
#[derive(Debug, Clone, Default)]
pub struct SourceLinks {
    links: BTreeMap<String, SourceLink>,
}

impl SourceLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(mut self, qualified_name: impl Into<String>, link: SourceLink) -> Self {
        self.links.insert(qualified_name.into(), link);
        self
    }

    pub fn value<T: Any + Send + Sync>(self, qualified_name: impl Into<String>, value: T) -> Self {
        self.link(qualified_name, SourceLink::value(value))
    }

    pub fn class<T: Default + Any + Send + Sync>(self, qualified_name: impl Into<String>) -> Self {
        self.link(qualified_name, SourceLink::class::<T>())
    }

    pub fn factory<F>(self, qualified_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Object + Send + Sync + 'static,
    {
        self.link(qualified_name, SourceLink::factory(factory))
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl IntoIterator for SourceLinks {
    type Item = (String, SourceLink);
    type IntoIter = std::collections::btree_map::IntoIter<String, SourceLink>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.into_iter()
    }
}
