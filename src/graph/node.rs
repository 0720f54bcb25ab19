use std::fmt;

use serde::{Deserialize, Serialize};

use super::edge::Relation;

/// The kind of a loadable declaration. Serialized as the payload's `sourceType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeclarationKind {
    Class,
    Interface,
    TypeAlias,
    Variable,
}

impl DeclarationKind {
    pub const ALL: [DeclarationKind; 4] = [
        DeclarationKind::Class,
        DeclarationKind::Interface,
        DeclarationKind::TypeAlias,
        DeclarationKind::Variable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeclarationKind::Class => "class",
            DeclarationKind::Interface => "interface",
            DeclarationKind::TypeAlias => "typeAlias",
            DeclarationKind::Variable => "variable",
        }
    }

    /// Parse the lowercase forms accepted on the command line (`type` is short for `typeAlias`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "class" => Some(DeclarationKind::Class),
            "interface" => Some(DeclarationKind::Interface),
            "type" | "typeAlias" | "type_alias" => Some(DeclarationKind::TypeAlias),
            "variable" | "var" => Some(DeclarationKind::Variable),
            _ => None,
        }
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

/// A declared property (field) of a class or interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub name: String,
    /// The property's type as written in source.
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub optional: bool,
}

/// A declared method. Used by callers that dispatch generically over a declaration's methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Method {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default = "void_type")]
    pub return_type: String,
    #[serde(default)]
    pub is_async: bool,
}

fn void_type() -> String {
    "void".to_owned()
}

/// A reference to a parent declaration, with the concrete type arguments bound at that
/// reference (`implements Bar<Baz>` records `Bar` with `[Baz]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentRef {
    pub qualified_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_arguments: Vec<String>,
}

impl ParentRef {
    pub fn new(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            type_arguments: Vec::new(),
        }
    }
}

/// Split a qualified name into `(package, declaration)` at the last `/`.
///
/// Package names may themselves contain `/` (`@scope/pkg/Name`). Returns `None` when
/// either half is empty.
pub fn split_qualified_name(qualified_name: &str) -> Option<(&str, &str)> {
    let (package, name) = qualified_name.rsplit_once('/')?;
    if package.is_empty() || name.is_empty() {
        return None;
    }
    Some((package, name))
}

/// Full metadata of a loadable declaration: the payload carried by a serialized node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Declaration {
    pub package_name: String,
    pub name: String,
    pub qualified_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(rename = "sourceType")]
    pub kind: DeclarationKind,
    #[serde(default)]
    pub is_exported: bool,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<Method>,
    /// Ordered type parameter names (`<T, U>`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_parameters: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub direct_parent_classes: Vec<ParentRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub direct_parent_interfaces: Vec<ParentRef>,
    /// Parents of type aliases (intersection members) and variables (declared type).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub direct_parents: Vec<ParentRef>,
    /// Captured initializer of a variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl Declaration {
    /// Start a declaration of the given kind. `qualified_name` is split into package and
    /// name; a malformed name is kept whole and rejected later by the builder.
    pub fn new(kind: DeclarationKind, qualified_name: impl Into<String>) -> Self {
        let qualified_name = qualified_name.into();
        let (package_name, name) = match split_qualified_name(&qualified_name) {
            Some((package, name)) => (package.to_owned(), name.to_owned()),
            None => (String::new(), qualified_name.clone()),
        };
        Self {
            package_name,
            name,
            qualified_name,
            file_path: None,
            kind,
            is_exported: true,
            is_abstract: false,
            is_static: false,
            visibility: Visibility::Public,
            properties: Vec::new(),
            methods: Vec::new(),
            type_parameters: Vec::new(),
            direct_parent_classes: Vec::new(),
            direct_parent_interfaces: Vec::new(),
            direct_parents: Vec::new(),
            value: None,
        }
    }

    pub fn class(qualified_name: impl Into<String>) -> Self {
        Self::new(DeclarationKind::Class, qualified_name)
    }

    pub fn interface(qualified_name: impl Into<String>) -> Self {
        Self::new(DeclarationKind::Interface, qualified_name)
    }

    pub fn type_alias(qualified_name: impl Into<String>) -> Self {
        Self::new(DeclarationKind::TypeAlias, qualified_name)
    }

    pub fn variable(qualified_name: impl Into<String>) -> Self {
        Self::new(DeclarationKind::Variable, qualified_name)
    }

    /// Add a parent through the relation natural to this declaration's kind: a superclass
    /// for classes, a super-interface for interfaces, an intersection member for aliases,
    /// and the declared type for variables.
    pub fn extends(self, parent: impl Into<String>) -> Self {
        self.extends_with(parent, Vec::<String>::new())
    }

    pub fn extends_with<I, S>(mut self, parent: impl Into<String>, type_arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parent = ParentRef {
            qualified_name: parent.into(),
            type_arguments: type_arguments.into_iter().map(Into::into).collect(),
        };
        match self.kind {
            DeclarationKind::Class => self.direct_parent_classes.push(parent),
            DeclarationKind::Interface => self.direct_parent_interfaces.push(parent),
            DeclarationKind::TypeAlias | DeclarationKind::Variable => {
                self.direct_parents.push(parent)
            }
        }
        self
    }

    /// Add an implemented interface. Only classes implement; other kinds fall back to
    /// [`Declaration::extends`].
    pub fn implements(self, interface: impl Into<String>) -> Self {
        self.implements_with(interface, Vec::<String>::new())
    }

    pub fn implements_with<I, S>(mut self, interface: impl Into<String>, type_arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.kind != DeclarationKind::Class {
            return self.extends_with(interface, type_arguments);
        }
        self.direct_parent_interfaces.push(ParentRef {
            qualified_name: interface.into(),
            type_arguments: type_arguments.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Declared type of a variable.
    pub fn has_type(self, type_name: impl Into<String>) -> Self {
        self.extends(type_name)
    }

    pub fn type_parameter(mut self, name: impl Into<String>) -> Self {
        self.type_parameters.push(name.into());
        self
    }

    pub fn property(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.properties.push(Property {
            name: name.into(),
            type_name: type_name.into(),
            optional: false,
            visibility: Visibility::Public,
        });
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn private(mut self) -> Self {
        self.is_exported = false;
        self
    }

    pub fn in_file(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_value(mut self, value: serde_json::Value) -> Self {
        self.value = Some(value);
        self
    }

    /// All parent references with the relation each one produces.
    pub fn parents(&self) -> Vec<(&ParentRef, Relation)> {
        let mut out = Vec::new();
        match self.kind {
            DeclarationKind::Class => {
                out.extend(
                    self.direct_parent_classes
                        .iter()
                        .map(|p| (p, Relation::ExtendsClass)),
                );
                out.extend(
                    self.direct_parent_interfaces
                        .iter()
                        .map(|p| (p, Relation::ImplementsInterface)),
                );
            }
            DeclarationKind::Interface => {
                out.extend(
                    self.direct_parent_interfaces
                        .iter()
                        .chain(&self.direct_parents)
                        .map(|p| (p, Relation::ExtendsInterface)),
                );
            }
            DeclarationKind::TypeAlias => {
                out.extend(self.direct_parents.iter().map(|p| (p, Relation::ExtendsType)));
            }
            DeclarationKind::Variable => {
                out.extend(self.direct_parents.iter().map(|p| (p, Relation::HasType)));
            }
        }
        out
    }

    /// Drop every parent reference for which `keep` returns false.
    pub fn retain_parents(&mut self, mut keep: impl FnMut(&ParentRef) -> bool) {
        self.direct_parent_classes.retain(&mut keep);
        self.direct_parent_interfaces.retain(&mut keep);
        self.direct_parents.retain(&mut keep);
    }

    pub fn is_class_like(&self) -> bool {
        self.kind == DeclarationKind::Class
    }
}

impl Method {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            return_type: void_type(),
            is_async: false,
        }
    }

    pub fn param(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            type_name: type_name.into(),
            optional: false,
        });
        self
    }

    pub fn returns(mut self, type_name: impl Into<String>) -> Self {
        self.return_type = type_name.into();
        self
    }

    pub fn asynchronous(mut self) -> Self {
        self.is_async = true;
        self
    }
}

/// A node in the source graph: a fully described declaration, or an opaque stub for a
/// declaration whose defining package has not been analyzed or merged.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphNode {
    Declaration(Declaration),
    Opaque { qualified_name: String },
}

impl GraphNode {
    pub fn qualified_name(&self) -> &str {
        match self {
            GraphNode::Declaration(decl) => &decl.qualified_name,
            GraphNode::Opaque { qualified_name } => qualified_name,
        }
    }

    pub fn declaration(&self) -> Option<&Declaration> {
        match self {
            GraphNode::Declaration(decl) => Some(decl),
            GraphNode::Opaque { .. } => None,
        }
    }

    pub fn kind(&self) -> Option<DeclarationKind> {
        self.declaration().map(|d| d.kind)
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, GraphNode::Opaque { .. })
    }
}
