use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by the registry, the resolution API and artifact loading.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The qualified name is not part of the merged graph. Declarations that were never
    /// loadable are reported the same way.
    #[error("no loadable declaration named '{0}'")]
    NotFound(String),

    /// The name is only known as a reference from another package; its defining package
    /// has not been merged.
    #[error("'{0}' is an opaque reference without a loaded definition")]
    Opaque(String),

    /// The declaration is known but nothing can produce a live value for it.
    #[error("'{0}' has no source link and no captured value")]
    Unlinked(String),

    #[error("'{0}' is abstract and cannot be instantiated")]
    Abstract(String),

    /// A factory asked, directly or indirectly, for the singleton it is building.
    #[error("cyclic construction of singleton '{0}'")]
    CyclicConstruction(String),

    #[error("'{qualified_name}' does not hold a value of type {expected}")]
    TypeMismatch {
        qualified_name: String,
        expected: &'static str,
    },

    #[error("invalid source graph artifact: {0}")]
    InvalidArtifact(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A declaration rejected by the graph builder. Rejection never aborts the rest of the
/// package.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    #[error("malformed qualified name '{0}' (expected '<package>/<name>')")]
    MalformedName(String),

    #[error("'{qualified_name}' does not belong to package '{package}'")]
    WrongPackage {
        qualified_name: String,
        package: String,
    },

    #[error("'{0}' is declared more than once")]
    Duplicate(String),

    #[error("'{0}' names itself as a parent")]
    SelfReference(String),
}

pub type Result<T, E = GraphError> = std::result::Result<T, E>;
