use std::fmt;

use serde::{Deserialize, Serialize};

/// The label of a directed edge. Edges always point from the declarer to the parent it
/// references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Relation {
    /// Class -> Class.
    #[serde(rename = "extends class")]
    ExtendsClass,
    /// Class -> Interface.
    #[serde(rename = "implements interface")]
    ImplementsInterface,
    /// Interface -> Interface.
    #[serde(rename = "extends interface")]
    ExtendsInterface,
    /// Type alias -> intersection member.
    #[serde(rename = "extends type")]
    ExtendsType,
    /// Variable -> its declared type. The target may be a structural, non-nominal type.
    #[serde(rename = "has type")]
    HasType,
}

impl Relation {
    pub fn label(self) -> &'static str {
        match self {
            Relation::ExtendsClass => "extends class",
            Relation::ImplementsInterface => "implements interface",
            Relation::ExtendsInterface => "extends interface",
            Relation::ExtendsType => "extends type",
            Relation::HasType => "has type",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
