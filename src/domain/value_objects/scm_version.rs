//! Branch, tag and revision references

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in repository history a command should operate on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "lowercase")]
pub enum ScmVersion {
    /// Head of a branch
    Branch(String),
    /// A tag
    Tag(String),
    /// A revision, commit id or change number
    Revision(String),
}

impl ScmVersion {
    /// The bare name or identifier
    pub fn name(&self) -> &str {
        match self {
            ScmVersion::Branch(name) | ScmVersion::Tag(name) | ScmVersion::Revision(name) => name,
        }
    }

    /// Kind of version as text
    pub fn type_name(&self) -> &'static str {
        match self {
            ScmVersion::Branch(_) => "branch",
            ScmVersion::Tag(_) => "tag",
            ScmVersion::Revision(_) => "revision",
        }
    }
}

impl fmt::Display for ScmVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.type_name(), self.name())
    }
}
