//! Entity references.
//!
//! A reference names one indexed entity without holding the entity itself:
//! the mapped type name plus the string form of its identifier. References
//! key the indexing plan and identify entities in engine calls and failure
//! reports.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one indexed entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityReference {
    /// The mapped entity type name (e.g. "book", "author").
    pub type_name: String,

    /// The entity identifier, serialized to its string form.
    pub id: String,
}

impl EntityReference {
    /// Creates a reference from a type name and an identifier.
    #[must_use]
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.type_name, self.id)
    }
}
