//! Index document works.
//!
//! A work is one mutation applied to the search index for one entity, after
//! unit-of-work coalescing has collapsed the raw change stream. Works are
//! plain data; the engine decides how to translate them into backend calls.

use crate::EntityReference;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The kind of mutation applied to the index for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkKind {
    /// Add the document, assuming no previous version exists.
    Add,

    /// Add the document, replacing any previous version.
    AddOrUpdate,

    /// Remove the document. Removing an absent document succeeds.
    Delete,
}

impl fmt::Display for WorkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkKind::Add => "add",
            WorkKind::AddOrUpdate => "add_or_update",
            WorkKind::Delete => "delete",
        };
        write!(f, "{name}")
    }
}

/// One index mutation handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentWork {
    /// The mutation kind.
    pub kind: WorkKind,

    /// The entity the mutation targets.
    pub reference: EntityReference,

    /// The document to write. `None` for deletes.
    pub document: Option<Value>,
}

impl DocumentWork {
    /// Creates an add work.
    #[must_use]
    pub fn add(reference: EntityReference, document: Value) -> Self {
        Self {
            kind: WorkKind::Add,
            reference,
            document: Some(document),
        }
    }

    /// Creates an add-or-update work.
    #[must_use]
    pub fn add_or_update(reference: EntityReference, document: Value) -> Self {
        Self {
            kind: WorkKind::AddOrUpdate,
            reference,
            document: Some(document),
        }
    }

    /// Creates a delete work.
    #[must_use]
    pub fn delete(reference: EntityReference) -> Self {
        Self {
            kind: WorkKind::Delete,
            reference,
            document: None,
        }
    }
}
