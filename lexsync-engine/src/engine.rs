//! The index engine write interface.

use crate::IndexError;
use lexsync_types::DocumentWork;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How far an index write call blocks with respect to durability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStrategy {
    /// Return as soon as the engine accepted the works; durability is
    /// reached in the background.
    #[default]
    None,

    /// Do not return before the works are durable.
    Force,
}

impl fmt::Display for CommitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitStrategy::None => write!(f, "none"),
            CommitStrategy::Force => write!(f, "force"),
        }
    }
}

/// How far an index write call blocks with respect to search visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStrategy {
    /// Searches may lag behind the write.
    #[default]
    None,

    /// Do not return before the works are visible to searches.
    Force,
}

impl fmt::Display for RefreshStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshStrategy::None => write!(f, "none"),
            RefreshStrategy::Force => write!(f, "force"),
        }
    }
}

/// Abstracts the underlying full-text index backend.
///
/// Implementations are injected through the mapping context, which keeps
/// tests and embedders free to swap backends. There is no separate create
/// call: `AddOrUpdate` works are upserts, and deleting an absent document
/// succeeds.
pub trait IndexEngine: Send + Sync {
    /// Applies one batch of works, in order.
    ///
    /// `commit` and `refresh` say how long the call must block: `Force`
    /// means do not return before durability (respectively visibility) is
    /// reached. A batch either fully succeeds or reports the failed
    /// references through [`IndexError::WriteFailed`].
    fn execute(
        &self,
        works: Vec<DocumentWork>,
        commit: CommitStrategy,
        refresh: RefreshStrategy,
    ) -> Result<(), IndexError>;
}
