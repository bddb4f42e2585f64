//! Error types for the engine seam.

use lexsync_types::EntityReference;

/// Result type alias using the engine error type.
pub type IndexResult<T> = std::result::Result<T, IndexError>;

/// Errors reported by index engine implementations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A write batch failed, in whole or in part.
    ///
    /// `failed` lists the references whose works did not reach the index,
    /// so failure handlers can report per entity.
    #[error("index write failed for {} entities: {message}", failed.len())]
    WriteFailed {
        message: String,
        failed: Vec<EntityReference>,
    },

    /// The backend could not be reached at all.
    #[error("index engine unavailable: {0}")]
    Unavailable(String),
}

impl IndexError {
    /// References whose index state is now in doubt, if known.
    #[must_use]
    pub fn failed_references(&self) -> &[EntityReference] {
        match self {
            IndexError::WriteFailed { failed, .. } => failed,
            IndexError::Unavailable(_) => &[],
        }
    }
}
