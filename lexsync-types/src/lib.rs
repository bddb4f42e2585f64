//! Core type definitions for Lexsync.
//!
//! This crate defines the fundamental, engine-agnostic types shared by the
//! indexing subsystem:
//! - Entity references (mapped type name + identifier)
//! - Document works, the mutations applied to the search index
//! - Change events, the queue-serialized form of pending works
//! - Transaction and session identifiers (UUID v7)
//!
//! Anything that knows about plans, strategies, or transaction boundaries
//! belongs in `lexsync-indexing`, not here.

mod event;
mod ids;
mod reference;
mod work;

pub use event::{ChangeEvent, EventId};
pub use ids::{SessionId, TransactionId};
pub use reference::EntityReference;
pub use work::{DocumentWork, WorkKind};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),
}
