//! Index engine seam for Lexsync.
//!
//! This crate defines the surfaces through which the indexing subsystem
//! reaches the actual full-text backend:
//! - `IndexEngine`, the one-call-per-flush write interface
//! - `CommitStrategy` / `RefreshStrategy`, how hard a write call blocks
//! - `FailureHandler`, the sink for failures no caller can observe
//! - `MemoryIndexEngine`, an in-process engine for tests and embedding
//!
//! The real backend (Lucene-like library, remote search cluster) lives
//! behind `IndexEngine`; nothing in this workspace talks to one directly.

mod engine;
mod error;
mod failure;
mod memory;

pub use engine::{CommitStrategy, IndexEngine, RefreshStrategy};
pub use error::{IndexError, IndexResult};
pub use failure::{FailureHandler, IndexingFailure, LoggingFailureHandler};
pub use memory::MemoryIndexEngine;
