//! Failure handling for writes no caller can observe.
//!
//! Background report modes, after-commit hooks, and the queue worker all
//! flush at points where no caller is left to receive a `Result`. Failures
//! from those paths are routed to a `FailureHandler` instead of being lost.

use lexsync_types::EntityReference;
use std::fmt;
use tracing::error;

/// Context for one reported indexing failure.
#[derive(Debug, Clone)]
pub struct IndexingFailure {
    /// The operation that failed (e.g. "indexing", "queue event processing").
    pub operation: String,

    /// Human-readable failure description.
    pub message: String,

    /// Entities whose index state may now be stale.
    pub entities: Vec<EntityReference>,
}

impl IndexingFailure {
    /// Creates a failure report with no entity detail.
    #[must_use]
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
            entities: Vec::new(),
        }
    }

    /// Attaches the affected entity references.
    #[must_use]
    pub fn with_entities(mut self, entities: Vec<EntityReference>) -> Self {
        self.entities = entities;
        self
    }
}

impl fmt::Display for IndexingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.operation, self.message)?;
        if !self.entities.is_empty() {
            write!(f, " (affected: ")?;
            for (i, reference) in self.entities.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{reference}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Sink for failures that cannot be propagated to a caller.
///
/// Implementations must not panic; a panicking handler would take down
/// whatever background context invoked it.
pub trait FailureHandler: Send + Sync {
    /// Reports one failure.
    fn handle(&self, failure: IndexingFailure);
}

/// Default handler: reports through `tracing::error!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingFailureHandler;

impl FailureHandler for LoggingFailureHandler {
    fn handle(&self, failure: IndexingFailure) {
        error!("{}", failure);
    }
}
