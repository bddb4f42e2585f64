//! Error types for the indexing subsystem.

use crate::queue::SendError;
use lexsync_engine::IndexError;
use lexsync_types::EntityReference;
use thiserror::Error;

/// Result type for coordinator-level operations.
pub type IndexingResult<T> = Result<T, IndexingError>;

/// Fatal configuration errors.
///
/// These are never retried: the settings are contradictory and have to be
/// fixed before the subsystem can start. Messages carry the exact property
/// names so operators can act on them.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Both the current and the deprecated listener toggles are set.
    #[error("both '{current}' and its deprecated alias '{legacy}' are set; set only '{current}'")]
    AmbiguousListenerFlags { current: String, legacy: String },

    /// Both the current and the deprecated strategy selectors are set.
    #[error("both '{current}' and its deprecated alias '{legacy}' are set; set only '{current}'")]
    AmbiguousStrategyKeys { current: String, legacy: String },

    /// A synchronization strategy property was set while indexing goes
    /// through an event queue.
    #[error("cannot set '{key}': synchronization strategies cannot be used with queue-backed indexing, because works are applied when events are processed, not when the session flushes")]
    StrategyConfiguredWithQueue { key: String },

    /// A per-session strategy override was requested while indexing goes
    /// through an event queue.
    #[error("cannot override the synchronization strategy: strategies cannot be used with queue-backed indexing")]
    StrategyOverrideWithQueue,

    /// The configured strategy name matches no registered strategy.
    #[error("invalid value for '{key}': unknown synchronization strategy '{name}'")]
    UnknownStrategy { key: String, name: String },

    /// A boolean property held something other than true/false.
    #[error("invalid value for '{key}': expected 'true' or 'false', got '{raw}'")]
    InvalidBool { key: String, raw: String },

    /// The deprecated name-valued indexing toggle held an unknown name.
    #[error("invalid value for '{key}': expected 'none' or 'session', got '{raw}'")]
    InvalidStrategyName { key: String, raw: String },
}

/// Errors surfaced when a plan flush executes.
#[derive(Debug, Error)]
pub enum FlushError {
    /// The index engine rejected the works.
    #[error("flush failed in the index engine: {0}")]
    Engine(#[from] IndexError),

    /// The queue transport did not accept the events.
    #[error("flush failed in the event queue: {0}")]
    Queue(#[from] SendError),
}

impl FlushError {
    /// References whose index state is now in doubt, if known.
    #[must_use]
    pub fn failed_references(&self) -> &[EntityReference] {
        match self {
            FlushError::Engine(err) => err.failed_references(),
            FlushError::Queue(_) => &[],
        }
    }
}

/// Errors from coordinator-level operations.
#[derive(Debug, Error)]
pub enum IndexingError {
    /// The configuration is contradictory.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A flush failed.
    #[error("{0}")]
    Flush(#[from] FlushError),

    /// The coordinator was used before `start` or after `stop`.
    #[error("indexing coordinator not started")]
    NotStarted,

    /// A queue-only operation was requested, but no event sender factory
    /// was configured.
    #[error("queue-backed indexing is not configured: no event sender factory was provided")]
    QueueNotConfigured,
}
