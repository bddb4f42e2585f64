//! Seams toward the mapper and the session.
//!
//! The indexing subsystem never owns the object/relational mapping; it
//! reaches the index engine, the failure handler, and listener registration
//! through [`MappingContext`]. A [`SessionContext`] identifies one
//! persistence session, which is all sender factories need.

use crate::config::ConfigSource;
use crate::strategy::StrategyResolver;
use lexsync_engine::{FailureHandler, IndexEngine};
use lexsync_types::SessionId;
use std::sync::Arc;

/// What the coordinator asks the mapper to install at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerRegistration {
    /// Whether listeners skip reindexing when the changed fields cannot
    /// affect the index.
    pub dirty_check_enabled: bool,
}

/// The mapper-side surface the coordinator runs against.
pub trait MappingContext: Send + Sync {
    /// The index engine this mapping writes to.
    fn index_engine(&self) -> Arc<dyn IndexEngine>;

    /// The mapping's failure handler, seeded into every policy.
    fn failure_handler(&self) -> Arc<dyn FailureHandler>;

    /// Installs the entity-change listener.
    fn register_indexing_listener(&self, registration: ListenerRegistration);
}

/// Everything `start` needs besides the mapping itself.
pub struct StartContext<'a> {
    /// The embedder's configuration.
    pub config: &'a dyn ConfigSource,

    /// Resolves configured strategy names (plugin registry seam).
    pub resolver: &'a dyn StrategyResolver,
}

/// Identity of one persistence session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionContext {
    session_id: SessionId,
}

impl SessionContext {
    /// Creates a context with a fresh session id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_id: SessionId::new(),
        }
    }

    /// Creates a context for an existing session.
    #[must_use]
    pub fn with_id(session_id: SessionId) -> Self {
        Self { session_id }
    }

    /// The session identifier.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A recording mapping context for tests.
pub mod mock {
    use super::*;
    use lexsync_engine::{LoggingFailureHandler, MemoryIndexEngine};
    use std::sync::Mutex;

    /// Mapping context over a [`MemoryIndexEngine`], recording listener
    /// registrations.
    pub struct MockMapping {
        engine: Arc<MemoryIndexEngine>,
        failure_handler: Arc<dyn FailureHandler>,
        registrations: Mutex<Vec<ListenerRegistration>>,
    }

    impl MockMapping {
        /// Creates a mapping with an empty engine and the logging failure
        /// handler.
        #[must_use]
        pub fn new() -> Self {
            Self::with_failure_handler(Arc::new(LoggingFailureHandler))
        }

        /// Creates a mapping reporting failures to the given handler.
        #[must_use]
        pub fn with_failure_handler(failure_handler: Arc<dyn FailureHandler>) -> Self {
            Self {
                engine: Arc::new(MemoryIndexEngine::new()),
                failure_handler,
                registrations: Mutex::new(Vec::new()),
            }
        }

        /// The underlying memory engine, for assertions.
        #[must_use]
        pub fn engine(&self) -> Arc<MemoryIndexEngine> {
            Arc::clone(&self.engine)
        }

        /// The listener registrations seen so far.
        #[must_use]
        pub fn registrations(&self) -> Vec<ListenerRegistration> {
            self.registrations.lock().unwrap().clone()
        }
    }

    impl Default for MockMapping {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MappingContext for MockMapping {
        fn index_engine(&self) -> Arc<dyn IndexEngine> {
            self.engine()
        }

        fn failure_handler(&self) -> Arc<dyn FailureHandler> {
            Arc::clone(&self.failure_handler)
        }

        fn register_indexing_listener(&self, registration: ListenerRegistration) {
            self.registrations.lock().unwrap().push(registration);
        }
    }
}
