//! Transactional search-index synchronization for Lexsync.
//!
//! Keeps a full-text search index in step with an object-relational
//! persistence layer, one unit-of-work at a time: entity mutations
//! accumulate in an indexing plan, and at the transaction boundary a
//! synchronization hook flushes the plan with a configurable consistency
//! guarantee.
//!
//! ## Components
//!
//! - **Settings**: pure resolution of the (partly deprecated) property
//!   keys into listener settings and a strategy selection
//! - **Strategy**: how far a flushing session blocks (durability, search
//!   visibility) and where failures go
//! - **Plan**: the per-unit-of-work accumulator, coalescing repeated
//!   operations per entity
//! - **Queue**: serialized change-event sending for deferred indexing
//! - **Transaction**: before-/after-commit synchronization hooks
//! - **Coordinator**: per-mapping lifecycle and the factory for all of
//!   the above
//! - **Processor**: the consumer-side worker applying queued events
//!
//! # Example
//!
//! ```
//! use lexsync_indexing::config::MapConfigSource;
//! use lexsync_indexing::context::{mock::MockMapping, SessionContext, StartContext};
//! use lexsync_indexing::strategy::BuiltinStrategyResolver;
//! use lexsync_indexing::IndexingCoordinator;
//! use lexsync_types::EntityReference;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let mapping = Arc::new(MockMapping::new());
//! let config = MapConfigSource::new();
//! let resolver = BuiltinStrategyResolver;
//!
//! let mut coordinator = IndexingCoordinator::new(None, false);
//! coordinator
//!     .start(mapping.clone(), &StartContext { config: &config, resolver: &resolver })
//!     .unwrap();
//!
//! let policy = coordinator.default_synchronization().unwrap();
//! let session = SessionContext::new();
//! let mut plan = coordinator.create_indexing_plan(&session, &policy).unwrap();
//! plan.add(EntityReference::new("book", "1"), json!({"title": "Dune"}));
//! policy.execute(plan).unwrap();
//!
//! coordinator.stop();
//! ```

pub mod config;
pub mod context;
mod coordinator;
mod error;
mod plan;
pub mod processor;
pub mod queue;
pub mod settings;
pub mod strategy;
pub mod transaction;

pub use coordinator::{IndexingCoordinator, SenderFactory};
pub use error::{ConfigError, FlushError, IndexingError, IndexingResult};
pub use plan::{FlushOutcome, IndexingPlan};
pub use processor::{run_queue_worker, ProcessOutcome, QueueProcessingPlan};
pub use queue::{ChannelEventSender, EventSender, QueueSendingPlan, SendError};
pub use settings::{DeprecationNotice, ListenerSettings, Resolved, StrategySelection};
pub use strategy::{
    BuiltinStrategy, BuiltinStrategyResolver, ReportMode, StrategyHandle, StrategyResolver,
    SynchronizationPolicy, SynchronizationPolicyBuilder, SynchronizationStrategy,
};
pub use transaction::{
    CompletionStatus, FlushTiming, HookState, IndexingPlanSynchronization, SessionPlanHolder,
    TransactionSynchronization,
};
