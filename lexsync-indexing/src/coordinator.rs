//! The per-mapping indexing coordinator.
//!
//! One coordinator exists per mapping context. `start` resolves the
//! configuration into the default synchronization policy and registers the
//! entity-change listener; after that the coordinator is a read-only
//! factory for per-session plans and per-transaction synchronizations.
//! `start` and `stop` run single-threaded at application bootstrap and
//! shutdown; session threads only read.

use crate::context::{ListenerRegistration, MappingContext, SessionContext, StartContext};
use crate::error::{ConfigError, IndexingError, IndexingResult};
use crate::plan::IndexingPlan;
use crate::processor::QueueProcessingPlan;
use crate::queue::{EventSender, QueueSendingPlan};
use crate::settings::{
    self, ListenerSettings, StrategySelection, DEFAULT_SYNCHRONIZATION_STRATEGY,
};
use crate::strategy::{
    StrategyHandle, SynchronizationPolicy, SynchronizationPolicyBuilder, SynchronizationStrategy,
};
use crate::transaction::{FlushTiming, IndexingPlanSynchronization, SessionPlanHolder};
use lexsync_engine::CommitStrategy;
use lexsync_types::TransactionId;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builds the event sender for one session.
///
/// Only present when indexing goes through an external queue; transports
/// get the session context so they can scope their resources.
pub type SenderFactory = Arc<dyn Fn(&SessionContext) -> Arc<dyn EventSender> + Send + Sync>;

struct Started {
    mapping: Arc<dyn MappingContext>,
    default_policy: SynchronizationPolicy,
    strategy_handle: Option<StrategyHandle>,
    listener_settings: ListenerSettings,
}

/// Orchestrates indexing for one mapping context.
pub struct IndexingCoordinator {
    sender_factory: Option<SenderFactory>,
    flush_timing: FlushTiming,
    started: Option<Started>,
}

impl IndexingCoordinator {
    /// Creates a coordinator.
    ///
    /// A present `sender_factory` switches the whole mapping to
    /// queue-backed indexing. `enlists_in_transaction` says whether the
    /// write mechanism participates in the ambient transaction, which
    /// fixes the flush timing of every synchronization this coordinator
    /// creates: enlisted mechanisms flush before the commit, everything
    /// else after.
    #[must_use]
    pub fn new(sender_factory: Option<SenderFactory>, enlists_in_transaction: bool) -> Self {
        Self {
            sender_factory,
            flush_timing: if enlists_in_transaction {
                FlushTiming::BeforeCommit
            } else {
                FlushTiming::AfterCommit
            },
            started: None,
        }
    }

    /// True when indexing is deferred to an external queue.
    #[must_use]
    pub fn uses_async_processing(&self) -> bool {
        self.sender_factory.is_some()
    }

    /// The flush timing of every synchronization this coordinator creates.
    #[must_use]
    pub fn flush_timing(&self) -> FlushTiming {
        self.flush_timing
    }

    /// Resolves the configuration and registers the entity-change
    /// listener.
    ///
    /// Fails on contradictory settings; deprecation notices are logged and
    /// never fail. Calling `start` on a started coordinator is a no-op.
    pub fn start(
        &mut self,
        mapping: Arc<dyn MappingContext>,
        context: &StartContext<'_>,
    ) -> IndexingResult<()> {
        if self.started.is_some() {
            warn!("Indexing coordinator already started");
            return Ok(());
        }

        let selection =
            settings::resolve_strategy_selection(context.config, self.uses_async_processing())?;
        for notice in &selection.warnings {
            warn!("{notice}");
        }

        let (default_policy, strategy_handle) = match selection.value {
            StrategySelection::ForcedWriteSync => {
                // Commit/refresh semantics are meaningless for queued
                // writes; the session only blocks until the send is
                // acknowledged.
                let mut builder = SynchronizationPolicyBuilder::new(mapping.failure_handler());
                builder.commit(CommitStrategy::Force);
                (builder.build(DEFAULT_SYNCHRONIZATION_STRATEGY), None)
            }
            StrategySelection::Resolve { name, key } => {
                let handle = context.resolver.resolve(&name, &key)?;
                let mut builder = SynchronizationPolicyBuilder::new(mapping.failure_handler());
                handle.strategy().apply(&mut builder);
                (builder.build(name), Some(handle))
            }
        };
        debug!(
            "Resolved default synchronization policy '{}'",
            default_policy.name()
        );

        let listeners = settings::resolve_listener_settings(context.config)?;
        for notice in &listeners.warnings {
            warn!("{notice}");
        }
        if listeners.value.enabled {
            mapping.register_indexing_listener(ListenerRegistration {
                dirty_check_enabled: listeners.value.dirty_check_enabled,
            });
            debug!(
                "Registered entity-change indexing listener (dirty check: {})",
                listeners.value.dirty_check_enabled
            );
        } else {
            info!("Entity-change indexing listeners are disabled by configuration");
        }

        self.started = Some(Started {
            mapping,
            default_policy,
            strategy_handle,
            listener_settings: listeners.value,
        });
        Ok(())
    }

    /// Releases the resolved strategy and drops the mapping reference.
    ///
    /// Safe without a prior (or after a failed) `start`, and safe to call
    /// twice; the strategy's release hook runs at most once.
    pub fn stop(&mut self) {
        if let Some(mut started) = self.started.take() {
            if let Some(handle) = started.strategy_handle.as_mut() {
                handle.release();
            }
            debug!("Indexing coordinator stopped");
        }
    }

    fn started(&self) -> IndexingResult<&Started> {
        self.started.as_ref().ok_or(IndexingError::NotStarted)
    }

    /// The listener settings resolved at startup.
    pub fn listener_settings(&self) -> IndexingResult<ListenerSettings> {
        Ok(self.started()?.listener_settings)
    }

    /// The default synchronization policy resolved at startup.
    pub fn default_synchronization(&self) -> IndexingResult<SynchronizationPolicy> {
        Ok(self.started()?.default_policy.clone())
    }

    /// Builds a one-off policy from a caller-provided strategy.
    ///
    /// Only available in direct mode: under queue-backed indexing the
    /// policy is fixed and overriding it is a configuration error.
    pub fn override_synchronization(
        &self,
        strategy: &dyn SynchronizationStrategy,
    ) -> IndexingResult<SynchronizationPolicy> {
        let started = self.started()?;
        if self.uses_async_processing() {
            return Err(ConfigError::StrategyOverrideWithQueue.into());
        }
        let mut builder = SynchronizationPolicyBuilder::new(started.mapping.failure_handler());
        strategy.apply(&mut builder);
        Ok(builder.build("overridden"))
    }

    /// Creates the indexing plan for one unit-of-work.
    ///
    /// Queue mode builds a plan that serializes to the session's sender;
    /// direct mode builds a plan writing into the engine with the policy's
    /// commit/refresh flags.
    pub fn create_indexing_plan(
        &self,
        session: &SessionContext,
        policy: &SynchronizationPolicy,
    ) -> IndexingResult<IndexingPlan> {
        let started = self.started()?;
        match &self.sender_factory {
            Some(factory) => {
                let sender = factory(session);
                Ok(IndexingPlan::queued(QueueSendingPlan::new(sender)))
            }
            None => Ok(IndexingPlan::direct(
                started.mapping.index_engine(),
                policy.commit(),
                policy.refresh(),
            )),
        }
    }

    /// Installs a plan for a transaction and returns its synchronization.
    ///
    /// The embedder registers the returned hook with its transaction
    /// manager; the flush timing was fixed at coordinator construction.
    pub fn create_transaction_synchronization(
        &self,
        plan: IndexingPlan,
        holder: Arc<SessionPlanHolder>,
        transaction_id: TransactionId,
        policy: &SynchronizationPolicy,
    ) -> IndexingResult<IndexingPlanSynchronization> {
        self.started()?;
        holder.install(transaction_id, plan);
        Ok(IndexingPlanSynchronization::new(
            self.flush_timing,
            holder,
            transaction_id,
            policy.clone(),
        ))
    }

    /// Creates the consumer-side plan applying received queue events.
    ///
    /// Requires queue-backed indexing: the retry path re-enqueues failed
    /// events through a fresh sending plan over the session's sender.
    pub fn create_queue_processing_plan(
        &self,
        session: &SessionContext,
        policy: &SynchronizationPolicy,
    ) -> IndexingResult<QueueProcessingPlan> {
        let started = self.started()?;
        let factory = self
            .sender_factory
            .as_ref()
            .ok_or(IndexingError::QueueNotConfigured)?;
        let retry = QueueSendingPlan::new(factory(session));
        Ok(QueueProcessingPlan::new(
            started.mapping.index_engine(),
            policy.commit(),
            policy.refresh(),
            retry,
            policy.failure_handler(),
        ))
    }
}
