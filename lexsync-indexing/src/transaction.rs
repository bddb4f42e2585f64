//! Transaction-boundary synchronization.
//!
//! The embedder registers an [`IndexingPlanSynchronization`] with its
//! transaction manager for every transaction that touched indexed entities.
//! The hook flushes the transaction's indexing plan either just before the
//! commit (so a flush failure can still abort the transaction) or only
//! after the commit succeeded, and discards it on rollback. Whatever the
//! transaction manager does, a plan is flushed at most once.

use crate::error::FlushError;
use crate::plan::IndexingPlan;
use crate::strategy::SynchronizationPolicy;
use lexsync_engine::IndexingFailure;
use lexsync_types::TransactionId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// How the transaction manager reports a finished transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Committed,
    RolledBack,
}

/// The callback shape the transaction manager invokes.
pub trait TransactionSynchronization: Send + Sync {
    /// Called just before the transaction commits. An error may abort the
    /// commit.
    fn before_completion(&self) -> Result<(), FlushError>;

    /// Called once the transaction finished, with its outcome.
    fn after_completion(&self, status: CompletionStatus);
}

/// Pending indexing plans of one session, keyed by transaction.
///
/// Listeners reach the plan through [`with_plan`](Self::with_plan) while
/// the transaction runs; the synchronization takes the plan out to flush
/// it. A taken slot is gone, which is what makes the flush happen at most
/// once even if callbacks repeat.
#[derive(Default)]
pub struct SessionPlanHolder {
    plans: Mutex<HashMap<TransactionId, IndexingPlan>>,
}

impl SessionPlanHolder {
    /// Creates an empty holder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the plan for a transaction.
    ///
    /// A transaction owns at most one plan; installing over an existing one
    /// replaces it and discards the previous plan.
    pub fn install(&self, transaction_id: TransactionId, plan: IndexingPlan) {
        let previous = self.plans.lock().unwrap().insert(transaction_id, plan);
        if let Some(previous) = previous {
            warn!("Replacing indexing plan for transaction {transaction_id}");
            previous.discard();
        }
    }

    /// Runs a closure against the pending plan, if one is installed.
    ///
    /// This is how entity-change listeners record operations: the plan
    /// never leaves the holder while the transaction is active.
    pub fn with_plan<R>(
        &self,
        transaction_id: TransactionId,
        f: impl FnOnce(&mut IndexingPlan) -> R,
    ) -> Option<R> {
        self.plans.lock().unwrap().get_mut(&transaction_id).map(f)
    }

    /// Takes the pending plan out, leaving the slot empty.
    #[must_use]
    pub fn take_plan(&self, transaction_id: TransactionId) -> Option<IndexingPlan> {
        self.plans.lock().unwrap().remove(&transaction_id)
    }

    /// Drops the pending plan without flushing, if one is installed.
    pub fn discard(&self, transaction_id: TransactionId) {
        if let Some(plan) = self.take_plan(transaction_id) {
            plan.discard();
        }
    }

    /// Number of transactions with a pending plan.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.plans.lock().unwrap().len()
    }
}

/// When the hook flushes relative to the commit.
///
/// Chosen once at coordinator construction: senders that enlist in the
/// ambient transaction flush before the commit, everything else flushes
/// after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTiming {
    /// Flush inside `before_completion`; failures can abort the commit.
    BeforeCommit,

    /// Flush on `after_completion(Committed)`; failures go to the failure
    /// handler, the data transaction is already durable.
    AfterCommit,
}

/// Where the hook is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    /// Attached to the transaction, plan not flushed yet.
    Registered,

    /// The flush ran (successfully or not); completion not yet observed.
    Flushed,

    /// The transaction completed after a flush.
    Done,

    /// The transaction rolled back; the plan was discarded unflushed.
    Aborted,
}

/// The per-transaction hook flushing one indexing plan.
///
/// Invalid once the transaction completed: repeated completion callbacks
/// are tolerated but never flush again.
pub struct IndexingPlanSynchronization {
    timing: FlushTiming,
    holder: Arc<SessionPlanHolder>,
    transaction_id: TransactionId,
    policy: SynchronizationPolicy,
    state: Mutex<HookState>,
}

impl IndexingPlanSynchronization {
    /// Creates a hook for a plan already installed in the holder.
    #[must_use]
    pub fn new(
        timing: FlushTiming,
        holder: Arc<SessionPlanHolder>,
        transaction_id: TransactionId,
        policy: SynchronizationPolicy,
    ) -> Self {
        Self {
            timing,
            holder,
            transaction_id,
            policy,
            state: Mutex::new(HookState::Registered),
        }
    }

    /// The transaction this hook belongs to.
    #[must_use]
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// The flush timing this hook was built with.
    #[must_use]
    pub fn timing(&self) -> FlushTiming {
        self.timing
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> HookState {
        *self.state.lock().unwrap()
    }

    /// Flushes after a successful commit, reporting failures to the
    /// failure handler: there is no caller left to propagate to, and the
    /// database changes are already durable.
    fn flush_after_commit(&self) {
        let Some(plan) = self.holder.take_plan(self.transaction_id) else {
            return;
        };
        if let Err(err) = self.policy.execute(plan) {
            let failure =
                IndexingFailure::new("indexing after transaction commit", err.to_string())
                    .with_entities(err.failed_references().to_vec());
            self.policy.failure_handler().handle(failure);
        }
    }
}

impl TransactionSynchronization for IndexingPlanSynchronization {
    fn before_completion(&self) -> Result<(), FlushError> {
        if self.timing != FlushTiming::BeforeCommit {
            return Ok(());
        }
        {
            let mut state = self.state.lock().unwrap();
            if *state != HookState::Registered {
                return Ok(());
            }
            // Marked before the flush runs: a failed flush consumed the
            // plan and must not run again.
            *state = HookState::Flushed;
        }
        match self.holder.take_plan(self.transaction_id) {
            Some(plan) => self.policy.execute(plan),
            None => Ok(()),
        }
    }

    fn after_completion(&self, status: CompletionStatus) {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                // Repeated completion callback.
                HookState::Done | HookState::Aborted => return,
                HookState::Flushed => {
                    *state = HookState::Done;
                    return;
                }
                HookState::Registered => {}
            }
            if status == CompletionStatus::RolledBack {
                *state = HookState::Aborted;
                drop(state);
                debug!(
                    "Transaction {} rolled back; discarding its indexing plan",
                    self.transaction_id
                );
                self.holder.discard(self.transaction_id);
                return;
            }
            match self.timing {
                FlushTiming::AfterCommit => {
                    *state = HookState::Flushed;
                }
                FlushTiming::BeforeCommit => {
                    // The transaction manager committed without invoking
                    // the pre-commit callback; too late to flush safely.
                    *state = HookState::Done;
                    drop(state);
                    warn!(
                        "Transaction {} committed without a pre-commit callback; \
                         discarding its indexing plan",
                        self.transaction_id
                    );
                    self.holder.discard(self.transaction_id);
                    return;
                }
            }
        }
        self.flush_after_commit();
        *self.state.lock().unwrap() = HookState::Done;
    }
}
