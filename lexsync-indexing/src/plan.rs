//! The per-unit-of-work indexing plan.
//!
//! A plan accumulates the index mutations one database transaction implies,
//! coalescing repeated operations on the same entity down to a single
//! pending work. At the transaction boundary the plan resolves through its
//! sink: directly into the index engine, or serialized onto the event
//! queue.
//!
//! Coalescing rule (the later document payload always wins):
//!
//! | pending ↓ / next → | add | add_or_update | delete |
//! |---|---|---|---|
//! | add | add | add | entry removed |
//! | add_or_update | add_or_update | add_or_update | delete |
//! | delete | add_or_update | add_or_update | delete |
//!
//! Delete-then-add collapses to add-or-update rather than add: the
//! accumulator cannot know whether an earlier flush already put a document
//! in the index, so the upsert form is the only always-correct collapse.

use crate::error::FlushError;
use crate::queue::QueueSendingPlan;
use lexsync_engine::{CommitStrategy, IndexEngine, RefreshStrategy};
use lexsync_types::{ChangeEvent, DocumentWork, EntityReference, WorkKind};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// One coalesced pending operation.
#[derive(Debug, Clone, PartialEq)]
struct PendingWork {
    kind: WorkKind,
    document: Option<Value>,
}

/// Where a flushing plan resolves its works.
enum PlanSink {
    /// Write straight into the index engine, blocking per the flags.
    Direct {
        engine: Arc<dyn IndexEngine>,
        commit: CommitStrategy,
        refresh: RefreshStrategy,
    },

    /// Serialize to change events and enqueue them.
    Queue { sending: QueueSendingPlan },
}

/// What a flush did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The plan held nothing; the sink was not touched.
    Empty,

    /// Works were written to the index engine.
    Indexed { works: usize },

    /// Events were handed to the queue transport.
    Enqueued { events: usize },
}

impl fmt::Display for FlushOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlushOutcome::Empty => write!(f, "nothing to flush"),
            FlushOutcome::Indexed { works } => write!(f, "{works} works indexed"),
            FlushOutcome::Enqueued { events } => write!(f, "{events} events enqueued"),
        }
    }
}

/// Accumulator of index mutations for one unit-of-work.
///
/// Owned by exactly one session; there is no internal locking. At most one
/// pending operation exists per entity reference at any time, in first
/// insertion order.
pub struct IndexingPlan {
    sink: PlanSink,
    order: Vec<EntityReference>,
    pending: HashMap<EntityReference, PendingWork>,
}

impl IndexingPlan {
    /// Creates a plan that writes directly into the index engine.
    #[must_use]
    pub fn direct(
        engine: Arc<dyn IndexEngine>,
        commit: CommitStrategy,
        refresh: RefreshStrategy,
    ) -> Self {
        Self::with_sink(PlanSink::Direct {
            engine,
            commit,
            refresh,
        })
    }

    /// Creates a plan that serializes its works onto the event queue.
    #[must_use]
    pub fn queued(sending: QueueSendingPlan) -> Self {
        Self::with_sink(PlanSink::Queue { sending })
    }

    fn with_sink(sink: PlanSink) -> Self {
        Self {
            sink,
            order: Vec::new(),
            pending: HashMap::new(),
        }
    }

    /// True when this plan enqueues events instead of writing the index.
    #[must_use]
    pub fn is_queued(&self) -> bool {
        matches!(self.sink, PlanSink::Queue { .. })
    }

    /// Number of pending operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// The pending operation kind for a reference, if any.
    #[must_use]
    pub fn pending_kind(&self, reference: &EntityReference) -> Option<WorkKind> {
        self.pending.get(reference).map(|work| work.kind)
    }

    /// Records that an entity was created.
    pub fn add(&mut self, reference: EntityReference, document: Value) {
        self.merge(reference, WorkKind::Add, Some(document));
    }

    /// Records that an entity changed.
    pub fn update(&mut self, reference: EntityReference, document: Value) {
        self.merge(reference, WorkKind::AddOrUpdate, Some(document));
    }

    /// Records that an entity may or may not already be indexed.
    pub fn add_or_update(&mut self, reference: EntityReference, document: Value) {
        self.merge(reference, WorkKind::AddOrUpdate, Some(document));
    }

    /// Records that an entity was deleted.
    pub fn delete(&mut self, reference: EntityReference) {
        self.merge(reference, WorkKind::Delete, None);
    }

    fn merge(&mut self, reference: EntityReference, next: WorkKind, document: Option<Value>) {
        let Some(pending) = self.pending.get_mut(&reference) else {
            self.order.push(reference.clone());
            self.pending.insert(reference, PendingWork { kind: next, document });
            return;
        };

        match (pending.kind, next) {
            // The entity was never indexed; a delete cancels the add.
            (WorkKind::Add, WorkKind::Delete) => {
                self.pending.remove(&reference);
                self.order.retain(|entry| *entry != reference);
            }
            // Still the first version the index will ever see.
            (WorkKind::Add, _) => {
                pending.document = document;
            }
            (WorkKind::AddOrUpdate, WorkKind::Delete) => {
                pending.kind = WorkKind::Delete;
                pending.document = None;
            }
            (WorkKind::AddOrUpdate, _) => {
                pending.document = document;
            }
            (WorkKind::Delete, WorkKind::Delete) => {}
            // Re-created after a pending delete; upsert is the only
            // always-correct collapse.
            (WorkKind::Delete, _) => {
                pending.kind = WorkKind::AddOrUpdate;
                pending.document = document;
            }
        }
    }

    fn drain(&mut self) -> Vec<(EntityReference, PendingWork)> {
        let mut pending = std::mem::take(&mut self.pending);
        std::mem::take(&mut self.order)
            .into_iter()
            .filter_map(|reference| {
                pending
                    .remove(&reference)
                    .map(|work| (reference, work))
            })
            .collect()
    }

    /// Flushes the plan through its sink, consuming it.
    ///
    /// Direct plans issue one engine call for the whole batch, blocking per
    /// the commit/refresh flags. Queued plans serialize to change events
    /// and block only until the transport accepted the batch. An empty plan
    /// short-circuits without touching the sink.
    pub fn execute(mut self) -> Result<FlushOutcome, FlushError> {
        if self.pending.is_empty() {
            return Ok(FlushOutcome::Empty);
        }
        let entries = self.drain();

        match self.sink {
            PlanSink::Direct {
                engine,
                commit,
                refresh,
            } => {
                let works: Vec<DocumentWork> = entries
                    .into_iter()
                    .map(|(reference, work)| DocumentWork {
                        kind: work.kind,
                        reference,
                        document: work.document,
                    })
                    .collect();
                let count = works.len();
                engine.execute(works, commit, refresh)?;
                Ok(FlushOutcome::Indexed { works: count })
            }
            PlanSink::Queue { ref mut sending } => {
                for (reference, work) in entries {
                    sending.append(ChangeEvent::new(work.kind, reference, work.document));
                }
                let events = sending.send_all()?;
                Ok(FlushOutcome::Enqueued { events })
            }
        }
    }

    /// Drops the accumulated work without flushing (rollback path).
    pub fn discard(self) {
        if !self.pending.is_empty() {
            debug!("Discarded indexing plan with {} pending operations", self.pending.len());
        }
    }
}

impl fmt::Debug for IndexingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexingPlan")
            .field("queued", &self.is_queued())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
