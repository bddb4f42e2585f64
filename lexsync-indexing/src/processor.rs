//! Consumer side of queue-backed indexing.
//!
//! Batches of change events sent by producing sessions are applied to the
//! index engine here, out-of-band. Events whose write failed are
//! re-enqueued through a fresh sending plan, so the queue retries them on
//! its own schedule instead of losing them.

use crate::error::FlushError;
use crate::queue::QueueSendingPlan;
use lexsync_engine::{
    CommitStrategy, FailureHandler, IndexEngine, IndexingFailure, RefreshStrategy,
};
use lexsync_types::{ChangeEvent, DocumentWork};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// What processing one batch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Events whose works reached the index.
    pub applied: usize,

    /// Events re-enqueued for a later retry.
    pub requeued: usize,
}

/// Applies received change events to the index engine.
///
/// The inverse of a queued [`IndexingPlan`](crate::IndexingPlan): events
/// come off
/// the queue, become document works, and are written with the configured
/// commit/refresh flags.
pub struct QueueProcessingPlan {
    engine: Arc<dyn IndexEngine>,
    commit: CommitStrategy,
    refresh: RefreshStrategy,
    retry: QueueSendingPlan,
    failure_handler: Arc<dyn FailureHandler>,
}

impl QueueProcessingPlan {
    /// Creates a processing plan.
    ///
    /// `retry` wraps the original sending transport so failed events go
    /// back onto the same queue.
    #[must_use]
    pub fn new(
        engine: Arc<dyn IndexEngine>,
        commit: CommitStrategy,
        refresh: RefreshStrategy,
        retry: QueueSendingPlan,
        failure_handler: Arc<dyn FailureHandler>,
    ) -> Self {
        Self {
            engine,
            commit,
            refresh,
            retry,
            failure_handler,
        }
    }

    /// Applies one batch of events, in order.
    ///
    /// On a write failure, exactly the failed events are re-enqueued
    /// through the retry plan and reported to the failure handler; the
    /// batch still counts as processed. An engine failure that names no
    /// references re-enqueues the whole batch. The only error this returns
    /// is a retry-send failure, which carries the undelivered events; the
    /// caller decides what to do with them.
    pub fn process(&mut self, events: Vec<ChangeEvent>) -> Result<ProcessOutcome, FlushError> {
        if events.is_empty() {
            return Ok(ProcessOutcome {
                applied: 0,
                requeued: 0,
            });
        }

        let total = events.len();
        let works: Vec<DocumentWork> = events.iter().cloned().map(DocumentWork::from).collect();

        let err = match self.engine.execute(works, self.commit, self.refresh) {
            Ok(()) => {
                return Ok(ProcessOutcome {
                    applied: total,
                    requeued: 0,
                });
            }
            Err(err) => err,
        };

        let failed: HashSet<_> = err.failed_references().iter().cloned().collect();
        let requeue: Vec<ChangeEvent> = if failed.is_empty() {
            events
        } else {
            events
                .into_iter()
                .filter(|event| failed.contains(&event.reference))
                .collect()
        };

        let failure = IndexingFailure::new("queue event processing", err.to_string())
            .with_entities(requeue.iter().map(|event| event.reference.clone()).collect());
        self.failure_handler.handle(failure);

        let requeued = requeue.len();
        for event in requeue {
            self.retry.append(event);
        }
        self.retry.send_all()?;

        Ok(ProcessOutcome {
            applied: total - requeued,
            requeued,
        })
    }
}

/// Drains the event queue until it closes.
///
/// Each received batch is applied on the blocking pool, since engine
/// writes may block on durability. Failures never propagate past the
/// loop: failed events were already re-enqueued by the plan, and a failed
/// retry-send is logged and dropped.
pub async fn run_queue_worker(
    mut plan: QueueProcessingPlan,
    mut receiver: mpsc::Receiver<Vec<ChangeEvent>>,
) {
    while let Some(batch) = receiver.recv().await {
        let size = batch.len();
        let result = tokio::task::spawn_blocking(move || {
            let outcome = plan.process(batch);
            (plan, outcome)
        })
        .await;

        match result {
            Ok((returned, Ok(outcome))) => {
                plan = returned;
                debug!(
                    "Processed queue batch of {size}: {} applied, {} requeued",
                    outcome.applied, outcome.requeued
                );
            }
            Ok((returned, Err(err))) => {
                plan = returned;
                error!("Failed to re-enqueue events from a queue batch of {size}: {err}");
            }
            Err(join_err) => {
                error!("Queue processing task panicked: {join_err}");
                return;
            }
        }
    }
    debug!("Event queue closed; queue worker exiting");
}
