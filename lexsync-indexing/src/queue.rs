//! Queue-backed event sending.
//!
//! When indexing is deferred to an external queue, a flushing plan does not
//! touch the index at all: it serializes its pending works to change events
//! and hands them to an [`EventSender`]. "Sent" is terminal success for this
//! layer; whatever happens to the events downstream is the consumer's
//! concern (see [`crate::processor`]).

use lexsync_types::ChangeEvent;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Errors from the queue transport.
///
/// The error takes ownership of the batch the transport did not accept,
/// so callers can resubmit without the sender ever copying events on the
/// successful path.
#[derive(Debug, Error)]
pub enum SendError {
    /// The transport is shut down; nobody will ever receive the batch.
    #[error("event queue transport is closed; {} events were not delivered", events.len())]
    Closed { events: Vec<ChangeEvent> },

    /// The transport refused the batch.
    #[error("event queue rejected a batch of {}: {message}", events.len())]
    Rejected {
        message: String,
        events: Vec<ChangeEvent>,
    },
}

impl SendError {
    /// The events the transport did not accept.
    #[must_use]
    pub fn undelivered(&self) -> &[ChangeEvent] {
        match self {
            SendError::Closed { events } | SendError::Rejected { events, .. } => events,
        }
    }

    /// Takes the undelivered events back for resubmission.
    #[must_use]
    pub fn into_events(self) -> Vec<ChangeEvent> {
        match self {
            SendError::Closed { events } | SendError::Rejected { events, .. } => events,
        }
    }
}

/// Transport seam for outbound change events.
///
/// `send` blocks until the transport has accepted the batch, not until the
/// events are processed. On failure the batch travels back inside the
/// error. Implementations decide their own retry and durability story.
pub trait EventSender: Send + Sync {
    /// Hands one batch to the transport.
    fn send(&self, events: Vec<ChangeEvent>) -> Result<(), SendError>;
}

/// Buffers change events and sends them as one batch.
///
/// The sending side of a queue-backed flush: the plan appends its events
/// here, then `send_all` pushes them through the sender. The consumer-side
/// processing plan reuses the same type to re-enqueue failed events.
pub struct QueueSendingPlan {
    sender: Arc<dyn EventSender>,
    events: Vec<ChangeEvent>,
}

impl QueueSendingPlan {
    /// Creates an empty sending plan over a transport.
    #[must_use]
    pub fn new(sender: Arc<dyn EventSender>) -> Self {
        Self {
            sender,
            events: Vec::new(),
        }
    }

    /// Buffers one event.
    pub fn append(&mut self, event: ChangeEvent) {
        self.events.push(event);
    }

    /// Number of buffered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Sends every buffered event as one batch and returns the count.
    ///
    /// An empty plan short-circuits without touching the transport. The
    /// batch is handed over without copying; on failure the returned
    /// error owns the undelivered events, and the caller decides whether
    /// to resubmit them.
    pub fn send_all(&mut self) -> Result<usize, SendError> {
        if self.events.is_empty() {
            return Ok(0);
        }
        let batch = std::mem::take(&mut self.events);
        let count = batch.len();
        self.sender.send(batch)?;
        debug!("Sent {count} change events to the queue");
        Ok(count)
    }
}

/// Bundled transport over a bounded tokio channel.
///
/// The constructor returns the receiver so the embedder can hand it to
/// [`crate::processor::run_queue_worker`]. `send` uses `blocking_send` and
/// must therefore be called from a blocking context, which flushing
/// sessions are.
pub struct ChannelEventSender {
    tx: mpsc::Sender<Vec<ChangeEvent>>,
}

impl ChannelEventSender {
    /// Creates a sender/receiver pair with the given batch capacity.
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<Vec<ChangeEvent>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl EventSender for ChannelEventSender {
    fn send(&self, events: Vec<ChangeEvent>) -> Result<(), SendError> {
        self.tx
            .blocking_send(events)
            .map_err(|err| SendError::Closed { events: err.0 })
    }
}

/// A recording sender for tests.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Captures every sent batch; can fail the next send on demand.
    #[derive(Default)]
    pub struct RecordingSender {
        batches: Mutex<Vec<Vec<ChangeEvent>>>,
        fail_next: Mutex<Option<String>>,
    }

    impl RecordingSender {
        /// Creates an empty recording sender.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes the next `send` fail with [`SendError::Rejected`].
        pub fn fail_next_send(&self, message: impl Into<String>) {
            *self.fail_next.lock().unwrap() = Some(message.into());
        }

        /// The batches sent so far, in order.
        #[must_use]
        pub fn batches(&self) -> Vec<Vec<ChangeEvent>> {
            self.batches.lock().unwrap().clone()
        }

        /// Every sent event, flattened across batches.
        #[must_use]
        pub fn sent_events(&self) -> Vec<ChangeEvent> {
            self.batches.lock().unwrap().iter().flatten().cloned().collect()
        }
    }

    impl EventSender for RecordingSender {
        fn send(&self, events: Vec<ChangeEvent>) -> Result<(), SendError> {
            if let Some(message) = self.fail_next.lock().unwrap().take() {
                return Err(SendError::Rejected { message, events });
            }
            self.batches.lock().unwrap().push(events);
            Ok(())
        }
    }
}
