//! Change events for queue-backed sending.
//!
//! When indexing is routed through an external queue, each coalesced work is
//! serialized to a change event and handed to the transport. The event
//! carries everything the consumer needs to rebuild the document work; the
//! originating session never crosses the queue.

use crate::{DocumentWork, EntityReference, WorkKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new event ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// One pending index operation, serialized for an external queue.
///
/// Events are immutable once created. Ordering across sessions is the
/// transport's concern; within one send the producing plan preserves its
/// insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Unique identifier for this event.
    pub id: EventId,

    /// The mutation kind.
    pub kind: WorkKind,

    /// The entity the mutation targets.
    pub reference: EntityReference,

    /// The document to write. `None` for deletes.
    pub document: Option<Value>,

    /// When this event was created.
    pub created_at: DateTime<Utc>,
}

impl ChangeEvent {
    /// Creates an event for one pending work.
    #[must_use]
    pub fn new(kind: WorkKind, reference: EntityReference, document: Option<Value>) -> Self {
        Self {
            id: EventId::new(),
            kind,
            reference,
            document,
            created_at: Utc::now(),
        }
    }

    /// Creates an add-or-update event.
    #[must_use]
    pub fn add_or_update(reference: EntityReference, document: Value) -> Self {
        Self::new(WorkKind::AddOrUpdate, reference, Some(document))
    }

    /// Creates a delete event.
    #[must_use]
    pub fn delete(reference: EntityReference) -> Self {
        Self::new(WorkKind::Delete, reference, None)
    }

    /// Serializes the event to JSON bytes for the transport.
    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserializes an event from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl From<ChangeEvent> for DocumentWork {
    fn from(event: ChangeEvent) -> Self {
        Self {
            kind: event.kind,
            reference: event.reference,
            document: event.document,
        }
    }
}
