//! In-memory index engine.
//!
//! Documents live in a mutexed map; commit and refresh counters record how
//! callers asked for durability so tests can assert on strategy behavior.
//! Also usable as a real engine for small embedded datasets.

use crate::{CommitStrategy, IndexEngine, IndexError, RefreshStrategy};
use lexsync_types::{DocumentWork, EntityReference, WorkKind};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct MemoryState {
    documents: HashMap<EntityReference, Value>,
    commits: u64,
    refreshes: u64,
    fail_next: Option<String>,
}

/// Index engine holding documents in process memory.
#[derive(Debug, Default)]
pub struct MemoryIndexEngine {
    state: Mutex<MemoryState>,
}

impl MemoryIndexEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored document for a reference, if any.
    #[must_use]
    pub fn document(&self, reference: &EntityReference) -> Option<Value> {
        self.state.lock().unwrap().documents.get(reference).cloned()
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().documents.len()
    }

    /// True when no documents are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `execute` calls that forced a commit.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.state.lock().unwrap().commits
    }

    /// Number of `execute` calls that forced a refresh.
    #[must_use]
    pub fn refresh_count(&self) -> u64 {
        self.state.lock().unwrap().refreshes
    }

    /// Makes the next `execute` call fail with the given message.
    ///
    /// The failing batch is not applied; the failure carries every
    /// reference from the batch.
    pub fn fail_next_write(&self, message: impl Into<String>) {
        self.state.lock().unwrap().fail_next = Some(message.into());
    }
}

impl IndexEngine for MemoryIndexEngine {
    fn execute(
        &self,
        works: Vec<DocumentWork>,
        commit: CommitStrategy,
        refresh: RefreshStrategy,
    ) -> Result<(), IndexError> {
        let mut state = self.state.lock().unwrap();

        if let Some(message) = state.fail_next.take() {
            let failed: Vec<EntityReference> =
                works.into_iter().map(|work| work.reference).collect();
            return Err(IndexError::WriteFailed { message, failed });
        }

        for work in works {
            match work.kind {
                WorkKind::Add | WorkKind::AddOrUpdate => {
                    let document = work.document.unwrap_or(Value::Null);
                    state.documents.insert(work.reference, document);
                }
                WorkKind::Delete => {
                    // Absent documents delete successfully.
                    state.documents.remove(&work.reference);
                }
            }
        }

        if commit == CommitStrategy::Force {
            state.commits += 1;
        }
        if refresh == RefreshStrategy::Force {
            state.refreshes += 1;
        }
        Ok(())
    }
}
