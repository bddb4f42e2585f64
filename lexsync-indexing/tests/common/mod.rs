//! Shared helpers for the indexing integration tests.

#![allow(dead_code)]

use lexsync_engine::{FailureHandler, IndexingFailure};
use lexsync_types::EntityReference;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Routes log output through the test writer so `--nocapture` shows the
/// deprecation warnings and flush logs. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn book(id: &str) -> EntityReference {
    EntityReference::new("book", id)
}

/// Captures reported failures for assertions.
#[derive(Default)]
pub struct RecordingFailureHandler {
    failures: Mutex<Vec<IndexingFailure>>,
}

impl RecordingFailureHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<IndexingFailure> {
        self.failures.lock().unwrap().clone()
    }
}

impl FailureHandler for RecordingFailureHandler {
    fn handle(&self, failure: IndexingFailure) {
        self.failures.lock().unwrap().push(failure);
    }
}
