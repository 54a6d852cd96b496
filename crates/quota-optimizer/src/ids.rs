//! Synthetic id generation for batches and specs

use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

/// Source of ids for generated records (`batch_…`, `spec_…`).
///
/// Inject [`SequentialIds`] where output must be reproducible.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self, prefix: &str) -> String;
}

/// Random v4 UUID suffixes
#[derive(Debug, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, Uuid::new_v4().simple())
    }
}

/// Per-generator counter: `batch_1`, `spec_2`, ...
#[derive(Debug, Default)]
pub struct SequentialIds {
    counter: AtomicUsize,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}_{}", prefix, n)
    }
}
