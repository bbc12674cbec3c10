//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts how often a traced value is created, cloned and dropped.
#[derive(Debug, Default)]
pub struct TraceCounts {
    created: AtomicUsize,
    cloned: AtomicUsize,
    dropped: AtomicUsize,
}

impl TraceCounts {
    pub fn cloned(&self) -> usize {
        self.cloned.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Instances currently alive.
    pub fn live(&self) -> usize {
        self.created.load(Ordering::SeqCst) + self.cloned() - self.dropped()
    }
}

/// A value that records its own lifecycle in a shared [`TraceCounts`].
#[derive(Debug)]
pub struct Tracer {
    pub name: String,
    counts: Arc<TraceCounts>,
}

impl Tracer {
    pub fn new(name: impl Into<String>) -> (Self, Arc<TraceCounts>) {
        let counts = Arc::new(TraceCounts::default());
        (Self::with_counts(name, counts.clone()), counts)
    }

    pub fn with_counts(name: impl Into<String>, counts: Arc<TraceCounts>) -> Self {
        counts.created.fetch_add(1, Ordering::SeqCst);
        Self {
            name: name.into(),
            counts,
        }
    }
}

impl Clone for Tracer {
    fn clone(&self) -> Self {
        self.counts.cloned.fetch_add(1, Ordering::SeqCst);
        Self {
            name: format!("{}_cc", self.name),
            counts: self.counts.clone(),
        }
    }
}

impl Drop for Tracer {
    fn drop(&mut self) {
        self.counts.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

/// Installs a debug-level fmt subscriber; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
