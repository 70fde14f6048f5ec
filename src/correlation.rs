//! Correlation-id generation.
//!
//! A response is matched to its request by echoing the request's correlation
//! id; the ids only need to be unique among in-flight calls of one process,
//! so a plain wrapping counter is enough. Not persisted, never reset.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide issuer of request correlation ids.
#[derive(Debug, Default)]
pub struct CorrelationIds {
    next: AtomicU64,
}

impl CorrelationIds {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next id. The first id issued is 0; ids are strictly
    /// increasing until the counter wraps.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
