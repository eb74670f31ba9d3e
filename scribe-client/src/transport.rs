//! Delivery of encoded lines.
//!
//! A transport receives a category name and one encoded line. Delivery is
//! fire-and-forget: there are no acknowledgements, retries or backpressure.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::info;

/// Sink for encoded lines.
pub trait Transport: Send + Sync {
    fn send(&self, category: &str, line: &str);
}

/// Emits each line as an `info` event on the `scribe` target and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl Transport for LogTransport {
    fn send(&self, category: &str, line: &str) {
        info!(target: "scribe", %category, "{line}");
    }
}

/// One captured delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub category: String,
    pub line: String,
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<SentMessage>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything sent so far, oldest first.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.lock().clone()
    }

    /// Drain the captured messages.
    pub fn take(&self) -> Vec<SentMessage> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SentMessage>> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for MemoryTransport {
    fn send(&self, category: &str, line: &str) {
        self.lock().push(SentMessage {
            category: category.to_string(),
            line: line.to_string(),
        });
    }
}
