//! Per-transaction buffer of deferred sends.
//!
//! Each open transaction owns one `PendingBuffer`. Messages are appended in
//! submission order and drained exactly once on commit, or dropped on rollback.

use std::fmt;

use contracts::{MessageEnvelope, ProcessorList, SavedMessage};

/// One deferred send
///
/// Owns its envelope snapshot outright; nothing outside the buffer can
/// reach it.
#[derive(Debug, Clone)]
pub struct PendingMessage {
    pub envelope: MessageEnvelope,
    pub saved: SavedMessage,
    pub processors: ProcessorList,
}

impl PendingMessage {
    /// Snapshot `envelope` for buffering: descriptive profile text is dropped
    pub fn snapshot(
        mut envelope: MessageEnvelope,
        saved: SavedMessage,
        processors: ProcessorList,
    ) -> Self {
        envelope.strip_descriptions();
        Self {
            envelope,
            saved,
            processors,
        }
    }
}

/// Ordered sends deferred by one transaction
#[derive(Default)]
pub struct PendingBuffer {
    messages: Vec<PendingMessage>,
}

impl fmt::Debug for PendingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingBuffer")
            .field("len", &self.messages.len())
            .finish()
    }
}

impl PendingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message; returns the new length
    pub fn push(&mut self, message: PendingMessage) -> usize {
        self.messages.push(message);
        self.messages.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl IntoIterator for PendingBuffer {
    type Item = PendingMessage;
    type IntoIter = std::vec::IntoIter<PendingMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}
