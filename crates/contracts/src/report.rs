//! Dispatch reports - Dispatcher output
//!
//! Describes what happened to each submitted message so callers can log,
//! count and assert on it.

use serde::Serialize;

use crate::{MessageId, ProcessorName, TransactionId};

/// Result of one fan-out over a processor list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub message_id: MessageId,

    pub notification: bool,

    /// Processors invoked, in list order
    pub attempted: Vec<ProcessorName>,

    /// Processors that returned failure, raised an error or could not be resolved
    pub failed: Vec<ProcessorName>,

    /// Whether the "message sent" event was emitted
    pub event_emitted: bool,

    /// Whether the record was marked read during this dispatch
    pub marked_read: bool,
}

impl DispatchOutcome {
    pub fn delivered(&self) -> usize {
        self.attempted.len() - self.failed.len()
    }
}

/// Which path `submit` took
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Empty processor list: bookkeeping only
    Recorded {
        message_id: MessageId,
        event_emitted: bool,
        marked_read: bool,
    },
    /// Deferred until the transaction completes
    Buffered {
        message_id: MessageId,
        tx: TransactionId,
        /// Buffer length after appending
        depth: usize,
    },
    /// Sent synchronously
    Dispatched(DispatchOutcome),
}

impl SubmitOutcome {
    pub fn message_id(&self) -> MessageId {
        match self {
            Self::Recorded { message_id, .. } | Self::Buffered { message_id, .. } => *message_id,
            Self::Dispatched(outcome) => outcome.message_id,
        }
    }

    /// Short label for logs and metrics
    pub fn path(&self) -> &'static str {
        match self {
            Self::Recorded { .. } => "recorded",
            Self::Buffered { .. } => "buffered",
            Self::Dispatched(_) => "dispatched",
        }
    }
}

/// Result of replaying one transaction's buffer after commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub tx: TransactionId,

    /// One entry per buffered message, in submission order
    pub outcomes: Vec<DispatchOutcome>,
}

impl ReplayReport {
    pub fn empty(tx: TransactionId) -> Self {
        Self {
            tx,
            outcomes: Vec::new(),
        }
    }

    pub fn replayed(&self) -> usize {
        self.outcomes.len()
    }

    /// Total failed processor invocations across the replay
    pub fn failures(&self) -> usize {
        self.outcomes.iter().map(|o| o.failed.len()).sum()
    }
}
