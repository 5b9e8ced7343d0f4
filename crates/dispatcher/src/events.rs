//! Event sinks for "message sent"

use std::sync::{Mutex, PoisonError};

use contracts::{EventSink, MessageSentEvent};
use tracing::info;

/// Logs every event through tracing
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn message_sent(&self, event: &MessageSentEvent) {
        info!(
            message_id = %event.message_id,
            from = %event.user_from,
            to = %event.user_to,
            course = ?event.course_id.map(|c| c.get()),
            "Message sent event"
        );
    }
}

/// Keeps events in memory, for tests and the CLI report
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<MessageSentEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MessageSentEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for RecordingEventSink {
    fn message_sent(&self, event: &MessageSentEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
