//! "Message sent" domain event

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CourseId, MessageId, UserId};

/// Fired once per direct message after its processors ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSentEvent {
    pub user_from: UserId,
    pub user_to: UserId,
    pub message_id: MessageId,
    pub course_id: Option<CourseId>,
    pub time: DateTime<Utc>,
}

/// Observability hook for message events
pub trait EventSink: Send + Sync {
    fn message_sent(&self, event: &MessageSentEvent);
}
