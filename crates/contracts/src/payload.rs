//! ProcessorPayload - processor input
//!
//! One logical message yields one payload per processor, with additional
//! content resolved for that processor. Identities are copied as they stand
//! on the envelope; buffered sends carry them without descriptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CourseId, MessageFormat, MessageId, UserIdentity};

/// Processor-specific view of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorPayload {
    /// Processor this payload was built for
    pub processor: String,

    /// Row id of the saved message
    pub saved_message_id: MessageId,

    pub component: String,
    pub name: String,
    pub user_from: UserIdentity,
    pub user_to: UserIdentity,
    pub course_id: Option<CourseId>,
    pub subject: String,
    pub full_message: String,
    pub full_message_format: MessageFormat,
    pub full_message_html: String,
    pub small_message: String,
    pub notification: bool,
    pub context_url: Option<String>,
    pub context_url_name: Option<String>,
    pub custom_data: Option<serde_json::Value>,
    pub time_created: DateTime<Utc>,
}
