//! MessageEnvelope - the logical message handed to the dispatcher
//!
//! The envelope is independent of its persisted row. Processors never see it
//! directly; they receive a [`ProcessorPayload`] built per processor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{ContractError, CourseId, MessageId, ProcessorPayload, UserId};

/// Key in [`AdditionalContent`] that applies to every processor
pub const ALL_PROCESSORS: &str = "*";

/// Sender or recipient of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub full_name: String,

    #[serde(default)]
    pub email: String,

    /// Free-form profile text; dropped before a message is buffered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl UserIdentity {
    pub fn new(id: impl Into<UserId>, username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            id: id.into(),
            full_name: username.clone(),
            username,
            email: String::new(),
            description: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Format of `full_message`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFormat {
    #[default]
    Plain,
    Markdown,
    Html,
}

/// Text placed around one message field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderFooter {
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub footer: String,
}

impl HeaderFooter {
    fn wrap(&self, body: &str) -> String {
        let mut out = String::with_capacity(self.header.len() + body.len() + self.footer.len());
        out.push_str(&self.header);
        out.push_str(body);
        out.push_str(&self.footer);
        out
    }
}

/// Per-processor decoration of the message text fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentDecoration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_message: Option<HeaderFooter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_message_html: Option<HeaderFooter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub small_message: Option<HeaderFooter>,
}

/// Processor-keyed content decorations
///
/// A processor-specific entry takes precedence over the [`ALL_PROCESSORS`]
/// entry; the two are never combined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdditionalContent(BTreeMap<String, ContentDecoration>);

impl AdditionalContent {
    pub fn insert(&mut self, processor: impl Into<String>, decoration: ContentDecoration) {
        self.0.insert(processor.into(), decoration);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decoration that applies to `processor`, if any
    pub fn for_processor(&self, processor: &str) -> Option<&ContentDecoration> {
        self.0
            .get(processor)
            .or_else(|| self.0.get(ALL_PROCESSORS))
    }
}

/// The logical message being delivered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// Component that defines the message provider (e.g. "mod_forum")
    pub component: String,

    /// Message provider name within the component
    pub name: String,

    pub user_from: UserIdentity,

    pub user_to: UserIdentity,

    #[serde(default)]
    pub course_id: Option<CourseId>,

    #[serde(default)]
    pub subject: String,

    #[serde(default)]
    pub full_message: String,

    #[serde(default)]
    pub full_message_format: MessageFormat,

    #[serde(default)]
    pub full_message_html: String,

    #[serde(default)]
    pub small_message: String,

    /// Notifications use different read-marking defaults than direct messages
    #[serde(default)]
    pub notification: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_url_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "AdditionalContent::is_empty")]
    pub additional_content: AdditionalContent,

    #[serde(default = "Utc::now")]
    pub time_created: DateTime<Utc>,
}

impl MessageEnvelope {
    /// Create a direct message with empty text fields
    pub fn new(
        component: impl Into<String>,
        name: impl Into<String>,
        user_from: UserIdentity,
        user_to: UserIdentity,
    ) -> Self {
        Self {
            component: component.into(),
            name: name.into(),
            user_from,
            user_to,
            course_id: None,
            subject: String::new(),
            full_message: String::new(),
            full_message_format: MessageFormat::default(),
            full_message_html: String::new(),
            small_message: String::new(),
            notification: false,
            context_url: None,
            context_url_name: None,
            custom_data: None,
            additional_content: AdditionalContent::default(),
            time_created: Utc::now(),
        }
    }

    pub fn as_notification(mut self) -> Self {
        self.notification = true;
        self
    }

    pub fn with_course(mut self, course_id: impl Into<CourseId>) -> Self {
        self.course_id = Some(course_id.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_full_message(mut self, text: impl Into<String>, format: MessageFormat) -> Self {
        self.full_message = text.into();
        self.full_message_format = format;
        self
    }

    pub fn with_small_message(mut self, text: impl Into<String>) -> Self {
        self.small_message = text.into();
        self
    }

    pub fn with_additional_content(
        mut self,
        processor: impl Into<String>,
        decoration: ContentDecoration,
    ) -> Self {
        self.additional_content.insert(processor, decoration);
        self
    }

    /// Check the fields the dispatcher relies on
    ///
    /// # Errors
    /// Returns `InvalidInput` naming the first offending field.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.component.trim().is_empty() {
            return Err(ContractError::invalid_input(
                "envelope.component",
                "component cannot be empty",
            ));
        }
        if self.name.trim().is_empty() {
            return Err(ContractError::invalid_input(
                "envelope.name",
                "message provider name cannot be empty",
            ));
        }
        if self.user_to.id.get() <= 0 {
            return Err(ContractError::invalid_input(
                "envelope.user_to.id",
                format!("recipient must be a real user, got id {}", self.user_to.id),
            ));
        }
        Ok(())
    }

    /// Drop descriptive profile text from both identities
    pub fn strip_descriptions(&mut self) {
        self.user_from.description = None;
        self.user_to.description = None;
    }

    /// Processor-specific view of this envelope
    pub fn payload_for(&self, processor: &str, saved_message_id: MessageId) -> ProcessorPayload {
        let decoration = self.additional_content.for_processor(processor);

        ProcessorPayload {
            processor: processor.to_string(),
            saved_message_id,
            component: self.component.clone(),
            name: self.name.clone(),
            user_from: self.user_from.clone(),
            user_to: self.user_to.clone(),
            course_id: self.course_id,
            subject: self.subject.clone(),
            full_message: decorate(
                &self.full_message,
                decoration.and_then(|d| d.full_message.as_ref()),
            ),
            full_message_format: self.full_message_format,
            full_message_html: decorate(
                &self.full_message_html,
                decoration.and_then(|d| d.full_message_html.as_ref()),
            ),
            small_message: decorate(
                &self.small_message,
                decoration.and_then(|d| d.small_message.as_ref()),
            ),
            notification: self.notification,
            context_url: self.context_url.clone(),
            context_url_name: self.context_url_name.clone(),
            custom_data: self.custom_data.clone(),
            time_created: self.time_created,
        }
    }
}

fn decorate(body: &str, decoration: Option<&HeaderFooter>) -> String {
    match decoration {
        Some(hf) => hf.wrap(body),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MessageEnvelope {
        MessageEnvelope::new(
            "mod_forum",
            "posts",
            UserIdentity::new(2, "teacher").with_description("long bio"),
            UserIdentity::new(3, "student").with_description("another bio"),
        )
        .with_full_message("Body", MessageFormat::Plain)
        .with_small_message("Short")
    }

    #[test]
    fn test_validate_ok() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_component() {
        let mut env = sample();
        env.component = "  ".into();
        let err = env.validate().unwrap_err().to_string();
        assert!(err.contains("envelope.component"), "got: {err}");
    }

    #[test]
    fn test_validate_rejects_system_recipient() {
        let mut env = sample();
        env.user_to.id = UserId(-10);
        let err = env.validate().unwrap_err().to_string();
        assert!(err.contains("recipient"), "got: {err}");
    }

    #[test]
    fn test_strip_descriptions() {
        let mut env = sample();
        env.strip_descriptions();
        assert!(env.user_from.description.is_none());
        assert!(env.user_to.description.is_none());
    }

    #[test]
    fn test_payload_without_decoration() {
        let payload = sample().payload_for("popup", MessageId(9));
        assert_eq!(payload.processor, "popup");
        assert_eq!(payload.saved_message_id, MessageId(9));
        assert_eq!(payload.full_message, "Body");
        assert_eq!(payload.user_to.description.as_deref(), Some("another bio"));
    }

    #[test]
    fn test_processor_specific_decoration_wins_over_wildcard() {
        let env = sample()
            .with_additional_content(
                ALL_PROCESSORS,
                ContentDecoration {
                    full_message: Some(HeaderFooter {
                        header: "[all] ".into(),
                        footer: String::new(),
                    }),
                    ..Default::default()
                },
            )
            .with_additional_content(
                "email",
                ContentDecoration {
                    full_message: Some(HeaderFooter {
                        header: "Hi, ".into(),
                        footer: " -- unsubscribe".into(),
                    }),
                    ..Default::default()
                },
            );

        assert_eq!(
            env.payload_for("email", MessageId(1)).full_message,
            "Hi, Body -- unsubscribe"
        );
        assert_eq!(env.payload_for("popup", MessageId(1)).full_message, "[all] Body");
        // small_message has no decoration in either entry
        assert_eq!(env.payload_for("email", MessageId(1)).small_message, "Short");
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{
            "component": "moodle",
            "name": "instantmessage",
            "user_from": { "id": 2 },
            "user_to": { "id": 3, "username": "student" }
        }"#;
        let env: MessageEnvelope = serde_json::from_str(json).unwrap();
        assert!(!env.notification);
        assert_eq!(env.full_message_format, MessageFormat::Plain);
        assert!(env.additional_content.is_empty());
    }
}
