//! LogProcessor - logs payload summary via tracing

use contracts::{ContractError, MessageProcessor, ProcessorPayload};
use tracing::{info, instrument};

/// Processor that logs message summaries for debugging
pub struct LogProcessor {
    name: String,
}

impl LogProcessor {
    /// Create a new LogProcessor with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_payload_summary(&self, payload: &ProcessorPayload) {
        info!(
            processor = %self.name,
            message_id = %payload.saved_message_id,
            component = %payload.component,
            provider = %payload.name,
            from = %payload.user_from.id,
            to = %payload.user_to.id,
            notification = payload.notification,
            subject = %payload.subject,
            "Message delivered"
        );
    }
}

impl MessageProcessor for LogProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_processor_send",
        skip(self, payload),
        fields(processor = %self.name, message_id = %payload.saved_message_id)
    )]
    fn send_message(&self, payload: &ProcessorPayload) -> Result<bool, ContractError> {
        self.log_payload_summary(payload);
        Ok(true)
    }
}
