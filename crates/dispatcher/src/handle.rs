//! ProcessorHandle - a registered processor with its metrics

use std::sync::Arc;
use tracing::{error, instrument, trace, warn};

use contracts::{MessageProcessor, ProcessorName, ProcessorPayload};

use crate::metrics::ProcessorMetrics;

/// Handle to a registered processor
#[derive(Clone)]
pub struct ProcessorHandle {
    /// Registry name
    name: ProcessorName,
    processor: Arc<dyn MessageProcessor>,
    /// Shared metrics
    metrics: Arc<ProcessorMetrics>,
}

impl ProcessorHandle {
    pub fn new(processor: Arc<dyn MessageProcessor>) -> Self {
        Self {
            name: ProcessorName::from(processor.name()),
            processor,
            metrics: Arc::new(ProcessorMetrics::new()),
        }
    }

    /// Get processor name
    pub fn name(&self) -> &ProcessorName {
        &self.name
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<ProcessorMetrics> {
        &self.metrics
    }

    /// Deliver one payload
    ///
    /// Returns true if delivered. Failures are logged and counted, never
    /// propagated.
    #[instrument(
        name = "processor_send",
        skip(self, payload),
        fields(processor = %self.name, message_id = %payload.saved_message_id)
    )]
    pub fn send(&self, payload: &ProcessorPayload) -> bool {
        match self.processor.send_message(payload) {
            Ok(true) => {
                self.metrics.inc_sent_count();
                trace!(processor = %self.name, "Delivered");
                true
            }
            Ok(false) => {
                self.metrics.inc_failure_count();
                warn!(
                    processor = %self.name,
                    message_id = %payload.saved_message_id,
                    "Error calling message processor"
                );
                false
            }
            Err(e) => {
                self.metrics.inc_failure_count();
                error!(
                    processor = %self.name,
                    message_id = %payload.saved_message_id,
                    error = %e,
                    "Message processor raised an error"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for ProcessorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorHandle")
            .field("name", &self.name)
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}
