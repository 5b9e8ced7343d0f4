//! ProcessorRegistry - name-keyed processor lookup

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

use contracts::{MessageProcessor, ProcessorConfig, ProcessorName, ProcessorType};

use crate::error::DispatcherError;
use crate::handle::ProcessorHandle;
use crate::metrics::MetricsSnapshot;
use crate::processors::{FileProcessor, LogProcessor, PopupInbox, PopupProcessor};

/// Registered processors, kept in registration order
#[derive(Debug, Default)]
pub struct ProcessorRegistry {
    handles: HashMap<ProcessorName, ProcessorHandle>,
    order: Vec<ProcessorName>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a processor under its own name
    pub fn register(
        &mut self,
        processor: impl MessageProcessor + 'static,
    ) -> Result<(), DispatcherError> {
        self.register_arc(Arc::new(processor))
    }

    /// Register a shared processor under its own name
    ///
    /// # Errors
    /// `DuplicateProcessor` if the name is taken.
    pub fn register_arc(
        &mut self,
        processor: Arc<dyn MessageProcessor>,
    ) -> Result<(), DispatcherError> {
        let handle = ProcessorHandle::new(processor);
        let name = handle.name().clone();
        if self.handles.contains_key(&name) {
            return Err(DispatcherError::DuplicateProcessor {
                name: name.to_string(),
            });
        }
        self.order.push(name.clone());
        self.handles.insert(name, handle);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ProcessorHandle> {
        self.handles.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handles.contains_key(name)
    }

    /// Names in registration order
    pub fn names(&self) -> impl Iterator<Item = &ProcessorName> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Get metrics for all processors
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.order
            .iter()
            .filter_map(|name| self.handles.get(name))
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Build a registry from configuration
    ///
    /// Disabled entries are skipped. Popup processors share `popup_inbox`.
    #[instrument(
        name = "registry_from_config",
        skip(configs, popup_inbox),
        fields(processor_count = configs.len())
    )]
    pub fn from_config(
        configs: &[ProcessorConfig],
        popup_inbox: Arc<PopupInbox>,
    ) -> Result<Self, DispatcherError> {
        let mut registry = Self::new();
        for config in configs.iter().filter(|c| c.enabled) {
            let processor = create_processor(config, &popup_inbox)?;
            registry.register_arc(processor)?;
        }
        info!(processors = registry.len(), "Processor registry ready");
        Ok(registry)
    }
}

/// Create a processor from configuration
#[instrument(
    name = "registry_create_processor",
    skip(config, popup_inbox),
    fields(processor = %config.name, processor_type = ?config.processor_type)
)]
fn create_processor(
    config: &ProcessorConfig,
    popup_inbox: &Arc<PopupInbox>,
) -> Result<Arc<dyn MessageProcessor>, DispatcherError> {
    match config.processor_type {
        ProcessorType::Log => Ok(Arc::new(LogProcessor::new(&config.name))),
        ProcessorType::File => {
            let processor = FileProcessor::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::processor_creation(&config.name, e.to_string()))?;
            Ok(Arc::new(processor))
        }
        ProcessorType::Popup => {
            let processor =
                PopupProcessor::from_params(&config.name, popup_inbox.clone(), &config.params)
                    .map_err(|e| DispatcherError::processor_creation(&config.name, e))?;
            Ok(Arc::new(processor))
        }
    }
}
