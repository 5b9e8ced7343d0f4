//! CourierConfig - Config Loader output
//!
//! Site messaging switch and the processors available to the registry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierConfig {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Site-wide messaging settings
    #[serde(default)]
    pub messaging: MessagingSection,

    /// Processors registered at startup
    #[serde(default)]
    pub processors: Vec<ProcessorConfig>,
}

/// Site-wide messaging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingSection {
    /// Initial value of the "messaging enabled" switch
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for MessagingSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_enabled() -> bool {
    true
}

/// One delivery processor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Registry name, referenced by processor lists
    pub name: String,

    pub processor_type: ProcessorType,

    /// Disabled processors are not registered
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Built-in processor kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorType {
    /// Log a summary through tracing
    Log,
    /// Append JSON lines to a spool file
    File,
    /// In-memory per-recipient inbox
    Popup,
}

impl CourierConfig {
    /// Processors that will be registered
    pub fn enabled_processors(&self) -> impl Iterator<Item = &ProcessorConfig> {
        self.processors.iter().filter(|p| p.enabled)
    }
}
