//! Layered error definitions
//!
//! Categorized by source: config / envelope / processor / store

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Input Errors =====
    /// Malformed envelope, saved record or processor list
    #[error("invalid message input at '{field}': {message}")]
    InvalidInput { field: String, message: String },

    // ===== Processor Errors =====
    /// Processor raised an error while sending
    #[error("processor '{processor}' send error: {message}")]
    ProcessorSend { processor: String, message: String },

    /// Processor name not present in the registry
    #[error("unknown processor: {name}")]
    UnknownProcessor { name: String },

    // ===== Persistence Errors =====
    /// Persistence layer failure
    #[error("store error: {message}")]
    Store { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid input error
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create processor send error
    pub fn processor_send(processor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProcessorSend {
            processor: processor.into(),
            message: message.into(),
        }
    }

    /// Create store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}
