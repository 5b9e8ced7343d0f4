//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
///
/// Only input and setup problems surface as errors; delivery failures are
/// diagnostics.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Processor creation error
    #[error("failed to create processor '{name}': {message}")]
    ProcessorCreation { name: String, message: String },

    /// Two processors registered under one name
    #[error("processor '{name}' is already registered")]
    DuplicateProcessor { name: String },

    /// Processor list names a processor the registry does not know
    #[error("unknown processor '{name}'")]
    UnknownProcessor { name: String },

    /// Malformed envelope, saved record or processor list
    #[error("invalid input: {0}")]
    InvalidInput(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a processor creation error
    pub fn processor_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProcessorCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Whether the caller passed bad input (as opposed to a setup problem)
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::UnknownProcessor { .. } | Self::InvalidInput(_))
    }
}
