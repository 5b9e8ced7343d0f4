//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration or scenario file not found
    #[error("File not found: {path}")]
    NotFound { path: String },

    /// A scenario step could not be executed
    #[error("Scenario step {step} failed: {message}")]
    Step { step: usize, message: String },

    /// Configuration or scenario document error
    #[error(transparent)]
    Contract(#[from] contracts::ContractError),

    /// Dispatcher setup or submission error
    #[error(transparent)]
    Dispatcher(#[from] dispatcher::DispatcherError),
}

impl CliError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn step(step: usize, message: impl Into<String>) -> Self {
        Self::Step {
            step,
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
