//! MessageProcessor trait - delivery channel interface

use crate::{ContractError, ProcessorPayload};

/// Pluggable delivery channel (popup, email spool, ...)
///
/// Implementations are shared behind `Arc` by the registry, so sending takes
/// `&self`; processors needing mutable state guard it themselves.
pub trait MessageProcessor: Send + Sync {
    /// Registry name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one payload
    ///
    /// `Ok(false)` signals a delivery failure for this processor only.
    ///
    /// # Errors
    /// Returns an error when the processor itself breaks; callers treat it
    /// the same as `Ok(false)`.
    fn send_message(&self, payload: &ProcessorPayload) -> Result<bool, ContractError>;
}
