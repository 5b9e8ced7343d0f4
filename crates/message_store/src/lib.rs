//! # Message Store
//!
//! In-memory persistence layer for messages and notifications.
//!
//! Responsible for:
//! - Saving message rows before dispatch
//! - Working rows (processors that have not acknowledged a message)
//! - Read state, which is terminal once set
//! - Transaction lifecycle with commit/rollback callbacks

mod error;
mod memory;

pub use error::{Result, StoreError};
pub use memory::{MemoryStore, StoredMessage, WorkingRow};
