//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Message lifecycle
//! - The persistence layer saves a row and produces a `SavedMessage`
//! - The dispatcher delivers the `MessageEnvelope` to each `MessageProcessor`
//! - The row is marked read once no processor still holds a working row

mod config;
mod envelope;
mod error;
mod event;
mod ids;
mod message;
mod payload;
mod processor;
mod report;
mod settings;
mod store;

pub use config::*;
pub use envelope::*;
pub use error::*;
pub use event::*;
pub use ids::{CourseId, MessageId, ProcessorName, TransactionId, UserId};
pub use message::*;
pub use payload::*;
pub use processor::*;
pub use report::*;
pub use settings::*;
pub use store::*;
