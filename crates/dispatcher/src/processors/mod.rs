//! Built-in message processors
//!
//! Contains LogProcessor, FileProcessor, and PopupProcessor.

mod file;
mod log;
mod popup;

pub use self::file::{FileProcessor, FileProcessorConfig};
pub use self::log::LogProcessor;
pub use self::popup::{PopupEntry, PopupInbox, PopupProcessor};
