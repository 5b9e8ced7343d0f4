//! # Dispatcher
//!
//! 消息分发模块。
//!
//! 负责：
//! - 校验提交的消息与处理器列表
//! - 事务进行中时按事务缓存待发送消息，提交后重放、回滚后丢弃
//! - Fan-out 到多个 processors，单个 processor 失败不影响其它

mod buffer;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod handle;
pub mod metrics;
pub mod processors;
pub mod registry;
pub mod settings;

pub use buffer::{PendingBuffer, PendingMessage};
pub use contracts::{MessageProcessor, ProcessorPayload};
pub use dispatcher::{BufferingDispatcher, DispatcherBuilder, create_dispatcher};
pub use error::DispatcherError;
pub use events::{RecordingEventSink, TracingEventSink};
pub use handle::ProcessorHandle;
pub use metrics::{DispatchSnapshot, MetricsSnapshot, ProcessorMetrics};
pub use processors::{
    FileProcessor, FileProcessorConfig, LogProcessor, PopupEntry, PopupInbox, PopupProcessor,
};
pub use registry::ProcessorRegistry;
pub use settings::RuntimeSettings;
