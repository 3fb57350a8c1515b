//! This module contains the logging infrastructure for the application.
//!
//! It includes the process-wide [`EventLog`], the bounded [`HistoryBuffer`]
//! used to replay recent entries, the entry parser and the redactor applied to
//! anything that leaves the process.
pub mod buffer;
pub mod entry;
pub mod event_log;
pub mod parser;
pub mod redact;
pub mod tool_call;

pub use buffer::{HistoryBuffer, DEFAULT_HISTORY_SIZE};
pub use entry::{LogEntry, LogLevel};
pub use event_log::{EventLog, EventLogConfig, LogSubscriber, SubscriptionId};
pub use tool_call::traced;
