//! This module defines the structure for a single log entry and its severity.
use super::redact::redact_str;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The severity of a log entry, ordered `Debug < Info < Warn < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the lower-case name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Returns the upper-case tag padded to five characters, as written to the log file.
    pub fn tag(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO ",
            LogLevel::Warn => "WARN ",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name one of the four log levels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid log level '{0}' (expected one of: debug, info, warn, error)")]
pub struct ParseLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Represents a single accepted log write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 timestamp with millisecond precision, taken at write time.
    pub timestamp: String,
    /// The severity of the entry.
    pub level: LogLevel,
    /// The message as passed to the log.
    pub message: String,
    /// The operation that produced the entry, when the message names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Elapsed time of a finished operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// The line exactly as appended to the log file, without the newline.
    pub raw: String,
}

impl LogEntry {
    /// Returns a copy that is safe to send outside the process.
    ///
    /// `message` and `raw` have secret-shaped substrings replaced; the other
    /// fields are copied as they are.
    pub fn redacted(&self) -> LogEntry {
        LogEntry {
            timestamp: self.timestamp.clone(),
            level: self.level,
            message: redact_str(&self.message).into_owned(),
            tool: self.tool.clone(),
            duration_ms: self.duration_ms,
            raw: redact_str(&self.raw).into_owned(),
        }
    }
}
