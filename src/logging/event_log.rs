//! The process-wide event log.
//!
//! `EventLog` is the single authority that accepts or drops writes, appends
//! accepted lines to the durable log file and publishes the resulting
//! [`LogEntry`] to subscribers. It is built once at start-up and shared as an
//! `Arc<EventLog>`.
use super::entry::{LogEntry, LogLevel};
use super::parser::parse;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::{Mutex, RwLock};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, warn};

/// Settings fixed for the lifetime of an [`EventLog`].
#[derive(Debug, Clone)]
pub struct EventLogConfig {
    /// The file every accepted entry is appended to.
    pub file_path: PathBuf,
    /// Writes below this level are dropped.
    pub min_level: LogLevel,
    /// Whether accepted entries are also printed to stderr.
    pub mirror_stderr: bool,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            file_path: std::env::temp_dir().join("redmine-mcp.log"),
            min_level: LogLevel::Info,
            mirror_stderr: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("failed to append to log file {path}: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Receives every entry accepted by the [`EventLog`].
///
/// Notifications run synchronously on the writer's thread while the log's
/// write lock is held, so implementations must be quick and must not write to
/// the same log.
pub trait LogSubscriber: Send + Sync {
    fn on_entry(&self, entry: &Arc<LogEntry>) -> anyhow::Result<()>;
}

impl<F> LogSubscriber for F
where
    F: Fn(&Arc<LogEntry>) -> anyhow::Result<()> + Send + Sync,
{
    fn on_entry(&self, entry: &Arc<LogEntry>) -> anyhow::Result<()> {
        self(entry)
    }
}

/// Opaque handle returned by [`EventLog::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct WriterState {
    file: Option<File>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl WriterState {
    /// Returns the current time, never earlier than the previous call.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let now = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(now);
        now
    }

    fn append(&mut self, path: &Path, line: &str) -> io::Result<()> {
        if self.file.is_none() {
            self.file = Some(OpenOptions::new().create(true).append(true).open(path)?);
        }

        let result = match self.file.as_mut() {
            Some(file) => file.write_all(format!("{line}\n").as_bytes()),
            None => Ok(()),
        };

        if result.is_err() {
            // Re-open on the next write in case the file was moved or the disk recovered.
            self.file = None;
        }
        result
    }
}

/// The process-wide log of accepted entries.
pub struct EventLog {
    config: EventLogConfig,
    writer: Mutex<WriterState>,
    subscribers: RwLock<Vec<(SubscriptionId, Arc<dyn LogSubscriber>)>>,
    next_subscription: AtomicU64,
    write_failures: AtomicU64,
}

impl EventLog {
    /// Creates a new `EventLog`.
    ///
    /// The log file is opened lazily on the first accepted write.
    pub fn new(config: EventLogConfig) -> Self {
        Self {
            config,
            writer: Mutex::new(WriterState {
                file: None,
                last_timestamp: None,
            }),
            subscribers: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            write_failures: AtomicU64::new(0),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.config.file_path
    }

    pub fn min_level(&self) -> LogLevel {
        self.config.min_level
    }

    /// Number of entries whose durable append has failed so far.
    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    /// Records `message` at `level`.
    ///
    /// Never fails and never blocks on observers; see [`EventLog::try_write`]
    /// for a variant that reports durable-write failures.
    pub fn write(&self, level: LogLevel, message: impl Into<String>) {
        let _ = self.try_write(level, message);
    }

    /// Records `message` at `level` and reports what happened.
    ///
    /// Returns `Ok(None)` when the level is below the configured minimum and
    /// `Ok(Some(entry))` once the entry is on disk and published.
    ///
    /// # Errors
    ///
    /// Returns [`EventLogError::Append`] when the log file could not be
    /// written. The entry has still been mirrored to stderr and published to
    /// subscribers in that case; only the durable line is missing.
    pub fn try_write(
        &self,
        level: LogLevel,
        message: impl Into<String>,
    ) -> Result<Option<Arc<LogEntry>>, EventLogError> {
        if level < self.config.min_level {
            return Ok(None);
        }
        let message = message.into();

        // One lock for the whole write keeps file order, timestamp order and
        // publish order identical.
        let mut writer = self.writer.lock();

        let timestamp = writer
            .next_timestamp()
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let raw = format!("[{}] [{}] {}", timestamp, level.tag(), message);

        let appended = writer
            .append(&self.config.file_path, &raw)
            .map_err(|source| EventLogError::Append {
                path: self.config.file_path.clone(),
                source,
            });

        if self.config.mirror_stderr {
            eprintln!("[{}] {}", level.tag(), message);
        }
        if let Err(e) = &appended {
            self.write_failures.fetch_add(1, Ordering::Relaxed);
            error!("[LOGCAST] {}", e);
        }

        let entry = Arc::new(parse(timestamp, level, message, raw));
        self.publish(&entry);
        drop(writer);

        appended.map(|()| Some(entry))
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.write(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.write(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.write(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.write(LogLevel::Error, message);
    }

    /// Registers a subscriber for every entry accepted from now on.
    pub fn subscribe(&self, subscriber: Arc<dyn LogSubscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, subscriber));
        id
    }

    /// Removes a subscriber. Returns `false` if the handle was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Notifies every subscriber in subscription order.
    ///
    /// Iterates over a copy of the registry so subscribers may (un)subscribe
    /// while being notified. A failing or panicking subscriber is reported and
    /// skipped.
    fn publish(&self, entry: &Arc<LogEntry>) {
        let subscribers: Vec<(SubscriptionId, Arc<dyn LogSubscriber>)> =
            self.subscribers.read().clone();

        for (id, subscriber) in subscribers {
            match panic::catch_unwind(AssertUnwindSafe(|| subscriber.on_entry(entry))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("[LOGCAST] subscriber {:?} failed: {:#}", id, e),
                Err(_) => warn!("[LOGCAST] subscriber {:?} panicked", id),
            }
        }
    }
}
