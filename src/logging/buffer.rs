//! This module provides a bounded buffer of the most recent log entries.
//!
//! The `HistoryBuffer` is what a newly connected observer is replayed from. It
//! stores entries unredacted; redaction happens when they are serialized.
use super::LogEntry;
use std::collections::VecDeque;
use std::sync::Arc;

/// Default number of entries kept.
pub const DEFAULT_HISTORY_SIZE: usize = 500;

/// A fixed-capacity FIFO of log entries.
///
/// The buffer is not synchronized itself; its owner decides which lock guards
/// it so that appends can be ordered with other work under the same guard.
#[derive(Debug)]
pub struct HistoryBuffer {
    /// The circular buffer of log entries.
    entries: VecDeque<Arc<LogEntry>>,
    /// The maximum number of entries to store in the buffer.
    max_size: usize,
}

impl HistoryBuffer {
    /// Creates a new `HistoryBuffer`.
    ///
    /// # Arguments
    ///
    /// * `max_size` - The maximum number of entries to store. Zero is treated as one.
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            entries: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Adds an entry, evicting the oldest one when the buffer is full.
    pub fn append(&mut self, entry: Arc<LogEntry>) {
        if self.entries.len() >= self.max_size {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Returns the stored entries, oldest first.
    pub fn snapshot(&self) -> Vec<Arc<LogEntry>> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}
