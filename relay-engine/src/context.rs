//! Per-stage log capture
//!
//! Every stage gets its own buffer. The scheduler drains it into the stage
//! record once the stage reaches a terminal status.

use relay_core::domain::log::{LogEntry, LogLevel};
use std::sync::{Mutex, PoisonError};

/// Log buffer shared with a running stage
#[derive(Debug, Default)]
pub struct StageLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl StageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, entry: LogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    pub fn log_debug(&self, message: impl Into<String>) {
        self.add(LogEntry::new(LogLevel::Debug, message));
    }

    pub fn log_info(&self, message: impl Into<String>) {
        self.add(LogEntry::new(LogLevel::Info, message));
    }

    pub fn log_warning(&self, message: impl Into<String>) {
        self.add(LogEntry::new(LogLevel::Warning, message));
    }

    pub fn log_error(&self, message: impl Into<String>) {
        self.add(LogEntry::new(LogLevel::Error, message));
    }

    /// Returns all buffered entries and clears the buffer
    pub fn drain(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }
}
