//! Leveled, component-tagged logging for engine internals.
//!
//! Deliberately small: the engine sits below whatever logging fabric the
//! embedding application uses, so it writes plain structured lines to
//! stderr and stays out of the way unless a verbose level is configured.

use std::time::{SystemTime, UNIX_EPOCH};

/// Log level for engine diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Trace-level logging (very verbose)
    Trace = 0,
    /// Debug-level logging
    Debug = 1,
    /// Info-level logging
    Info = 2,
    /// Warning-level logging
    Warn = 3,
    /// Error-level logging
    Error = 4,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Minimal logger bound to one engine component.
#[derive(Debug, Clone)]
pub struct Logger {
    component: &'static str,
    level: LogLevel,
}

impl Logger {
    /// Create a logger for `component` that emits entries at `level` and above.
    pub fn new(component: &'static str, level: LogLevel) -> Self {
        Self { component, level }
    }

    /// Whether a message at `level` would be emitted.
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level
    }

    /// Emit one line at the given level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if !self.enabled(level) {
            return;
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();

        eprintln!("[{timestamp}] {level} {} {message}", self.component);
    }

    /// Emit a debug-level line.
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Emit a warn-level line.
    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }
}
