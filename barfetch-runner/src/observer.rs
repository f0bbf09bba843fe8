//! Run observation: the status/log sink the orchestrator reports through.
//!
//! The run loop depends only on this trait, never on a global logger or
//! event object; the worker bridges it onto channels and the CLI prints.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        })
    }
}

/// Sink for a run's progress and status stream.
///
/// Implementations must tolerate being called from the worker thread; the
/// orchestrator emits every per-task event before the run's terminal result
/// is surfaced.
pub trait RunObserver: Send {
    /// Overall progress in integer percent, non-decreasing within a run.
    fn on_progress(&self, percent: u8);

    /// One status line. Every failure produces at least one of these.
    fn on_log(&self, level: LogLevel, message: &str);
}
