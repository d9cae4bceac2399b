//! Logger seam handed to jobs.
//!
//! Jobs write human-readable progress through [`JobLogger`]; the runner decides
//! whether that text is captured into the run's output, forwarded to
//! `tracing`, or both. [`NullLogger`] is always a valid choice.

use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use crate::job::JobType;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl core::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(s)
    }
}

pub trait JobLogger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// Discards everything.
#[derive(Debug, Default, Copy, Clone)]
pub struct NullLogger;

impl JobLogger for NullLogger {
    fn log(&self, _level: LogLevel, _message: &str) {}
}

/// Forwards job log lines to `tracing`, tagged with the run they belong to.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    job_type: JobType,
    run_id: Uuid,
}

impl TracingLogger {
    pub fn new(job_type: JobType, run_id: Uuid) -> Self {
        Self { job_type, run_id }
    }
}

impl JobLogger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => {
                tracing::info!(job_type = %self.job_type, run_id = %self.run_id, "{message}")
            }
            LogLevel::Warn => {
                tracing::warn!(job_type = %self.job_type, run_id = %self.run_id, "{message}")
            }
            LogLevel::Error => {
                tracing::error!(job_type = %self.job_type, run_id = %self.run_id, "{message}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
}

impl core::fmt::Display for LogLine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// Buffers log lines for the run's output, optionally forwarding each line.
#[derive(Default)]
pub struct CapturingLogger {
    lines: Mutex<Vec<LogLine>>,
    forward: Option<Arc<dyn JobLogger>>,
}

impl CapturingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forwarding(to: Arc<dyn JobLogger>) -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
            forward: Some(to),
        }
    }

    pub fn lines(&self) -> Vec<LogLine> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Captured lines, one per line of text.
    pub fn render(&self) -> String {
        self.lines()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl core::fmt::Debug for CapturingLogger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CapturingLogger")
            .field("lines", &self.lines())
            .field("forwarding", &self.forward.is_some())
            .finish()
    }
}

impl JobLogger for CapturingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogLine {
                level,
                message: message.to_string(),
            });
        if let Some(forward) = &self.forward {
            forward.log(level, message);
        }
    }
}
