//! Logging utilities for the Fabrik IK solver.

use tracing::Level;

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Trace level - most verbose, includes per-pass solve distances.
    Trace,
    /// Debug level - per-iteration summaries.
    Debug,
    /// Info level - default; solve start/success/stall events.
    Info,
    /// Warning level - recoverable constraint clamps.
    Warn,
    /// Error level - least verbose.
    Error,
}

impl LogLevel {
    /// Convert to a [`tracing::Level`].
    #[must_use]
    pub const fn to_tracing_level(self) -> Level {
        match self {
            Self::Trace => Level::TRACE,
            Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }
}
