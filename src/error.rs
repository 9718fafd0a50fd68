//! Error types used by the logging facade and its sinks.
//!
//! This module defines two main error enums:
//!
//! - [`LogError`]: configuration and query mistakes, returned to the caller.
//! - [`SinkError`]: delivery failures of a single sink. These are **never**
//!   returned to the code that emitted a record; the sink is evicted and the
//!   failure is self-reported on the `mirror` subsystem.
//!
//! Both types provide `as_label` for logs and tests.

use thiserror::Error;

/// # Errors returned by the control and configuration surface.
///
/// Every variant is returned synchronously and leaves no state mutated.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LogError {
    /// Level text is not one of `debug`, `info`, `warn`, `error`, `dpanic`, `panic`, `fatal`.
    #[error("invalid log level {text:?}")]
    InvalidLevel {
        /// The rejected text.
        text: String,
    },

    /// Query or update on a subsystem that was never registered nor had a level set.
    #[error("no such logger: {name:?}")]
    NoSuchSubsystem {
        /// The unknown subsystem name.
        name: String,
    },

    /// Regular expression failed to compile.
    #[error("invalid subsystem pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Compiler diagnostic.
        #[source]
        source: regex::Error,
    },

    /// Output format text is not one of `color`, `nocolor`, `json`.
    #[error("invalid log format {text:?}")]
    InvalidFormat {
        /// The rejected text.
        text: String,
    },

    /// A global helper was called before [`init`](crate::init).
    #[error("logging is not initialized")]
    NotInitialized,

    /// Opening a configured destination failed.
    #[error("failed to open log destination: {0}")]
    Io(#[from] std::io::Error),
}

impl LogError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use fanlog::LogError;
    ///
    /// let err = LogError::InvalidLevel { text: "loud".into() };
    /// assert_eq!(err.as_label(), "invalid_level");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LogError::InvalidLevel { .. } => "invalid_level",
            LogError::NoSuchSubsystem { .. } => "no_such_subsystem",
            LogError::InvalidPattern { .. } => "invalid_pattern",
            LogError::InvalidFormat { .. } => "invalid_format",
            LogError::NotInitialized => "not_initialized",
            LogError::Io(_) => "io",
        }
    }
}

/// # Reasons a sink was declared dead.
///
/// Produced by the per-sink worker and carried to the broadcaster in a death
/// notification. A dead sink is removed and never retried.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SinkError {
    /// The underlying write returned an error.
    #[error("sink write failed: {error}")]
    WriteFailed {
        /// The I/O error reported by the sink.
        error: std::io::Error,
    },

    /// Queued bytes would exceed the per-sink buffer bound.
    #[error("sink buffer exceeded {limit} bytes")]
    Overflow {
        /// The configured bound in bytes.
        limit: usize,
    },

    /// The sink panicked while writing.
    #[error("sink panicked: {info}")]
    Panicked {
        /// Panic payload, when it was a string.
        info: String,
    },
}

impl SinkError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SinkError::WriteFailed { .. } => "sink_write_failed",
            SinkError::Overflow { .. } => "sink_overflow",
            SinkError::Panicked { .. } => "sink_panicked",
        }
    }
}
