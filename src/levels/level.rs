//! # Log severity.
//!
//! [`Level`] is totally ordered: a threshold admits every record whose level is
//! greater than or equal to it.
//!
//! # Example
//! ```rust
//! use fanlog::Level;
//!
//! let lvl: Level = "WARN".parse().unwrap();
//! assert_eq!(lvl, Level::Warn);
//! assert_eq!(lvl.to_string(), "warn");
//! assert!(Level::Error > Level::Warn);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::LogError;

/// Record severity, ordered from least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    /// Verbose diagnostics, usually disabled in production.
    Debug = 0,
    /// Routine operational messages.
    Info = 1,
    /// Something unexpected that the program recovered from.
    Warn = 2,
    /// A failure the caller should look at.
    Error = 3,
    /// Development-time invariant violation. Logged like `Error`.
    DPanic = 4,
    /// Logged, then the calling thread panics.
    Panic = 5,
    /// Logged, then the process exits with status 1.
    Fatal = 6,
}

impl Level {
    /// All levels in ascending order.
    pub const ALL: [Level; 7] = [
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::DPanic,
        Level::Panic,
        Level::Fatal,
    ];

    /// Lower-case name used in JSON output and the control surface.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::DPanic => "dpanic",
            Level::Panic => "panic",
            Level::Fatal => "fatal",
        }
    }

    /// Upper-case name used by the console encoders.
    pub fn as_capital_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::DPanic => "DPANIC",
            Level::Panic => "PANIC",
            Level::Fatal => "FATAL",
        }
    }

    /// True if a threshold of `self` lets a record of `record` through.
    #[inline]
    pub fn admits(&self, record: Level) -> bool {
        record >= *self
    }

    #[inline]
    pub(crate) fn to_u8(self) -> u8 {
        self as u8
    }

    /// Inverse of [`to_u8`](Self::to_u8). Out-of-range values saturate to `Fatal`.
    #[inline]
    pub(crate) fn from_u8(raw: u8) -> Level {
        Level::ALL
            .get(raw as usize)
            .copied()
            .unwrap_or(Level::Fatal)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = LogError;

    /// Case-insensitive parse of one of the seven level names.
    ///
    /// Empty text is rejected rather than read as `info`, so every accepted
    /// text round-trips through `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Level::ALL
            .iter()
            .copied()
            .find(|lvl| lvl.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| LogError::InvalidLevel {
                text: s.to_string(),
            })
    }
}

/// Parses level text; the returned level must be discarded on error.
///
/// Shorthand for `text.parse::<Level>()`.
pub fn level_from_string(text: &str) -> Result<Level, LogError> {
    text.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_normalizes_case() {
        for name in ["debug", "INFO", "Warn", "eRRor", "DPANIC", "panic", "Fatal"] {
            let lvl = level_from_string(name).unwrap();
            assert_eq!(lvl.to_string(), name.to_ascii_lowercase());
        }
    }

    #[test]
    fn test_unknown_and_empty_are_rejected() {
        for bad in ["", "verbose", "warning", "*"] {
            let err = level_from_string(bad).unwrap_err();
            assert_eq!(err.as_label(), "invalid_level");
        }
    }

    #[test]
    fn test_ordering_matches_severity() {
        let mut sorted = Level::ALL;
        sorted.sort();
        assert_eq!(sorted, Level::ALL);
        assert!(Level::Info.admits(Level::Error));
        assert!(Level::Info.admits(Level::Info));
        assert!(!Level::Error.admits(Level::Debug));
    }

    #[test]
    fn test_u8_conversion_is_lossless() {
        for lvl in Level::ALL {
            assert_eq!(Level::from_u8(lvl.to_u8()), lvl);
        }
        assert_eq!(Level::from_u8(200), Level::Fatal);
    }
}
