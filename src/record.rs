//! # Log record: the unit that flows from a [`Logger`](crate::Logger) into the mirror writer.
//!
//! A record is built once per emit call, wrapped in an `Arc`, and shared by every
//! sink. Encoding into bytes happens in the broadcaster, at most once per format.

use std::panic::Location;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::levels::Level;

/// One structured key/value pair.
pub type Field = (String, Value);

/// A single log event.
#[derive(Clone, Debug)]
pub struct Record {
    /// Wall-clock time of the emit call (UTC).
    pub time: DateTime<Utc>,
    /// Severity of the record.
    pub level: Level,
    /// Subsystem (logger name) that produced the record.
    pub subsystem: Arc<str>,
    /// Source location of the emit call, if known.
    pub caller: Option<&'static Location<'static>>,
    /// Human-readable message.
    pub message: String,
    /// Structured fields in insertion order: labels, logger fields, call fields.
    pub fields: Vec<Field>,
}

impl Record {
    /// Creates a record stamped with the current time and no fields.
    pub fn new(level: Level, subsystem: impl Into<Arc<str>>, message: impl Into<String>) -> Self {
        Self {
            time: Utc::now(),
            level,
            subsystem: subsystem.into(),
            caller: None,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Sets the source location.
    pub fn with_caller(mut self, caller: &'static Location<'static>) -> Self {
        self.caller = Some(caller);
        self
    }

    /// Overrides the timestamp.
    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    /// Appends one structured field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Appends several structured fields.
    pub fn with_fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = Field>,
    {
        self.fields.extend(fields);
        self
    }
}
