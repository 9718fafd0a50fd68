//! # Record encoders.
//!
//! Turns a [`Record`] into one newline-terminated line of bytes.
//!
//! ## Formats
//! ```text
//! Plaintext: 2010-05-23T15:14:00.000Z  INFO  main  src/app.rs:7  scooby  {"dc": "sjc-1"}
//! Colorized: same, level wrapped in ANSI color
//! Json:      {"level":"info","ts":"2010-05-23T15:14:00.000Z","logger":"main","caller":"src/app.rs:7","msg":"scooby","dc":"sjc-1"}
//! ```
//! Console columns are tab separated. The caller column is omitted when the
//! record has no location; the field column is omitted when there are no fields.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::error::LogError;
use crate::levels::Level;
use crate::record::Record;

const RESET: &str = "\x1b[0m";

/// Output encoding of a sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Format {
    /// Tab separated console line with a colored level.
    #[default]
    Colorized,
    /// Tab separated console line without escape codes.
    Plaintext,
    /// One JSON object per line.
    Json,
}

impl Format {
    /// Number of variants; used to size per-record encoding caches.
    pub(crate) const COUNT: usize = 3;

    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            Format::Colorized => 0,
            Format::Plaintext => 1,
            Format::Json => 2,
        }
    }

    /// Encodes `record` into a single output line.
    pub fn encode(self, record: &Record) -> Arc<[u8]> {
        match self {
            Format::Colorized => console_line(record, true).into_bytes().into(),
            Format::Plaintext => console_line(record, false).into_bytes().into(),
            Format::Json => json_line(record).into(),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Colorized => "color",
            Format::Plaintext => "nocolor",
            Format::Json => "json",
        })
    }
}

impl FromStr for Format {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "color" | "colorized" => Ok(Format::Colorized),
            "nocolor" | "plaintext" | "plain" => Ok(Format::Plaintext),
            "json" => Ok(Format::Json),
            _ => Err(LogError::InvalidFormat {
                text: s.to_string(),
            }),
        }
    }
}

fn timestamp(record: &Record) -> String {
    record.time.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn caller(record: &Record) -> Option<String> {
    record
        .caller
        .map(|loc| format!("{}:{}", loc.file(), loc.line()))
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::Debug => "\x1b[35m",
        Level::Info => "\x1b[34m",
        Level::Warn => "\x1b[33m",
        Level::Error | Level::DPanic | Level::Panic | Level::Fatal => "\x1b[31m",
    }
}

fn console_line(record: &Record, colored: bool) -> String {
    let mut line = String::with_capacity(64 + record.message.len());
    line.push_str(&timestamp(record));
    line.push('\t');
    if colored {
        line.push_str(level_color(record.level));
        line.push_str(record.level.as_capital_str());
        line.push_str(RESET);
    } else {
        line.push_str(record.level.as_capital_str());
    }
    line.push('\t');
    line.push_str(&record.subsystem);
    if let Some(caller) = caller(record) {
        line.push('\t');
        line.push_str(&caller);
    }
    line.push('\t');
    line.push_str(&record.message);
    if !record.fields.is_empty() {
        line.push('\t');
        line.push('{');
        for (i, (key, value)) in record.fields.iter().enumerate() {
            if i > 0 {
                line.push_str(", ");
            }
            line.push_str(&Value::from(key.as_str()).to_string());
            line.push_str(": ");
            line.push_str(&value.to_string());
        }
        line.push('}');
    }
    line.push('\n');
    line
}

/// Serializes with a fixed key order; a derived impl cannot flatten the field list.
struct JsonLine<'a>(&'a Record);

impl Serialize for JsonLine<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let record = self.0;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("level", record.level.as_str())?;
        map.serialize_entry("ts", &timestamp(record))?;
        map.serialize_entry("logger", &*record.subsystem)?;
        if let Some(caller) = caller(record) {
            map.serialize_entry("caller", &caller)?;
        }
        map.serialize_entry("msg", &record.message)?;
        for (key, value) in &record.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

fn json_line(record: &Record) -> Vec<u8> {
    let mut out = serde_json::to_vec(&JsonLine(record)).unwrap_or_else(|err| {
        format!(
            r#"{{"level":"error","logger":"mirror","msg":"failed to encode record: {}"}}"#,
            err
        )
        .into_bytes()
    });
    out.push(b'\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn scooby() -> Record {
        Record::new(Level::Info, "main", "scooby")
            .with_time(Utc.with_ymd_and_hms(2010, 5, 23, 15, 14, 0).unwrap())
    }

    #[test]
    fn test_console_formats() {
        let rec = scooby();
        assert_eq!(
            &*Format::Plaintext.encode(&rec),
            b"2010-05-23T15:14:00.000Z\tINFO\tmain\tscooby\n".as_slice()
        );
        assert_eq!(
            &*Format::Colorized.encode(&rec),
            b"2010-05-23T15:14:00.000Z\t\x1b[34mINFO\x1b[0m\tmain\tscooby\n".as_slice()
        );
    }

    #[test]
    fn test_json_format_key_order() {
        let rec = scooby();
        assert_eq!(
            String::from_utf8(Format::Json.encode(&rec).to_vec()).unwrap(),
            "{\"level\":\"info\",\"ts\":\"2010-05-23T15:14:00.000Z\",\"logger\":\"main\",\"msg\":\"scooby\"}\n"
        );
    }

    #[test]
    fn test_fields_are_rendered_in_order() {
        let rec = scooby().with_field("dc", "sjc-1").with_field("n", 42);
        let plain = String::from_utf8(Format::Plaintext.encode(&rec).to_vec()).unwrap();
        assert!(plain.ends_with("scooby\t{\"dc\": \"sjc-1\", \"n\": 42}\n"));

        let json: Value = serde_json::from_slice(&Format::Json.encode(&rec)).unwrap();
        assert_eq!(json["dc"], "sjc-1");
        assert_eq!(json["n"], 42);
    }

    #[test]
    fn test_caller_column() {
        let rec = scooby().with_caller(std::panic::Location::caller());
        let plain = String::from_utf8(Format::Plaintext.encode(&rec).to_vec()).unwrap();
        assert!(plain.contains("\tsrc/encoding.rs:"));

        let json: Value = serde_json::from_slice(&Format::Json.encode(&rec)).unwrap();
        assert!(json["caller"].as_str().unwrap().starts_with("src/encoding.rs:"));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("nocolor".parse::<Format>().unwrap(), Format::Plaintext);
        assert_eq!("color".parse::<Format>().unwrap(), Format::Colorized);
        assert_eq!(
            "xml".parse::<Format>().unwrap_err().as_label(),
            "invalid_format"
        );
    }
}
