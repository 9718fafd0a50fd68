//! # Tracing bridge: routes `tracing` events into fanlog loggers.
//!
//! [`TracingBridge`] is a [`tracing_subscriber::Layer`]. Each event is sent to
//! the logger named after the event's target, so per-subsystem levels apply to
//! code instrumented with `tracing` as well.
//!
//! ## Mapping
//! - `TRACE`, `DEBUG` → `Debug`; `INFO` → `Info`; `WARN` → `Warn`; `ERROR` → `Error`
//! - the `message` field becomes the record message
//! - other fields become structured fields (strings, integers, floats and bools
//!   keep their type; everything else is `Debug`-formatted)
//!
//! Spans are ignored.
//!
//! # Example
//! ```rust,no_run
//! use fanlog::{Config, Logging, TracingBridge};
//! use tracing_subscriber::prelude::*;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), fanlog::LogError> {
//!     let logging = Logging::new(Config::default())?;
//!     let subscriber = tracing_subscriber::registry().with(TracingBridge::new(&logging));
//!     tracing::subscriber::set_global_default(subscriber).expect("subscriber already set");
//!
//!     tracing::error!(target: "net", peer = "10.0.0.1", "connection reset");
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::field::{Field as TracingField, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::levels::Level;
use crate::logging::Logging;
use crate::record::Field;
use crate::registry::Registry;

/// Layer forwarding `tracing` events to the loggers of one [`Logging`].
pub struct TracingBridge {
    registry: Arc<Registry>,
}

impl TracingBridge {
    /// Bridge into the loggers of `logging`.
    pub fn new(logging: &Logging) -> Self {
        Self {
            registry: logging.shared_registry(),
        }
    }
}

fn map_level(level: &tracing::Level) -> Level {
    if *level == tracing::Level::ERROR {
        Level::Error
    } else if *level == tracing::Level::WARN {
        Level::Warn
    } else if *level == tracing::Level::INFO {
        Level::Info
    } else {
        Level::Debug
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Vec<Field>,
}

impl FieldVisitor {
    fn push(&mut self, field: &TracingField, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &TracingField, value: &str) {
        self.push(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &TracingField, value: bool) {
        self.push(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &TracingField, value: i64) {
        self.push(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &TracingField, value: u64) {
        self.push(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &TracingField, value: f64) {
        self.push(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &TracingField, value: &dyn fmt::Debug) {
        self.push(field, Value::from(format!("{value:?}")));
    }
}

impl<S> Layer<S> for TracingBridge
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let level = map_level(meta.level());
        let logger = self.registry.logger(meta.target());
        if !logger.enabled(level) {
            return;
        }
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        logger.emit_forwarded(level, visitor.message.unwrap_or_default(), visitor.fields);
    }
}
