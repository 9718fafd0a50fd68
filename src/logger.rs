//! # Logger: leveled emit calls bound to one subsystem.
//!
//! A [`Logger`] is a cheap handle (one `Arc`) to:
//! - the subsystem's [`LevelCell`], shared with the registry and every other
//!   logger of the same name,
//! - the shared output (mirror writer + process-wide labels),
//! - the fields added through [`Logger::with`].
//!
//! ## Emit path
//! ```text
//! info(msg) ─► level cell admits? ─► mirror active? ─► Record{labels, fields, caller} ─► MirrorWriter
//!                   │ no                  │ no
//!                   └──────── return ◄────┘
//! ```
//! Emitting never waits on a sink and never fails.
//!
//! ## Terminal levels
//! - [`Logger::dpanic`] logs at `DPanic` and returns.
//! - [`Logger::panic`] logs at `Panic`, then panics with the message.
//! - [`Logger::fatal`] logs at `Fatal`, waits briefly for sinks, then exits the process with status 1.

use std::panic::Location;
use std::sync::{mpsc, Arc, OnceLock};
use std::time::Duration;

use serde_json::Value;

use crate::levels::{Level, LevelCell};
use crate::mirror::MirrorWriter;
use crate::record::{Field, Record};

/// How long [`Logger::fatal`] waits for sinks before exiting.
const FATAL_FLUSH: Duration = Duration::from_secs(1);

/// Destination shared by every logger of one [`Logging`](crate::Logging).
pub(crate) struct Output {
    mirror: MirrorWriter,
    labels: OnceLock<Vec<Field>>,
}

impl Output {
    /// Labels are latched immediately when `labels` is not empty.
    pub(crate) fn new(mirror: MirrorWriter, labels: Vec<Field>) -> Self {
        let latch = OnceLock::new();
        if !labels.is_empty() {
            let _ = latch.set(labels);
        }
        Self {
            mirror,
            labels: latch,
        }
    }

    pub(crate) fn mirror(&self) -> &MirrorWriter {
        &self.mirror
    }

    /// Sets the process-wide labels once; later calls return `false`.
    pub(crate) fn set_labels(&self, labels: Vec<Field>) -> bool {
        self.labels.set(labels).is_ok()
    }

    pub(crate) fn labels(&self) -> &[Field] {
        self.labels.get().map(Vec::as_slice).unwrap_or_default()
    }
}

struct Inner {
    name: Arc<str>,
    level: Arc<LevelCell>,
    output: Arc<Output>,
    fields: Vec<Field>,
}

/// Handle emitting records for one subsystem.
///
/// Clones share everything; [`with`](Self::with) derives a child carrying one
/// more field and the same level cell.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

impl Logger {
    pub(crate) fn new(name: Arc<str>, level: Arc<LevelCell>, output: Arc<Output>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                level,
                output,
                fields: Vec::new(),
            }),
        }
    }

    /// Subsystem name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current threshold of the subsystem.
    pub fn level(&self) -> Level {
        self.inner.level.get()
    }

    /// True if a record at `level` would be built and sent.
    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        self.inner.level.enabled(level) && self.inner.output.mirror().is_active()
    }

    #[cfg(test)]
    pub(crate) fn shares_cell(&self, cell: &Arc<LevelCell>) -> bool {
        Arc::ptr_eq(&self.inner.level, cell)
    }

    /// Returns a child logger that adds `key = value` to every record.
    pub fn with(&self, key: impl Into<String>, value: impl Into<Value>) -> Logger {
        let mut fields = self.inner.fields.clone();
        fields.push((key.into(), value.into()));
        Logger {
            inner: Arc::new(Inner {
                name: Arc::clone(&self.inner.name),
                level: Arc::clone(&self.inner.level),
                output: Arc::clone(&self.inner.output),
                fields,
            }),
        }
    }

    /// Logs at `Debug`.
    #[track_caller]
    pub fn debug(&self, msg: impl Into<String>) {
        self.emit(Level::Debug, msg, Vec::new(), Some(Location::caller()));
    }

    #[track_caller]
    pub fn info(&self, msg: impl Into<String>) {
        self.emit(Level::Info, msg, Vec::new(), Some(Location::caller()));
    }

    #[track_caller]
    pub fn warn(&self, msg: impl Into<String>) {
        self.emit(Level::Warn, msg, Vec::new(), Some(Location::caller()));
    }

    #[track_caller]
    pub fn error(&self, msg: impl Into<String>) {
        self.emit(Level::Error, msg, Vec::new(), Some(Location::caller()));
    }

    /// Logs at `DPanic`. Never panics.
    #[track_caller]
    pub fn dpanic(&self, msg: impl Into<String>) {
        self.emit(Level::DPanic, msg, Vec::new(), Some(Location::caller()));
    }

    /// Logs at `Panic`, then panics with `msg`.
    #[track_caller]
    pub fn panic(&self, msg: impl Into<String>) -> ! {
        let msg = msg.into();
        self.emit(Level::Panic, msg.clone(), Vec::new(), Some(Location::caller()));
        panic!("{msg}");
    }

    /// Logs at `Fatal`, gives sinks up to one second to drain, then exits with status 1.
    #[track_caller]
    pub fn fatal(&self, msg: impl Into<String>) -> ! {
        self.emit(Level::Fatal, msg, Vec::new(), Some(Location::caller()));
        self.flush_blocking(FATAL_FLUSH);
        std::process::exit(1);
    }

    /// Logs `msg` at `level`.
    ///
    /// `Panic` and `Fatal` are logged like any other level here; use
    /// [`panic`](Self::panic) or [`fatal`](Self::fatal) for their side effects.
    #[track_caller]
    pub fn log(&self, level: Level, msg: impl Into<String>) {
        self.emit(level, msg, Vec::new(), Some(Location::caller()));
    }

    /// Logs `msg` at `level` with extra structured fields.
    ///
    /// # Example
    /// ```no_run
    /// # async fn demo(log: fanlog::Logger) {
    /// use fanlog::Level;
    ///
    /// log.log_with(Level::Info, "dialed", [("peer", "10.0.0.1"), ("proto", "tcp")]);
    /// # }
    /// ```
    #[track_caller]
    pub fn log_with<I, K, V>(&self, level: Level, msg: impl Into<String>, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let caller = Location::caller();
        if !self.enabled(level) {
            return;
        }
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.emit(level, msg, fields, Some(caller));
    }

    /// Emits a record that has no Rust call site, e.g. one forwarded from another facade.
    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    pub(crate) fn emit_forwarded(&self, level: Level, msg: String, fields: Vec<Field>) {
        self.emit(level, msg, fields, None);
    }

    fn emit(
        &self,
        level: Level,
        msg: impl Into<String>,
        call_fields: Vec<Field>,
        caller: Option<&'static Location<'static>>,
    ) {
        if !self.enabled(level) {
            return;
        }
        let inner = &self.inner;
        let mut record = Record::new(level, Arc::clone(&inner.name), msg);
        if let Some(caller) = caller {
            record = record.with_caller(caller);
        }
        let record = record
            .with_fields(inner.output.labels().iter().cloned())
            .with_fields(inner.fields.iter().cloned())
            .with_fields(call_fields);
        inner.output.mirror().write_record(record);
    }

    /// Waits up to `limit` for the mirror to flush, without needing an async context.
    fn flush_blocking(&self, limit: Duration) {
        let mirror = self.inner.output.mirror().clone();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            futures::executor::block_on(mirror.sync());
            let _ = tx.send(());
        });
        let _ = rx.recv_timeout(limit);
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.inner.name)
            .field("level", &self.inner.level.get())
            .finish()
    }
}
