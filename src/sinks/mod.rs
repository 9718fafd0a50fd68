//! # Sink trait: byte destinations fed by the mirror writer.
//!
//! Provides [`Sink`], the extension point for plugging custom outputs into the
//! fan-out, plus [`SinkOptions`] (per-sink format and minimum level) and the
//! built-in [`WriterSink`] for stderr, stdout, files and any `AsyncWrite`.
//!
//! Each attached sink gets:
//! - **Dedicated worker task** (owns the sink, runs independently)
//! - **Bounded pending queue** (limit in bytes, see [`MirrorWriter::new`](crate::MirrorWriter::new))
//! - **Single in-flight write** (the next buffer is dispatched only after the previous completed)
//!
//! ## Architecture
//! ```text
//! MirrorWriter ──► broadcaster ──► [queue] ──► worker ──► sink.write(&bytes)
//!                                                      └─► Err / overflow → sink dead, evicted
//! ```
//!
//! ## Rules
//! - A slow sink only affects its own queue.
//! - A sink whose queue would exceed the byte bound is evicted; others are unaffected.
//! - A write error evicts the sink; the error is logged on the `mirror` subsystem,
//!   never returned to the code that emitted the record.
//! - Buffers are delivered in ingestion order (FIFO per sink).
//!
//! ## Example
//! ```rust
//! use std::io;
//! use async_trait::async_trait;
//! use fanlog::Sink;
//!
//! struct Counter(usize);
//!
//! #[async_trait]
//! impl Sink for Counter {
//!     async fn write(&mut self, buf: &[u8]) -> io::Result<()> {
//!         self.0 += buf.len();
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &str { "counter" }
//! }
//! ```

mod writer;

pub use writer::{FileSink, StdSink, WriterSink};

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::encoding::Format;
use crate::levels::Level;

/// Byte destination attached to the [`MirrorWriter`](crate::MirrorWriter).
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Return errors instead of panicking; an error evicts the sink. A panic in
///   `write` is caught and evicts the sink too.
/// - A write that never completes is tolerated: the sink is evicted once its
///   queue exceeds the byte bound.
#[async_trait]
pub trait Sink: Send + 'static {
    /// Writes one complete encoded buffer.
    ///
    /// Called from the sink's worker task, one call at a time, in ingestion order.
    async fn write(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Flushes and releases the destination.
    ///
    /// Called once, when the sink is removed or evicted while idle.
    async fn close(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Returns the sink name used in diagnostics.
    ///
    /// The default uses `type_name::<Self>()`; override it when possible.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Per-sink encoding and filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkOptions {
    /// Encoding of records written to this sink.
    pub format: Format,
    /// Records below this level are not delivered to this sink.
    pub level: Level,
}

impl SinkOptions {
    /// Options with the given format and level.
    pub fn new(format: Format, level: Level) -> Self {
        Self { format, level }
    }

    /// Sets the format.
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Sets the minimum level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

impl Default for SinkOptions {
    /// Colorized output, every level.
    fn default() -> Self {
        Self {
            format: Format::default(),
            level: Level::Debug,
        }
    }
}

/// Global counter for sink identifiers.
static SINK_SEQ: AtomicU64 = AtomicU64::new(1);

/// Handle identifying one attached sink; used to remove it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

impl SinkId {
    pub(crate) fn next() -> Self {
        SinkId(SINK_SEQ.fetch_add(1, Ordering::Relaxed))
    }
}
