//! # Pipe reader: live log output as an in-process byte stream.
//!
//! A [`PipeReader`] attaches a sink to the [`MirrorWriter`] whose bytes land in
//! an in-memory duplex pipe, and exposes the other end as [`AsyncRead`]. Tests
//! and embedding code use it to observe what loggers emit.
//!
//! ```text
//! MirrorWriter ──► worker ──► PipeSink ──► [duplex buffer] ──► PipeReader::poll_read
//!                                 ▲                                  │
//!                                 └──── remove_sink(id) ◄── close() ─┘
//! ```
//!
//! ## Rules
//! - `close()` is idempotent and also runs on drop.
//! - Records ingested before `close()` are still delivered, then the stream ends.
//! - A reader that stops reading fills the pipe, then its queue, and is evicted
//!   like any other slow sink; the stream then ends.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWriteExt, DuplexStream, ReadBuf};

use crate::encoding::Format;
use crate::levels::Level;
use crate::mirror::MirrorWriter;
use crate::sinks::{Sink, SinkId, SinkOptions};

/// Bytes held by the in-memory pipe before the sink's writes start to wait.
const PIPE_CAPACITY: usize = 64 * 1024;

/// Encoding and minimum level of a [`PipeReader`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipeOptions {
    /// Encoding of the records read from the pipe.
    pub format: Format,
    /// Records below this level are not written to the pipe.
    pub level: Level,
}

impl PipeOptions {
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

impl Default for PipeOptions {
    /// JSON, every level.
    fn default() -> Self {
        Self {
            format: Format::Json,
            level: Level::Debug,
        }
    }
}

impl From<PipeOptions> for SinkOptions {
    fn from(opts: PipeOptions) -> Self {
        SinkOptions::new(opts.format, opts.level)
    }
}

/// Write end of a pipe, attached to the mirror writer.
struct PipeSink {
    inner: DuplexStream,
}

#[async_trait]
impl Sink for PipeSink {
    async fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner.write_all(buf).await
    }

    async fn close(&mut self) -> io::Result<()> {
        self.inner.shutdown().await
    }

    fn name(&self) -> &str {
        "pipe"
    }
}

/// Readable stream of the records emitted while it is open.
pub struct PipeReader {
    inner: DuplexStream,
    mirror: MirrorWriter,
    id: SinkId,
    closed: AtomicBool,
}

impl PipeReader {
    /// Attaches a new pipe to `mirror`.
    pub fn new(mirror: &MirrorWriter, options: PipeOptions) -> Self {
        let (write_end, read_end) = tokio::io::duplex(PIPE_CAPACITY);
        let id = mirror.add_sink(PipeSink { inner: write_end }, options.into());
        Self {
            inner: read_end,
            mirror: mirror.clone(),
            id,
            closed: AtomicBool::new(false),
        }
    }

    /// Detaches the pipe. Buffered and already ingested output stays readable
    /// up to end of stream. Calling it again does nothing.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.mirror.remove_sink(self.id);
        }
    }

    /// Identifier of the underlying sink.
    pub fn sink_id(&self) -> SinkId {
        self.id
    }
}

impl AsyncRead for PipeReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        self.close();
    }
}
