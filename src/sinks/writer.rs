//! Built-in sinks backed by `tokio::io::AsyncWrite`.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::Sink;

/// Sink writing every buffer to an [`AsyncWrite`] and flushing after each one.
pub struct WriterSink<W> {
    name: String,
    inner: W,
}

/// Process stderr or stdout.
pub type StdSink = WriterSink<Box<dyn AsyncWrite + Send + Unpin>>;

/// Append-only log file.
pub type FileSink = WriterSink<tokio::fs::File>;

impl<W> WriterSink<W>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    /// Wraps `inner` under the given diagnostic name.
    pub fn new(name: impl Into<String>, inner: W) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }

    /// Unwraps the writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl StdSink {
    /// Sink for the process's standard error.
    pub fn stderr() -> Self {
        let out: Box<dyn AsyncWrite + Send + Unpin> = Box::new(tokio::io::stderr());
        WriterSink::new("stderr", out)
    }

    /// Sink for the process's standard output.
    pub fn stdout() -> Self {
        let out: Box<dyn AsyncWrite + Send + Unpin> = Box::new(tokio::io::stdout());
        WriterSink::new("stdout", out)
    }
}

impl FileSink {
    /// Opens `path` for appending, creating it if needed.
    ///
    /// The file is opened synchronously so configuration errors surface at setup.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(WriterSink::new(
            path.display().to_string(),
            tokio::fs::File::from_std(file),
        ))
    }
}

#[async_trait]
impl<W> Sink for WriterSink<W>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    async fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner.write_all(buf).await?;
        self.inner.flush().await
    }

    async fn close(&mut self) -> io::Result<()> {
        self.inner.shutdown().await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
