use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use super::broadcaster::{Broadcaster, Command};
use super::LevelProbe;
use crate::record::Record;
use crate::sinks::{Sink, SinkId, SinkOptions};

/// Cloneable handle to the fan-out writer.
///
/// All clones feed the same broadcaster task. Every method is safe to call
/// concurrently from any thread; none of them waits on a sink.
#[derive(Clone)]
pub struct MirrorWriter {
    commands: mpsc::UnboundedSender<Command>,
    active: Arc<AtomicUsize>,
}

impl MirrorWriter {
    /// Default per-sink bound on queued bytes (512 KiB).
    pub const DEFAULT_MAX_BUFFER: usize = 512 * 1024;

    /// Creates a writer and spawns its broadcaster task.
    ///
    /// `max_buffer` bounds the bytes queued behind a sink's in-flight write;
    /// a sink that would exceed it is evicted. The minimum is 1 (clamped).
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(max_buffer: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let active = Arc::new(AtomicUsize::new(0));
        let broadcaster = Broadcaster::new(rx, Arc::clone(&active), max_buffer.max(1));
        tokio::spawn(broadcaster.run());
        Self {
            commands: tx,
            active,
        }
    }

    /// Attaches a sink. Every record ingested after this call returns is
    /// offered to it, filtered by `options.level` and encoded as `options.format`.
    pub fn add_sink<S: Sink>(&self, sink: S, options: SinkOptions) -> SinkId {
        self.add_boxed_sink(Box::new(sink), options)
    }

    /// Same as [`add_sink`](Self::add_sink) for an already boxed sink.
    pub fn add_boxed_sink(&self, sink: Box<dyn Sink>, options: SinkOptions) -> SinkId {
        let id = SinkId::next();
        self.active.fetch_add(1, Ordering::AcqRel);
        if self
            .commands
            .send(Command::Add { id, sink, options })
            .is_err()
        {
            self.active.fetch_sub(1, Ordering::AcqRel);
        }
        id
    }

    /// Detaches a sink. Data ingested before this call is still delivered,
    /// then the sink is closed. Unknown or already dead ids are ignored.
    ///
    /// The byte bound no longer applies to a removed sink: if its write never
    /// completes, its worker stays parked until [`shutdown`](Self::shutdown)
    /// aborts it after the grace period.
    pub fn remove_sink(&self, id: SinkId) {
        let _ = self.commands.send(Command::Remove(id));
    }

    /// True iff at least one sink is attached.
    ///
    /// Callers use it to skip building records nobody would receive.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) > 0
    }

    /// Number of attached sinks.
    pub fn active_sinks(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Ingests a record for encoding and fan-out.
    pub fn write_record(&self, record: Record) {
        self.write_shared(Arc::new(record));
    }

    /// Ingests an already shared record.
    pub fn write_shared(&self, record: Arc<Record>) {
        let _ = self.commands.send(Command::Record(record));
    }

    /// Ingests raw bytes, delivered verbatim to every sink regardless of its
    /// format and level.
    pub fn write(&self, buf: &[u8]) {
        let _ = self.commands.send(Command::Raw(Arc::from(buf)));
    }

    /// Resolves once every sink attached at call time has written everything
    /// ingested before the call. Sinks that die meanwhile count as done.
    pub async fn sync(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Sync(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Stops the broadcaster: every sink drains its queue and is closed.
    /// Workers still busy after `grace` are aborted.
    ///
    /// Writes after shutdown are silently dropped.
    pub async fn shutdown(&self, grace: Duration) {
        let (tx, rx) = oneshot::channel();
        if self
            .commands
            .send(Command::Shutdown { grace, done: tx })
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    pub(crate) fn set_probe(&self, probe: Box<dyn LevelProbe>) {
        let _ = self.commands.send(Command::Probe(probe));
    }
}

impl io::Write for MirrorWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        MirrorWriter::write(self, buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::Format;
    use crate::levels::Level;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::future::Future;

    const WAIT: Duration = Duration::from_secs(5);

    /// Collects everything written to it.
    #[derive(Clone, Default)]
    struct Memory {
        buf: Arc<Mutex<Vec<u8>>>,
        closed: Arc<Mutex<bool>>,
    }

    impl Memory {
        fn text(&self) -> String {
            String::from_utf8(self.buf.lock().clone()).unwrap()
        }
    }

    #[async_trait]
    impl Sink for Memory {
        async fn write(&mut self, buf: &[u8]) -> io::Result<()> {
            self.buf.lock().extend_from_slice(buf);
            Ok(())
        }

        async fn close(&mut self) -> io::Result<()> {
            *self.closed.lock() = true;
            Ok(())
        }

        fn name(&self) -> &str {
            "memory"
        }
    }

    /// Accepts `allow` writes, then stalls forever.
    struct Stall {
        inner: Memory,
        allow: usize,
    }

    #[async_trait]
    impl Sink for Stall {
        async fn write(&mut self, buf: &[u8]) -> io::Result<()> {
            if self.allow == 0 {
                std::future::pending::<()>().await;
            }
            self.allow -= 1;
            self.inner.write(buf).await
        }

        fn name(&self) -> &str {
            "stall"
        }
    }

    /// Fails every write.
    struct Broken;

    #[async_trait]
    impl Sink for Broken {
        async fn write(&mut self, _buf: &[u8]) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    /// Panics on every write.
    struct Panicky;

    #[async_trait]
    impl Sink for Panicky {
        async fn write(&mut self, _buf: &[u8]) -> io::Result<()> {
            panic!("sink exploded");
        }

        fn name(&self) -> &str {
            "panicky"
        }
    }

    /// Stalls forever; `alive` is dropped with the sink.
    struct Held {
        _alive: oneshot::Sender<()>,
    }

    #[async_trait]
    impl Sink for Held {
        async fn write(&mut self, _buf: &[u8]) -> io::Result<()> {
            std::future::pending().await
        }

        fn name(&self) -> &str {
            "held"
        }
    }

    fn plain() -> SinkOptions {
        SinkOptions::new(Format::Plaintext, Level::Debug)
    }

    async fn bounded<F: Future>(fut: F) -> F::Output {
        tokio::time::timeout(WAIT, fut).await.expect("timed out")
    }

    async fn eventually(mut cond: impl FnMut() -> bool) {
        bounded(async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
    }

    #[tokio::test]
    async fn test_fan_out_to_all_sinks() {
        let mw = MirrorWriter::new(MirrorWriter::DEFAULT_MAX_BUFFER);
        let a = Memory::default();
        let b = Memory::default();
        mw.add_sink(a.clone(), plain());
        mw.add_sink(b.clone(), plain());
        assert!(mw.is_active());

        mw.write(b"x");
        bounded(mw.sync()).await;

        assert_eq!(a.text(), "x");
        assert_eq!(b.text(), "x");
    }

    #[tokio::test]
    async fn test_stalled_sink_does_not_block_others() {
        let mw = MirrorWriter::new(MirrorWriter::DEFAULT_MAX_BUFFER);
        let a = Memory::default();
        let b = Memory::default();
        mw.add_sink(a.clone(), plain());
        mw.add_sink(
            Stall {
                inner: b.clone(),
                allow: 1,
            },
            plain(),
        );

        mw.write(b"x");
        eventually(|| b.text() == "x").await;

        mw.write(b"y");
        mw.write(b"z");
        eventually(|| a.text() == "xyz").await;
        assert_eq!(b.text(), "x");
    }

    #[tokio::test]
    async fn test_overflow_evicts_only_the_slow_sink() {
        let mw = MirrorWriter::new(1024);
        let healthy = Memory::default();
        let stuck = Memory::default();
        mw.add_sink(healthy.clone(), plain());
        mw.add_sink(
            Stall {
                inner: stuck.clone(),
                allow: 0,
            },
            plain(),
        );

        let chunk = [b'#'; 256];
        for _ in 0..8 {
            mw.write(&chunk);
        }
        bounded(mw.sync()).await;
        let delivered = healthy.buf.lock().iter().filter(|b| **b == b'#').count();
        assert_eq!(delivered, 2048);

        mw.write(b"after");
        bounded(mw.sync()).await;
        assert!(healthy.text().contains("after"));
        assert!(stuck.text().is_empty());
        assert_eq!(mw.active_sinks(), 1);
    }

    #[tokio::test]
    async fn test_overflow_is_reported_on_mirror_subsystem() {
        let mw = MirrorWriter::new(16);
        let watcher = Memory::default();
        mw.add_sink(watcher.clone(), plain());
        mw.add_sink(
            Stall {
                inner: Memory::default(),
                allow: 0,
            },
            plain(),
        );

        for _ in 0..4 {
            mw.write(b"0123456789");
        }
        eventually(|| watcher.text().contains("sink evicted")).await;
        let text = watcher.text();
        assert!(text.contains("\tWARN\tmirror\t"));
        assert!(text.contains("\"sink\": \"stall\""));
        assert!(text.contains("sink_overflow"));
    }

    #[tokio::test]
    async fn test_write_error_evicts_sink() {
        let mw = MirrorWriter::new(MirrorWriter::DEFAULT_MAX_BUFFER);
        mw.add_sink(Broken, plain());
        assert!(mw.is_active());

        mw.write(b"boom");
        eventually(|| !mw.is_active()).await;
    }

    #[tokio::test]
    async fn test_panicking_sink_is_evicted_and_reported() {
        let mw = MirrorWriter::new(MirrorWriter::DEFAULT_MAX_BUFFER);
        let healthy = Memory::default();
        mw.add_sink(healthy.clone(), plain());
        mw.add_sink(Panicky, plain());
        assert_eq!(mw.active_sinks(), 2);

        mw.write(b"one;");
        mw.write(b"two;");
        eventually(|| mw.active_sinks() == 1).await;

        mw.write(b"three;");
        bounded(mw.sync()).await;
        let text = healthy.text();
        assert!(text.contains("one;"));
        assert!(text.contains("two;"));
        assert!(text.contains("three;"));
        assert!(text.contains("\"sink\": \"panicky\""));
        assert!(text.contains("sink_panicked"));
        assert!(text.contains("sink exploded"));
    }

    #[tokio::test]
    async fn test_shutdown_releases_removed_stalled_sink() {
        let mw = MirrorWriter::new(MirrorWriter::DEFAULT_MAX_BUFFER);
        let (alive, released) = oneshot::channel::<()>();
        let id = mw.add_sink(Held { _alive: alive }, plain());

        mw.write(b"never");
        mw.remove_sink(id);
        bounded(mw.sync()).await;
        assert!(!mw.is_active());

        bounded(mw.shutdown(Duration::from_millis(50))).await;
        assert!(bounded(released).await.is_err());
    }

    #[tokio::test]
    async fn test_remove_drains_then_closes() {
        let mw = MirrorWriter::new(MirrorWriter::DEFAULT_MAX_BUFFER);
        let a = Memory::default();
        let id = mw.add_sink(a.clone(), plain());

        mw.write(b"one");
        mw.write(b"two");
        mw.remove_sink(id);
        mw.write(b"three");
        mw.remove_sink(id);

        eventually(|| *a.closed.lock()).await;
        assert_eq!(a.text(), "onetwo");
        assert!(!mw.is_active());
    }

    #[tokio::test]
    async fn test_records_are_filtered_and_encoded_per_sink() {
        let mw = MirrorWriter::new(MirrorWriter::DEFAULT_MAX_BUFFER);
        let json = Memory::default();
        let errors_only = Memory::default();
        mw.add_sink(json.clone(), SinkOptions::new(Format::Json, Level::Debug));
        mw.add_sink(
            errors_only.clone(),
            SinkOptions::new(Format::Plaintext, Level::Error),
        );

        mw.write_record(Record::new(Level::Info, "net", "dialing"));
        mw.write_record(Record::new(Level::Error, "net", "refused"));
        bounded(mw.sync()).await;

        let lines: Vec<serde_json::Value> = json
            .text()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["msg"], "dialing");
        assert_eq!(lines[1]["level"], "error");

        let plain = errors_only.text();
        assert_eq!(plain.lines().count(), 1);
        assert!(plain.contains("\tERROR\tnet\trefused"));
    }

    #[tokio::test]
    async fn test_ordering_is_preserved_per_sink() {
        let mw = MirrorWriter::new(MirrorWriter::DEFAULT_MAX_BUFFER);
        let a = Memory::default();
        mw.add_sink(a.clone(), plain());

        let writers: Vec<_> = (0..4)
            .map(|t| {
                let mw = mw.clone();
                tokio::spawn(async move {
                    for i in 0..50 {
                        mw.write(format!("{t}:{i}\n").as_bytes());
                    }
                })
            })
            .collect();
        for w in writers {
            w.await.unwrap();
        }
        bounded(mw.sync()).await;

        let text = a.text();
        for t in 0..4 {
            let seen: Vec<usize> = text
                .lines()
                .filter_map(|l| l.strip_prefix(&format!("{t}:")))
                .map(|n| n.parse().unwrap())
                .collect();
            assert_eq!(seen, (0..50).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn test_sink_added_later_sees_only_later_writes() {
        let mw = MirrorWriter::new(MirrorWriter::DEFAULT_MAX_BUFFER);
        let first = Memory::default();
        mw.add_sink(first.clone(), plain());
        mw.write(b"early;");

        let late = Memory::default();
        mw.add_sink(late.clone(), plain());
        mw.write(b"late;");
        bounded(mw.sync()).await;

        assert_eq!(first.text(), "early;late;");
        assert_eq!(late.text(), "late;");
    }

    #[tokio::test]
    async fn test_shutdown_closes_sinks() {
        let mw = MirrorWriter::new(MirrorWriter::DEFAULT_MAX_BUFFER);
        let a = Memory::default();
        mw.add_sink(a.clone(), plain());
        mw.write(b"bye");

        bounded(mw.shutdown(Duration::from_secs(1))).await;
        assert_eq!(a.text(), "bye");
        assert!(*a.closed.lock());
        assert!(!mw.is_active());

        mw.write(b"ignored");
        bounded(mw.sync()).await;
        assert_eq!(a.text(), "bye");
    }

    #[tokio::test]
    async fn test_shutdown_aborts_stalled_sink_after_grace() {
        let mw = MirrorWriter::new(MirrorWriter::DEFAULT_MAX_BUFFER);
        mw.add_sink(
            Stall {
                inner: Memory::default(),
                allow: 0,
            },
            plain(),
        );
        mw.write(b"never");
        bounded(mw.shutdown(Duration::from_millis(50))).await;
    }
}
