//! The single task that consumes the ingestion channel and owns the slot list.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::worker::{Death, Delivery, Worker};
use super::{LevelProbe, MIRROR_SUBSYSTEM};
use crate::encoding::Format;
use crate::levels::Level;
use crate::record::Record;
use crate::sinks::{Sink, SinkId, SinkOptions};

/// Messages accepted by the broadcaster, in ingestion order.
pub(super) enum Command {
    Record(Arc<Record>),
    Raw(Arc<[u8]>),
    Add {
        id: SinkId,
        sink: Box<dyn Sink>,
        options: SinkOptions,
    },
    Remove(SinkId),
    Probe(Box<dyn LevelProbe>),
    Sync(oneshot::Sender<()>),
    Shutdown {
        grace: Duration,
        done: oneshot::Sender<()>,
    },
}

/// One attached sink as seen by the broadcaster.
struct Slot {
    id: SinkId,
    options: SinkOptions,
    inbox: mpsc::UnboundedSender<Delivery>,
    worker: JoinHandle<()>,
}

pub(super) struct Broadcaster {
    commands: mpsc::UnboundedReceiver<Command>,
    deaths_tx: mpsc::UnboundedSender<Death>,
    deaths_rx: mpsc::UnboundedReceiver<Death>,
    slots: Vec<Slot>,
    /// Workers of removed sinks, still draining.
    retired: Vec<JoinHandle<()>>,
    active: Arc<AtomicUsize>,
    max_buffer: usize,
    probe: Option<Box<dyn LevelProbe>>,
}

impl Broadcaster {
    pub(super) fn new(
        commands: mpsc::UnboundedReceiver<Command>,
        active: Arc<AtomicUsize>,
        max_buffer: usize,
    ) -> Self {
        let (deaths_tx, deaths_rx) = mpsc::unbounded_channel();
        Self {
            commands,
            deaths_tx,
            deaths_rx,
            slots: Vec::new(),
            retired: Vec::new(),
            active,
            max_buffer,
            probe: None,
        }
    }

    /// Main loop. Deaths are handled before the next command so an evicted
    /// sink stops receiving as early as possible.
    pub(super) async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                Some(death) = self.deaths_rx.recv() => self.bury(death),
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Shutdown { grace, done }) => {
                        self.close_all(grace).await;
                        let _ = done.send(());
                        return;
                    }
                    Some(cmd) => self.handle(cmd),
                    // Every handle dropped: workers drain and close on their own.
                    None => return,
                }
            }
        }
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Record(record) => self.fan_out(&record),
            Command::Raw(bytes) => {
                for slot in &self.slots {
                    let _ = slot.inbox.send(Delivery::Frame(Arc::clone(&bytes)));
                }
            }
            Command::Add { id, sink, options } => self.attach(id, sink, options),
            Command::Remove(id) => {
                if let Some(slot) = self.detach(id) {
                    // Dropping the inbox sender lets the worker drain, then close.
                    self.retired.push(slot.worker);
                }
            }
            Command::Probe(probe) => self.probe = Some(probe),
            Command::Sync(done) => self.sync(done),
            Command::Shutdown { .. } => {}
        }
    }

    fn attach(&mut self, id: SinkId, sink: Box<dyn Sink>, options: SinkOptions) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker {
            id,
            name: Arc::from(sink.name()),
            max_buffer: self.max_buffer,
            inbox: rx,
            deaths: self.deaths_tx.clone(),
        };
        let handle = tokio::spawn(worker.run(sink));
        self.slots.push(Slot {
            id,
            options,
            inbox: tx,
            worker: handle,
        });
        self.retired.retain(|h| !h.is_finished());
    }

    fn detach(&mut self, id: SinkId) -> Option<Slot> {
        let pos = self.slots.iter().position(|s| s.id == id)?;
        self.active.fetch_sub(1, Ordering::AcqRel);
        Some(self.slots.remove(pos))
    }

    /// Sends `record` to every slot whose level admits it, encoding at most once per format.
    fn fan_out(&self, record: &Record) {
        let mut encoded: [Option<Arc<[u8]>>; Format::COUNT] = Default::default();
        for slot in &self.slots {
            if !slot.options.level.admits(record.level) {
                continue;
            }
            let format = slot.options.format;
            let bytes = encoded[format.index()].get_or_insert_with(|| format.encode(record));
            let _ = slot.inbox.send(Delivery::Frame(Arc::clone(bytes)));
        }
    }

    /// Removes a dead sink and reports it once on the `mirror` subsystem.
    ///
    /// A sink that was already removed (it failed while draining) is not reported.
    fn bury(&mut self, death: Death) {
        let Some(slot) = self.detach(death.id) else {
            return;
        };
        self.retired.push(slot.worker);

        let level = Level::Warn;
        let enabled = self
            .probe
            .as_ref()
            .map_or(true, |p| p.enabled(MIRROR_SUBSYSTEM, level));
        if !enabled {
            return;
        }
        let record = Record::new(level, MIRROR_SUBSYSTEM, "sink evicted")
            .with_field("sink", &*death.name)
            .with_field("reason", death.cause.as_label())
            .with_field("error", death.cause.to_string());
        self.fan_out(&record);
    }

    fn sync(&self, done: oneshot::Sender<()>) {
        let waits: Vec<oneshot::Receiver<()>> = self
            .slots
            .iter()
            .filter_map(|slot| {
                let (tx, rx) = oneshot::channel();
                slot.inbox.send(Delivery::Sync(tx)).ok().map(|_| rx)
            })
            .collect();
        tokio::spawn(async move {
            // A dead sink drops its sender; that counts as done.
            join_all(waits).await;
            let _ = done.send(());
        });
    }

    /// Closes every inbox, then waits up to `grace` for workers to drain.
    /// Workers still running after `grace` are aborted.
    async fn close_all(&mut self, grace: Duration) {
        let slots: Vec<Slot> = self.slots.drain(..).collect();
        self.active.fetch_sub(slots.len(), Ordering::AcqRel);

        let mut workers: Vec<JoinHandle<()>> = slots.into_iter().map(|s| s.worker).collect();
        workers.append(&mut self.retired);

        let aborts: Vec<_> = workers.iter().map(|h| h.abort_handle()).collect();
        if tokio::time::timeout(grace, join_all(workers)).await.is_err() {
            for handle in aborts {
                handle.abort();
            }
        }
    }
}
