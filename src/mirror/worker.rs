//! Per-sink delivery loop.
//!
//! ```text
//! inbox ──► pending (VecDeque, ≤ max_buffer bytes) ──► in_flight (one write) ──► sink
//! ```
//!
//! The in-flight write owns the sink: it is moved into a boxed future and handed
//! back when the write completes, so the loop can keep accepting buffers while a
//! write is stalled. A panicking write is caught and reported as a death.

use std::any::Any;
use std::collections::VecDeque;
use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, OptionFuture};
use tokio::sync::{mpsc, oneshot};

use crate::error::SinkError;
use crate::sinks::{Sink, SinkId};

/// Item queued for one sink.
pub(super) enum Delivery {
    /// Encoded bytes to write.
    Frame(Arc<[u8]>),
    /// Fires once every earlier frame has been written.
    Sync(oneshot::Sender<()>),
}

/// Death notification sent from a worker to the broadcaster.
pub(super) struct Death {
    pub id: SinkId,
    pub name: Arc<str>,
    pub cause: SinkError,
}

/// Result of one in-flight write.
enum Outcome {
    Written(Box<dyn Sink>),
    Failed(Box<dyn Sink>, io::Error),
    /// The sink panicked; it is dropped without `close`.
    Panicked(String),
}

type InFlight = BoxFuture<'static, Outcome>;

fn deliver(mut sink: Box<dyn Sink>, buf: Arc<[u8]>) -> InFlight {
    async move {
        let res = AssertUnwindSafe(async { sink.write(&buf).await })
            .catch_unwind()
            .await;
        match res {
            Ok(Ok(())) => Outcome::Written(sink),
            Ok(Err(error)) => Outcome::Failed(sink, error),
            Err(payload) => Outcome::Panicked(panic_info(&*payload)),
        }
    }
    .boxed()
}

fn panic_info(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Delivery loop of one attached sink.
pub(super) struct Worker {
    pub id: SinkId,
    pub name: Arc<str>,
    pub max_buffer: usize,
    pub inbox: mpsc::UnboundedReceiver<Delivery>,
    pub deaths: mpsc::UnboundedSender<Death>,
}

impl Worker {
    /// Runs until the inbox closes (graceful: pending data is written, then the
    /// sink is closed) or the sink dies (pending data discarded).
    pub(super) async fn run(mut self, sink: Box<dyn Sink>) {
        let mut idle: Option<Box<dyn Sink>> = Some(sink);
        let mut in_flight: Option<InFlight> = None;
        let mut pending: VecDeque<Delivery> = VecDeque::new();
        let mut pending_bytes = 0usize;
        let mut open = true;

        loop {
            while in_flight.is_none() {
                match pending.pop_front() {
                    Some(Delivery::Frame(buf)) => {
                        pending_bytes -= buf.len();
                        if let Some(sink) = idle.take() {
                            in_flight = Some(deliver(sink, buf));
                        }
                    }
                    Some(Delivery::Sync(done)) => {
                        let _ = done.send(());
                    }
                    None => break,
                }
            }

            if !open && in_flight.is_none() {
                if let Some(mut sink) = idle.take() {
                    let _ = sink.close().await;
                }
                return;
            }

            tokio::select! {
                // Completions first: a sink that keeps up never sees its queue grow.
                biased;
                Some(outcome) = OptionFuture::from(in_flight.as_mut()) => {
                    in_flight = None;
                    match outcome {
                        Outcome::Written(sink) => idle = Some(sink),
                        Outcome::Failed(sink, error) => {
                            pending.clear();
                            self.die(Some(sink), SinkError::WriteFailed { error }).await;
                            return;
                        }
                        Outcome::Panicked(info) => {
                            pending.clear();
                            self.die(None, SinkError::Panicked { info }).await;
                            return;
                        }
                    }
                }
                msg = self.inbox.recv(), if open => match msg {
                    Some(Delivery::Frame(buf)) => {
                        // An idle sink takes the buffer straight into flight; only
                        // data waiting behind a write counts against the bound.
                        let busy = in_flight.is_some() || !pending.is_empty();
                        if busy && pending_bytes + buf.len() > self.max_buffer {
                            // Abandons a stalled write; dropping it drops the sink.
                            drop(in_flight.take());
                            pending.clear();
                            self.die(idle.take(), SinkError::Overflow { limit: self.max_buffer })
                                .await;
                            return;
                        }
                        pending_bytes += buf.len();
                        pending.push_back(Delivery::Frame(buf));
                    }
                    Some(sync) => pending.push_back(sync),
                    None => open = false,
                },
            }
        }
    }

    async fn die(&self, sink: Option<Box<dyn Sink>>, cause: SinkError) {
        let _ = self.deaths.send(Death {
            id: self.id,
            name: Arc::clone(&self.name),
            cause,
        });
        if let Some(mut sink) = sink {
            let _ = sink.close().await;
        }
    }
}
