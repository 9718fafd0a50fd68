//! # Mirror writer: ordered, non-blocking fan-out of log output to many sinks.
//!
//! [`MirrorWriter`] is the single output path of every logger. It accepts
//! records (or raw bytes) from any thread and distributes them to all attached
//! [`Sink`](crate::Sink)s **without** letting one slow or broken sink stall the
//! callers or the other sinks.
//!
//! ## Architecture
//! ```text
//! Logger::info() ─┐
//! Logger::warn() ─┼──► [ingestion channel] ──► broadcaster task
//! write(&[u8])  ──┘      (unbounded, FIFO)        │  encode once per format,
//!                                                  │  filter by sink level
//!                    ┌─────────────────────────────┼─────────────────────────┐
//!                    ▼                             ▼                         ▼
//!             [queue S1] ─► worker S1       [queue S2] ─► worker S2   [queue SN] ─► worker SN
//!              (≤ max bytes)   │                             │                          │
//!                         one write in flight          sink.write()                sink.write()
//!                              │
//!                      Err / overflow ──► Death{id} ──► broadcaster removes slot,
//!                                                        logs a `mirror` warning
//! ```
//!
//! ## Rules
//! - **Global order**: one channel, one broadcaster; any sink that received buffer `k`
//!   already received buffer `k-1`.
//! - **Non-blocking emit**: callers only push into the ingestion channel.
//! - **Isolation**: each sink has its own queue and worker; a slow sink never delays another.
//! - **Backpressure**: a sink whose queued bytes would exceed the bound is evicted,
//!   its queue discarded; there is no wall-clock deadline per write.
//! - **Failure**: a write error or a panic inside `write` evicts the sink; nothing
//!   is returned to emitters.
//! - **Registration** goes through the same channel as data: buffers written after
//!   [`MirrorWriter::add_sink`] returns reach the new sink, and buffers written before
//!   [`MirrorWriter::remove_sink`] are still delivered before the sink is closed.
//!
//! ## Dead-sink protocol
//! Workers report death by message (`Death` on a dedicated channel). The broadcaster
//! drops the slot between two commands, never while iterating the slot list.

mod broadcaster;
mod worker;
mod writer;

pub use writer::MirrorWriter;

use crate::levels::Level;

/// Subsystem name used for the mirror writer's own diagnostics.
pub const MIRROR_SUBSYSTEM: &str = "mirror";

/// Answers whether a diagnostic record of the given level should be emitted.
///
/// The registry implements this so the mirror's eviction warnings honor the
/// `mirror` subsystem's level like any other logger.
pub(crate) trait LevelProbe: Send + Sync + 'static {
    fn enabled(&self, subsystem: &str, level: Level) -> bool;
}
