//! # fanlog
//!
//! **fanlog** is a structured logging facade for async Rust services.
//!
//! It gives every component (subsystem) its own logger whose minimum level can be
//! changed at runtime, and fans every record out to any number of sinks without
//! letting a slow or broken sink hold up the code that logs.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   logger("net")      logger("db")      tracing::info!()
//!        │                  │                  │ (feature "tracing")
//!        ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Logging (process manager)                                        │
//! │  - Registry: name ─► LevelCell, name ─► Logger, default level     │
//! │  - labels (set once), Config                                      │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                │ level admits? ─► Record
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  MirrorWriter                                                     │
//! │  [ingestion channel] ─► broadcaster (encode once per format)      │
//! └──────┬──────────────────────┬──────────────────────┬──────────────┘
//!        ▼                      ▼                      ▼
//!   [queue] worker         [queue] worker         [queue] worker
//!        │                      │                      │
//!     stderr                 log file              PipeReader ─► AsyncRead
//! ```
//!
//! ### Record lifecycle
//! ```text
//! Logger::warn(msg)
//!   ├─► LevelCell::enabled(Warn)?          no ─► return (one atomic load)
//!   ├─► MirrorWriter::is_active()?         no ─► return
//!   ├─► Record { ts, level, subsystem, caller, msg, labels + fields }
//!   └─► MirrorWriter ─► per sink: level filter ─► encode ─► queue ─► write
//!                                   │
//!                                   ├─ write error      ─► sink evicted
//!                                   └─ queue > max bytes ─► sink evicted
//!                                        └─► WARN "sink evicted" on subsystem "mirror"
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / functions                      |
//! |-------------------|---------------------------------------------------------------|--------------------------------------------|
//! | **Loggers**       | Leveled emit calls bound to one subsystem.                    | [`Logger`], [`Level`]                      |
//! | **Levels**        | Per-subsystem runtime levels, wildcard and regex updates.     | [`Registry`], [`Logging::set_log_level`]   |
//! | **Fan-out**       | Ordered, non-blocking delivery to many sinks with eviction.   | [`MirrorWriter`], [`Sink`], [`SinkOptions`] |
//! | **Pipe readers**  | Observe live output in-process (tests, RPC handlers).         | [`PipeReader`], [`PipeOptions`]            |
//! | **Encoding**      | Colorized, plaintext and JSON lines.                          | [`Format`], [`Record`]                     |
//! | **Configuration** | Struct and `FANLOG_*` environment variables.                  | [`Config`]                                 |
//! | **Errors**        | Typed configuration and delivery errors.                      | [`LogError`], [`SinkError`]                |
//!
//! ## Optional features
//! - `tracing`: exports [`TracingBridge`], a `tracing_subscriber::Layer` that routes
//!   `tracing` events into fanlog loggers.
//!
//! ## Runtime
//! Sinks are driven by Tokio tasks: [`Logging::new`], [`init`] and
//! [`MirrorWriter::new`] must run inside a Tokio runtime. Emitting a record does
//! not need one.
//!
//! ## Example
//! ```rust
//! use fanlog::{Config, Logging, PipeOptions};
//! use tokio::io::AsyncReadExt;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.stderr = false;
//!     let logging = Logging::new(cfg)?;
//!
//!     let mut reader = logging.new_pipe_reader(PipeOptions::default());
//!     let log = logging.logger("app").with("request", 7);
//!
//!     log.info("hidden");                      // default level is "error"
//!     logging.set_log_level("app", "info")?;
//!     log.info("visible");
//!
//!     reader.close();
//!     let mut out = String::new();
//!     reader.read_to_string(&mut out).await?;
//!     assert!(out.contains("visible") && !out.contains("hidden"));
//!     Ok(())
//! }
//! ```
mod config;
mod encoding;
mod error;
mod levels;
mod logger;
mod logging;
mod mirror;
mod pipe;
mod record;
mod registry;
mod sinks;

// ---- Public re-exports ----

pub use config::Config;
pub use encoding::Format;
pub use error::{LogError, SinkError};
pub use levels::{level_from_string, Level, LevelCell};
pub use logger::Logger;
pub use logging::{
    all_log_levels, get_log_level, global, init, list_subsystems, logger, new_pipe_reader,
    set_log_level, set_log_level_regex, Logging,
};
pub use mirror::{MirrorWriter, MIRROR_SUBSYSTEM};
pub use pipe::{PipeOptions, PipeReader};
pub use record::{Field, Record};
pub use registry::{Registry, UNDEFINED, WILDCARD};
pub use sinks::{FileSink, Sink, SinkId, SinkOptions, StdSink, WriterSink};

// Optional: route `tracing` events into fanlog loggers.
// Enable with: `--features tracing`
#[cfg(feature = "tracing")]
mod bridge;
#[cfg(feature = "tracing")]
pub use bridge::TracingBridge;
