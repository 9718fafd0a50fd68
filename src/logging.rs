//! # Logging: the process-level manager.
//!
//! [`Logging`] owns the level/logger [`Registry`], the [`MirrorWriter`] and the
//! primary sinks built from [`Config`]. It is the runtime control surface used by
//! CLIs and RPC handlers (set/get levels, list subsystems, attach pipe readers).
//!
//! ## Architecture
//! ```text
//! Config ──► Logging::new()
//!              ├─► MirrorWriter::new(max_sink_buffer)
//!              │      ├─ add_sink(stderr)   (cfg.stderr)
//!              │      ├─ add_sink(stdout)   (cfg.stdout)
//!              │      └─ add_sink(file)     (cfg.file)
//!              ├─► Registry::new(cfg.level)
//!              │      └─ set_level(name, lvl) for cfg.subsystem_levels
//!              └─► mirror.set_probe(registry)   (eviction warnings honor "mirror" level)
//!
//! logging.logger("net").info("up") ──► Registry ──► Logger ──► MirrorWriter ──► sinks
//! ```
//!
//! ## Global instance
//! [`init`] installs one process-wide instance (first call wins); [`global`] and
//! the free functions in this module delegate to it and return
//! [`LogError::NotInitialized`] before `init`.
//!
//! ## Example
//! ```rust
//! use fanlog::{Config, Logging, PipeOptions};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), fanlog::LogError> {
//!     let mut cfg = Config::default();
//!     cfg.stderr = false;
//!
//!     let logging = Logging::new(cfg)?;
//!     let reader = logging.new_pipe_reader(PipeOptions::default());
//!
//!     logging.set_log_level("net", "debug")?;
//!     logging.logger("net").debug("dialing");
//!     assert_eq!(logging.get_log_level("net")?, "debug");
//!
//!     reader.close();
//!     logging.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde_json::Value;

use crate::config::Config;
use crate::error::LogError;
use crate::levels::Level;
use crate::logger::{Logger, Output};
use crate::mirror::MirrorWriter;
use crate::pipe::{PipeOptions, PipeReader};
use crate::registry::Registry;
use crate::sinks::{FileSink, SinkId, SinkOptions, StdSink};

/// Levels, loggers and outputs of one process (or one test).
pub struct Logging {
    registry: Arc<Registry>,
    output: Arc<Output>,
    primaries: Vec<SinkId>,
    grace: Duration,
}

impl Logging {
    /// Builds the manager from `config`.
    ///
    /// # Errors
    /// [`LogError::Io`] if the configured file cannot be opened. Nothing is
    /// spawned in that case.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn new(config: Config) -> Result<Self, LogError> {
        let file = config.file.as_deref().map(FileSink::open).transpose()?;

        let mirror = MirrorWriter::new(config.max_sink_buffer);
        let options = SinkOptions::new(config.format, Level::Debug);
        let mut primaries = Vec::new();
        if config.stderr {
            primaries.push(mirror.add_sink(StdSink::stderr(), options));
        }
        if config.stdout {
            primaries.push(mirror.add_sink(StdSink::stdout(), options));
        }
        if let Some(file) = file {
            primaries.push(mirror.add_sink(file, options));
        }

        let labels = config
            .labels
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect();
        let output = Arc::new(Output::new(mirror, labels));
        let registry = Registry::new(config.level, Arc::clone(&output));
        for (name, level) in &config.subsystem_levels {
            registry.set_level(name, *level);
        }
        output.mirror().set_probe(registry.probe());

        Ok(Self {
            registry,
            output,
            primaries,
            grace: config.shutdown_grace,
        })
    }

    /// Logger for subsystem `name`, created on first use.
    pub fn logger(&self, name: &str) -> Logger {
        self.registry.logger(name)
    }

    /// Sets the level of `subsystem` (`"*"` or `""` for all) from level text.
    pub fn set_log_level(&self, subsystem: &str, level: &str) -> Result<(), LogError> {
        let level: Level = level.parse()?;
        self.registry.set_level(subsystem, level);
        Ok(())
    }

    /// Sets the level of every logger whose name matches `pattern`.
    ///
    /// The level text is validated before the pattern is compiled.
    pub fn set_log_level_regex(&self, pattern: &str, level: &str) -> Result<(), LogError> {
        let level: Level = level.parse()?;
        self.registry.set_level_regex(pattern, level)?;
        Ok(())
    }

    /// Level text of `subsystem`; `"*"` and `""` return the default.
    pub fn get_log_level(&self, subsystem: &str) -> Result<String, LogError> {
        self.registry.get_level(subsystem).map(|l| l.to_string())
    }

    /// Copy of every known level as text, including `"*"`.
    pub fn all_log_levels(&self) -> HashMap<String, String> {
        self.registry
            .all_levels()
            .into_iter()
            .map(|(name, level)| (name, level.to_string()))
            .collect()
    }

    /// Sorted names of every registered logger.
    pub fn list_subsystems(&self) -> Vec<String> {
        self.registry.subsystems()
    }

    /// Attaches a reader that receives everything emitted from now on.
    pub fn new_pipe_reader(&self, options: PipeOptions) -> PipeReader {
        PipeReader::new(self.output.mirror(), options)
    }

    /// Sets the labels merged into every record.
    ///
    /// Set-once: returns `false` and changes nothing if labels were already set,
    /// including through [`Config::labels`].
    pub fn set_labels<I, K, V>(&self, labels: I) -> bool
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.output.set_labels(
            labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// The level and logger registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[cfg(feature = "tracing")]
    pub(crate) fn shared_registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// The fan-out writer; use it to attach custom sinks.
    pub fn mirror(&self) -> &MirrorWriter {
        self.output.mirror()
    }

    /// Sinks created from the configuration (stderr, stdout, file).
    pub fn primary_sinks(&self) -> &[SinkId] {
        &self.primaries
    }

    /// Clears loggers and levels, restoring the configured default level.
    pub fn reset(&self) {
        self.registry.reset();
    }

    /// Waits until every attached sink has written everything emitted so far.
    pub async fn sync(&self) {
        self.output.mirror().sync().await;
    }

    /// Drains and closes every sink, waiting at most the configured grace period.
    pub async fn shutdown(&self) {
        self.output.mirror().shutdown(self.grace).await;
    }
}

static GLOBAL: OnceLock<Logging> = OnceLock::new();

/// Installs the process-wide instance built from `config`.
///
/// The first successful call wins; later calls return the installed instance
/// and ignore their `config`.
///
/// # Panics
/// Must be called from within a Tokio runtime.
pub fn init(config: Config) -> Result<&'static Logging, LogError> {
    if let Some(logging) = GLOBAL.get() {
        return Ok(logging);
    }
    let logging = Logging::new(config)?;
    Ok(GLOBAL.get_or_init(|| logging))
}

/// The process-wide instance.
pub fn global() -> Result<&'static Logging, LogError> {
    GLOBAL.get().ok_or(LogError::NotInitialized)
}

/// [`Logging::logger`] on the global instance.
pub fn logger(name: &str) -> Result<Logger, LogError> {
    Ok(global()?.logger(name))
}

/// [`Logging::set_log_level`] on the global instance.
pub fn set_log_level(subsystem: &str, level: &str) -> Result<(), LogError> {
    global()?.set_log_level(subsystem, level)
}

/// [`Logging::set_log_level_regex`] on the global instance.
pub fn set_log_level_regex(pattern: &str, level: &str) -> Result<(), LogError> {
    global()?.set_log_level_regex(pattern, level)
}

/// [`Logging::get_log_level`] on the global instance.
pub fn get_log_level(subsystem: &str) -> Result<String, LogError> {
    global()?.get_log_level(subsystem)
}

/// [`Logging::all_log_levels`] on the global instance.
pub fn all_log_levels() -> Result<HashMap<String, String>, LogError> {
    Ok(global()?.all_log_levels())
}

/// [`Logging::list_subsystems`] on the global instance.
pub fn list_subsystems() -> Result<Vec<String>, LogError> {
    Ok(global()?.list_subsystems())
}

/// [`Logging::new_pipe_reader`] on the global instance.
pub fn new_pipe_reader(options: PipeOptions) -> Result<PipeReader, LogError> {
    Ok(global()?.new_pipe_reader(options))
}
