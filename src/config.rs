//! # Logging configuration.
//!
//! [`Config`] selects the output format, the default and per-subsystem levels,
//! the primary destinations and the labels merged into every record.
//!
//! ## Environment
//! [`Config::from_env`] reads:
//! - `FANLOG_LEVEL`: `"<default>[,<subsystem>=<level>]*"`, e.g. `info,net=debug`
//! - `FANLOG_FORMAT`: `color` | `nocolor` | `json`
//! - `FANLOG_FILE`: path of a log file (enables the file destination)
//! - `FANLOG_OUTPUT`: `+` separated subset of `stderr`, `stdout`, `file`
//! - `FANLOG_LABELS`: `k=v,k2=v2` (entries without `=` are ignored)
//!
//! Unset variables keep the defaults.
//!
//! # Example
//! ```
//! use fanlog::{Config, Format, Level};
//!
//! let mut cfg = Config::default();
//! cfg.format = Format::Json;
//! cfg.level = Level::Info;
//! cfg.subsystem_levels.insert("net".into(), Level::Debug);
//!
//! assert!(cfg.stderr);
//! assert_eq!(cfg.max_sink_buffer, 512 * 1024);
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::encoding::Format;
use crate::error::LogError;
use crate::levels::Level;
use crate::mirror::MirrorWriter;

pub const ENV_LEVEL: &str = "FANLOG_LEVEL";
pub const ENV_FORMAT: &str = "FANLOG_FORMAT";
pub const ENV_FILE: &str = "FANLOG_FILE";
pub const ENV_OUTPUT: &str = "FANLOG_OUTPUT";
pub const ENV_LABELS: &str = "FANLOG_LABELS";

/// Configuration of a [`Logging`](crate::Logging) instance.
///
/// ## Field semantics
/// - `level`: default threshold, also restored by `reset`
/// - `subsystem_levels`: applied at construction, before any logger exists
/// - `stderr` / `stdout` / `file`: primary destinations; none at all is valid
///   (loggers are then inactive until a pipe reader or sink is attached)
/// - `max_sink_buffer`: bytes a sink may have queued before it is evicted (min 1)
/// - `shutdown_grace`: how long `shutdown` waits for sinks to drain
#[derive(Clone, Debug)]
pub struct Config {
    /// Encoding of the primary destinations.
    pub format: Format,
    /// Default minimum level.
    pub level: Level,
    /// Initial per-subsystem levels.
    pub subsystem_levels: HashMap<String, Level>,
    /// Write to standard error.
    pub stderr: bool,
    /// Write to standard output.
    pub stdout: bool,
    /// Append to this file.
    pub file: Option<PathBuf>,
    /// Key/value pairs added to every record, in order.
    pub labels: Vec<(String, String)>,
    /// Per-sink bound on queued bytes.
    pub max_sink_buffer: usize,
    /// Drain timeout used by `shutdown`.
    pub shutdown_grace: Duration,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `format = Colorized`
    /// - `level = Error`
    /// - `stderr` only
    /// - no labels
    /// - `max_sink_buffer = 512 KiB`
    /// - `shutdown_grace = 5s`
    fn default() -> Self {
        Self {
            format: Format::default(),
            level: Level::Error,
            subsystem_levels: HashMap::new(),
            stderr: true,
            stdout: false,
            file: None,
            labels: Vec::new(),
            max_sink_buffer: MirrorWriter::DEFAULT_MAX_BUFFER,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Defaults overridden by the `FANLOG_*` process environment.
    pub fn from_env() -> Result<Self, LogError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LogError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();

        if let Some(text) = lookup(ENV_LEVEL) {
            cfg.apply_level_directives(&text)?;
        }
        if let Some(text) = lookup(ENV_FORMAT) {
            cfg.format = text.parse()?;
        }
        if let Some(path) = lookup(ENV_FILE).filter(|p| !p.is_empty()) {
            cfg.file = Some(PathBuf::from(path));
        }
        if let Some(text) = lookup(ENV_OUTPUT) {
            cfg.apply_outputs(&text);
        }
        if let Some(text) = lookup(ENV_LABELS) {
            cfg.labels = parse_labels(&text);
        }
        Ok(cfg)
    }

    /// Applies `"<default>[,<subsystem>=<level>]*"`.
    ///
    /// An entry without `=` sets the default level. Nothing is applied if any
    /// entry fails to parse.
    pub fn apply_level_directives(&mut self, text: &str) -> Result<(), LogError> {
        let mut default = None;
        let mut per_subsystem = Vec::new();
        for entry in text.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.split_once('=') {
                Some((name, level)) => {
                    per_subsystem.push((name.trim().to_string(), level.parse::<Level>()?))
                }
                None => default = Some(entry.parse::<Level>()?),
            }
        }
        if let Some(level) = default {
            self.level = level;
        }
        self.subsystem_levels.extend(per_subsystem);
        Ok(())
    }

    /// Applies a `+` separated destination list; unknown names are ignored.
    ///
    /// `file` only takes effect together with a configured path.
    fn apply_outputs(&mut self, text: &str) {
        let outputs: Vec<String> = text
            .split('+')
            .map(|o| o.trim().to_ascii_lowercase())
            .collect();
        let has = |name: &str| outputs.iter().any(|o| o == name);
        self.stderr = has("stderr");
        self.stdout = has("stdout");
        if !has("file") {
            self.file = None;
        }
    }
}

fn parse_labels(text: &str) -> Vec<(String, String)> {
    text.split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_empty_env_is_default() {
        let cfg = Config::from_lookup(env(&[])).unwrap();
        assert_eq!(cfg.level, Level::Error);
        assert_eq!(cfg.format, Format::Colorized);
        assert!(cfg.stderr && !cfg.stdout && cfg.file.is_none());
    }

    #[test]
    fn test_level_directives() {
        let cfg = Config::from_lookup(env(&[(ENV_LEVEL, "info,test1=debug")])).unwrap();
        assert_eq!(cfg.level, Level::Info);
        assert_eq!(cfg.subsystem_levels.get("test1"), Some(&Level::Debug));

        let err = Config::from_lookup(env(&[(ENV_LEVEL, "info,net=chatty")])).unwrap_err();
        assert_eq!(err.as_label(), "invalid_level");
    }

    #[test]
    fn test_invalid_level_directives_applies_nothing() {
        let mut cfg = Config::default();
        assert!(cfg.apply_level_directives("warn,bad").is_err());
        assert_eq!(cfg.level, Level::Error);
        assert!(cfg.subsystem_levels.is_empty());
    }

    #[test]
    fn test_format_and_outputs() {
        let cfg = Config::from_lookup(env(&[
            (ENV_FORMAT, "json"),
            (ENV_FILE, "/tmp/x.log"),
            (ENV_OUTPUT, "stdout+file"),
        ]))
        .unwrap();
        assert_eq!(cfg.format, Format::Json);
        assert!(!cfg.stderr);
        assert!(cfg.stdout);
        assert_eq!(cfg.file, Some(PathBuf::from("/tmp/x.log")));

        let err = Config::from_lookup(env(&[(ENV_FORMAT, "xml")])).unwrap_err();
        assert_eq!(err.as_label(), "invalid_format");
    }

    #[test]
    fn test_output_without_file_drops_path() {
        let cfg = Config::from_lookup(env(&[(ENV_FILE, "/tmp/x.log"), (ENV_OUTPUT, "stderr")]))
            .unwrap();
        assert!(cfg.stderr);
        assert!(cfg.file.is_none());
    }

    #[test]
    fn test_labels_skip_malformed() {
        let cfg = Config::from_lookup(env(&[(ENV_LABELS, "dc=sjc-1, broken ,=x,app = api")]))
            .unwrap();
        assert_eq!(
            cfg.labels,
            vec![
                ("dc".to_string(), "sjc-1".to_string()),
                ("app".to_string(), "api".to_string()),
            ]
        );
    }
}
