//! # Registry: subsystem levels and loggers.
//!
//! One registry per [`Logging`](crate::Logging) instance. It maps:
//! - subsystem name → [`LevelCell`] (created by a level update or by the first
//!   logger request, whichever comes first),
//! - subsystem name → [`Logger`] (created lazily, exactly once per name).
//!
//! A separate **default** cell seeds new subsystems and answers `"*"` / `""`.
//!
//! ## Architecture
//! ```text
//!                 RwLock<State>
//!              ┌───────────────────────────────┐
//! set_level ──►│ levels:  "net" ─► Arc<LevelCell> ◄──┐
//! logger    ──►│ loggers: "net" ─► Logger ───────────┘ (same cell)
//!              └───────────────────────────────┘
//!   default: Arc<LevelCell>  (outside the lock, atomic)
//! ```
//!
//! ## Rules
//! - Every logger's cell is also in `levels`; a level set before the logger
//!   exists is picked up, never overwritten.
//! - Lookups take the read lock; creation and reset take the write lock.
//! - Level checks on the emit path never touch the lock.

mod levels;
mod loggers;

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::levels::{Level, LevelCell};
use crate::logger::{Logger, Output};
use crate::mirror::LevelProbe;

/// Name that addresses the default level.
pub const WILDCARD: &str = "*";

/// Logger name used when an empty name is requested.
pub const UNDEFINED: &str = "undefined";

#[derive(Default)]
struct State {
    levels: HashMap<String, Arc<LevelCell>>,
    loggers: HashMap<String, Logger>,
}

/// Levels and loggers of one logging instance.
pub struct Registry {
    state: RwLock<State>,
    default: Arc<LevelCell>,
    /// Level restored by [`reset`](Self::reset).
    configured: Level,
    output: Arc<Output>,
}

impl Registry {
    pub(crate) fn new(default_level: Level, output: Arc<Output>) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(State::default()),
            default: Arc::new(LevelCell::new(default_level)),
            configured: default_level,
            output,
        })
    }

    /// Clears every logger and level, and restores the configured default level.
    ///
    /// Loggers handed out before the reset keep working but no longer follow
    /// level updates. Intended for test isolation.
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.loggers.clear();
        state.levels.clear();
        self.default.set(self.configured);
    }

    /// Level probe for the mirror writer's own diagnostics.
    ///
    /// Holds a weak reference: the mirror writer must not keep the registry alive.
    pub(crate) fn probe(self: &Arc<Self>) -> Box<dyn LevelProbe> {
        Box::new(Probe(Arc::downgrade(self)))
    }

    fn enabled(&self, subsystem: &str, level: Level) -> bool {
        match self.state.read().levels.get(subsystem) {
            Some(cell) => cell.enabled(level),
            None => self.default.enabled(level),
        }
    }
}

struct Probe(Weak<Registry>);

impl LevelProbe for Probe {
    fn enabled(&self, subsystem: &str, level: Level) -> bool {
        self.0
            .upgrade()
            .is_some_and(|registry| registry.enabled(subsystem, level))
    }
}

/// True for the names that address the default level.
fn is_wildcard(name: &str) -> bool {
    name.is_empty() || name == WILDCARD
}
