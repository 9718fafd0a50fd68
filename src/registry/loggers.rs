//! Logger lookup and creation.

use std::sync::Arc;

use super::{Registry, UNDEFINED};
use crate::levels::LevelCell;
use crate::logger::Logger;

impl Registry {
    /// Returns the logger for `name`, creating it on first use.
    ///
    /// A new logger takes the level already set for `name`, or the default.
    /// Concurrent first requests for one name all get the same logger.
    /// An empty name is replaced by `"undefined"`.
    pub fn logger(&self, name: &str) -> Logger {
        let name = if name.is_empty() { UNDEFINED } else { name };
        if let Some(logger) = self.state.read().loggers.get(name) {
            return logger.clone();
        }

        let mut state = self.state.write();
        if let Some(logger) = state.loggers.get(name) {
            return logger.clone();
        }
        let cell = match state.levels.get(name) {
            Some(cell) => Arc::clone(cell),
            None => {
                let cell = Arc::new(LevelCell::new(self.default.get()));
                state.levels.insert(name.to_string(), Arc::clone(&cell));
                cell
            }
        };
        let logger = Logger::new(Arc::from(name), cell, Arc::clone(&self.output));
        state.loggers.insert(name.to_string(), logger.clone());
        logger
    }

    /// Sorted names of every registered logger.
    pub fn subsystems(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().loggers.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::registry;
    use super::*;
    use crate::levels::Level;

    #[tokio::test]
    async fn test_same_name_same_cell() {
        let reg = registry(Level::Error);
        let a = reg.logger("svc");
        let b = reg.logger("svc");

        reg.set_level("svc", Level::Debug);
        assert_eq!(a.level(), Level::Debug);
        assert_eq!(b.level(), Level::Debug);
        assert_eq!(reg.subsystems(), vec!["svc".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_name_is_undefined() {
        let reg = registry(Level::Error);
        assert_eq!(reg.logger("").name(), UNDEFINED);
        assert_eq!(reg.subsystems(), vec![UNDEFINED.to_string()]);
    }

    #[tokio::test]
    async fn test_subsystems_sorted() {
        let reg = registry(Level::Error);
        for name in ["zeta", "alpha", "mid"] {
            reg.logger(name);
        }
        reg.set_level("bare", Level::Info);
        assert_eq!(reg.subsystems(), vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_requests_share_one_logger() {
        let reg = registry(Level::Error);
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let reg = Arc::clone(&reg);
                tokio::spawn(async move { reg.logger("race") })
            })
            .collect();

        let mut loggers = Vec::new();
        for h in handles {
            loggers.push(h.await.unwrap());
        }
        reg.set_level("race", Level::Warn);

        let cell = reg.state.read().levels.get("race").cloned().unwrap();
        for logger in &loggers {
            assert!(logger.shares_cell(&cell));
            assert_eq!(logger.level(), Level::Warn);
        }
        assert_eq!(reg.subsystems().len(), 1);
    }
}
