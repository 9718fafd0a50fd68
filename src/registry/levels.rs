//! Level queries and updates.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use super::{is_wildcard, Registry, WILDCARD};
use crate::error::LogError;
use crate::levels::{Level, LevelCell};

impl Registry {
    /// Sets the level of `subsystem`.
    ///
    /// `"*"` and `""` set the default and every registered subsystem. Any other
    /// name is created if needed, so a later [`logger`](Self::logger) call for
    /// it starts at `level`.
    pub fn set_level(&self, subsystem: &str, level: Level) {
        if is_wildcard(subsystem) {
            self.set_all_levels(level);
            return;
        }
        if let Some(cell) = self.state.read().levels.get(subsystem) {
            cell.set(level);
            return;
        }
        let mut state = self.state.write();
        state
            .levels
            .entry(subsystem.to_string())
            .or_insert_with(|| Arc::new(LevelCell::new(level)))
            .set(level);
    }

    /// Sets the default and every registered subsystem to `level`.
    ///
    /// Best effort with respect to concurrent registration: a subsystem created
    /// while this runs may keep the previous default.
    pub fn set_all_levels(&self, level: Level) {
        let state = self.state.read();
        self.default.set(level);
        for cell in state.levels.values() {
            cell.set(level);
        }
    }

    /// Sets `level` on every logger whose name matches `pattern`.
    ///
    /// Names that only carry a level (no logger yet) are not touched.
    /// On error nothing changes.
    pub fn set_level_regex(&self, pattern: &str, level: Level) -> Result<usize, LogError> {
        let re = Regex::new(pattern).map_err(|source| LogError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        let state = self.state.read();
        let mut matched = 0;
        for name in state.loggers.keys().filter(|name| re.is_match(name)) {
            if let Some(cell) = state.levels.get(name) {
                cell.set(level);
                matched += 1;
            }
        }
        Ok(matched)
    }

    /// Current level of `subsystem`; `"*"` and `""` return the default.
    pub fn get_level(&self, subsystem: &str) -> Result<Level, LogError> {
        if is_wildcard(subsystem) {
            return Ok(self.default.get());
        }
        self.state
            .read()
            .levels
            .get(subsystem)
            .map(|cell| cell.get())
            .ok_or_else(|| LogError::NoSuchSubsystem {
                name: subsystem.to_string(),
            })
    }

    /// Copy of every known level, keyed by subsystem, plus `"*"` for the default.
    pub fn all_levels(&self) -> HashMap<String, Level> {
        let state = self.state.read();
        let mut out: HashMap<String, Level> = state
            .levels
            .iter()
            .map(|(name, cell)| (name.clone(), cell.get()))
            .collect();
        out.insert(WILDCARD.to_string(), self.default.get());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::registry;
    use super::*;

    #[tokio::test]
    async fn test_level_set_before_logger_is_kept() {
        let reg = registry(Level::Error);
        reg.set_level("future", Level::Debug);

        let log = reg.logger("future");
        assert_eq!(log.level(), Level::Debug);
        assert_eq!(reg.get_level("future").unwrap(), Level::Debug);
    }

    #[tokio::test]
    async fn test_set_all_levels() {
        let reg = registry(Level::Error);
        let a = reg.logger("a");
        reg.set_level("b", Level::Warn);

        reg.set_all_levels(Level::Info);
        assert_eq!(reg.get_level(WILDCARD).unwrap(), Level::Info);
        assert_eq!(reg.get_level("").unwrap(), Level::Info);
        assert_eq!(a.level(), Level::Info);
        assert_eq!(reg.get_level("b").unwrap(), Level::Info);

        reg.set_level("", Level::Fatal);
        assert_eq!(a.level(), Level::Fatal);
        assert_eq!(reg.logger("fresh").level(), Level::Fatal);
    }

    #[tokio::test]
    async fn test_unknown_subsystem() {
        let reg = registry(Level::Error);
        let err = reg.get_level("ghost").unwrap_err();
        assert_eq!(err.as_label(), "no_such_subsystem");
        assert!(!reg.all_levels().contains_key("ghost"));
    }

    #[tokio::test]
    async fn test_all_levels_is_a_copy() {
        let reg = registry(Level::Error);
        reg.logger("x");

        let mut snap = reg.all_levels();
        assert_eq!(snap.get(WILDCARD), Some(&Level::Error));
        assert_eq!(snap.get("x"), Some(&Level::Error));

        snap.insert("x".into(), Level::Debug);
        snap.insert("y".into(), Level::Debug);
        snap.remove(WILDCARD);

        let again = reg.all_levels();
        assert_eq!(again.len(), 2);
        assert_eq!(again.get("x"), Some(&Level::Error));
        assert_eq!(again.get(WILDCARD), Some(&Level::Error));
    }

    #[tokio::test]
    async fn test_regex_applies_to_loggers_only() {
        let reg = registry(Level::Error);
        let net = reg.logger("net/dial");
        let netx = reg.logger("net/listen");
        let db = reg.logger("db");
        reg.set_level("net/bare", Level::Error);

        let n = reg.set_level_regex("^net/(dial|listen|bare)$", Level::Debug).unwrap();
        assert_eq!(n, 2);
        assert_eq!(net.level(), Level::Debug);
        assert_eq!(netx.level(), Level::Debug);
        assert_eq!(db.level(), Level::Error);
        assert_eq!(reg.get_level("net/bare").unwrap(), Level::Error);
    }

    #[tokio::test]
    async fn test_invalid_regex_changes_nothing() {
        let reg = registry(Level::Error);
        let a = reg.logger("a");

        let err = reg.set_level_regex("(a", Level::Debug).unwrap_err();
        assert_eq!(err.as_label(), "invalid_pattern");
        assert_eq!(a.level(), Level::Error);
    }
}
