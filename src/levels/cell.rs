use std::sync::atomic::{AtomicU8, Ordering};

use super::Level;

/// Atomically readable/writable level shared by a subsystem's loggers.
///
/// Readers never observe a torn value; the hot path is a single atomic load.
#[derive(Debug)]
pub struct LevelCell {
    raw: AtomicU8,
}

impl LevelCell {
    /// Creates a cell holding `level`.
    pub fn new(level: Level) -> Self {
        Self {
            raw: AtomicU8::new(level.to_u8()),
        }
    }

    /// Current threshold.
    #[inline]
    pub fn get(&self) -> Level {
        Level::from_u8(self.raw.load(Ordering::Acquire))
    }

    /// Replaces the threshold.
    #[inline]
    pub fn set(&self, level: Level) {
        self.raw.store(level.to_u8(), Ordering::Release);
    }

    /// True if a record at `level` passes this threshold.
    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        self.get().admits(level)
    }
}
