//! Severity levels and the atomic cell that stores a subsystem's threshold.
//!
//! ## Contents
//! - [`Level`] ordered severity enum (`Debug < Info < … < Fatal`)
//! - [`LevelCell`] lock-free, shareable holder of one current level
//!
//! ## Quick wiring
//! ```text
//! Registry ──► HashMap<name, Arc<LevelCell>> ◄── Logger (reads on every emit)
//!          └─► default: Arc<LevelCell>        (seeds new subsystems, answers "*")
//! ```

mod cell;
mod level;

pub use cell::LevelCell;
pub use level::{level_from_string, Level};
