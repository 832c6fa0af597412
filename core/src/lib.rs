//! progress-core: the game-progress store for the adventure runtime.
//!
//! Owns score, timeblock, flags and interaction counters, the transition
//! state machine between timeblocks, and the save-file codec.

pub mod ci_map;
pub mod config;
pub mod counters;
pub mod error;
pub mod event;
pub mod flags;
pub mod persist;
pub mod progress;
pub mod score;
pub mod store;
pub mod timeblock;
pub mod transition;
pub mod types;
