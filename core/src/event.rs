//! Progress events: what UI, audio and other collaborators react to.
//!
//! RULE: collaborators never poll internal tables for changes.
//! They drain `GameProgress::drain_events()` once per frame.

use serde::{Deserialize, Serialize};

use crate::{timeblock::Timeblock, types::Points};

/// Variants are appended only. Never removed or reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    // ── Score ─────────────────────────────────────
    ScoreChanged {
        event:  Option<String>,
        points: Points,
        score:  Points,
    },
    UnknownScoreEvent {
        event: String,
    },

    // ── Flags ─────────────────────────────────────
    FlagChanged {
        flag:  String,
        value: bool,
    },

    // ── Timeblocks ────────────────────────────────
    TimeblockEnded {
        timeblock: Timeblock,
    },
    TimeblockStarted {
        timeblock:    Timeblock,
        previous:     Option<Timeblock>,
        loading_save: bool,
    },

    // ── Persistence ───────────────────────────────
    ProgressLoaded {
        version: u32,
    },
}
