//! Score tracking.
//!
//! RULE: a score event (e.g. `e_110a_r25_tape`) awards its points at most
//! once. The triggered set is the only guard; `set_score` and
//! `increase_score` bypass it and are reserved for debug tooling.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{ci_map::CiMap, timeblock::Timeblock, types::Points};

/// Static score data, loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ScoreTable {
    events:       CiMap<Points>,
    /// Score event applied the first time each timeblock is entered.
    entry_events: BTreeMap<Timeblock, String>,
}

impl ScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event(mut self, name: &str, points: Points) -> Self {
        self.insert_event(name, points);
        self
    }

    pub fn with_entry_event(mut self, timeblock: Timeblock, event: &str) -> Self {
        self.insert_entry_event(timeblock, event);
        self
    }

    pub fn insert_event(&mut self, name: &str, points: Points) {
        self.events.insert(name, points);
    }

    pub fn insert_entry_event(&mut self, timeblock: Timeblock, event: &str) {
        self.entry_events.insert(timeblock, event.to_string());
    }

    pub fn points(&self, name: &str) -> Option<Points> {
        self.events.get(name).copied()
    }

    pub fn entry_event(&self, timeblock: Timeblock) -> Option<&str> {
        self.entry_events.get(&timeblock).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Sum of every event's points. Useful for checking data against max score.
    pub fn total_points(&self) -> Points {
        self.events.iter().map(|(_, p)| *p).sum()
    }
}

/// Outcome of `change_score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScoreChange {
    Applied { points: Points, score: Points },
    AlreadyTriggered,
    UnknownEvent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreLedger {
    max_score: Points,
    score:     Points,
    triggered: CiMap<bool>,
}

impl ScoreLedger {
    pub fn new(max_score: Points) -> Self {
        Self {
            max_score,
            score: 0,
            triggered: CiMap::new(),
        }
    }

    pub fn score(&self) -> Points {
        self.score
    }

    pub fn max_score(&self) -> Points {
        self.max_score
    }

    /// Direct assignment. Not clamped.
    pub fn set_score(&mut self, score: Points) {
        self.score = score;
    }

    /// Direct increase. Not clamped, not guarded.
    pub fn increase_score(&mut self, points: Points) {
        self.score = self.score.saturating_add(points);
    }

    /// Apply a named score event once.
    pub fn change_score(&mut self, table: &ScoreTable, event: &str) -> ScoreChange {
        let Some(points) = table.points(event) else {
            log::warn!("score: unknown score event '{event}'");
            return ScoreChange::UnknownEvent;
        };
        if self.is_triggered(event) {
            return ScoreChange::AlreadyTriggered;
        }

        // Never push past the max; never pull down a score that a direct
        // assignment already put above it.
        let ceiling = self.max_score.max(self.score);
        let before = self.score;
        self.increase_score(points);
        self.score = self.score.min(ceiling);
        self.triggered.insert(event, true);

        log::debug!("score: {event} +{points} -> {}/{}", self.score, self.max_score);
        ScoreChange::Applied {
            points: self.score - before,
            score:  self.score,
        }
    }

    pub fn is_triggered(&self, event: &str) -> bool {
        self.triggered.get(event).copied().unwrap_or(false)
    }

    /// Forget that an event was triggered so it may award points again.
    pub fn reset_event(&mut self, event: &str) {
        self.triggered.remove(event);
    }

    pub(crate) fn triggered(&self) -> &CiMap<bool> {
        &self.triggered
    }

    pub(crate) fn restore(&mut self, score: Points, triggered: CiMap<bool>) {
        self.score = score;
        self.triggered = triggered;
    }
}
