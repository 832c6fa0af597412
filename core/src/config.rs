use serde::{Deserialize, Serialize};

use crate::{score::ScoreTable, timeblock::Timeblock, types::Points};

pub const DEFAULT_MAX_SCORE: Points = 965;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreEventConfig {
    pub name:   String,
    pub points: Points,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeblockEntryEvent {
    pub timeblock: Timeblock,
    pub event:     String,
}

#[derive(Debug, Clone, Deserialize)]
struct ScoreEventsFile {
    #[serde(default = "default_max_score")]
    max_score: Points,
    events: Vec<ScoreEventConfig>,
    #[serde(default)]
    timeblock_entry_events: Vec<TimeblockEntryEvent>,
    #[serde(default)]
    starting_timeblock: Option<Timeblock>,
}

fn default_max_score() -> Points {
    DEFAULT_MAX_SCORE
}

#[derive(Debug, Clone)]
pub struct ProgressConfig {
    pub max_score:          Points,
    pub score_table:        ScoreTable,
    pub starting_timeblock: Timeblock,
    /// Panic on transition/persistence contract violations instead of
    /// logging and ignoring them.
    pub strict_contracts:   bool,
}

impl ProgressConfig {
    /// Load from the data/ directory.
    /// In tests, use ProgressConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/scores/score_events.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: ScoreEventsFile = serde_json::from_str(&content)?;

        let mut score_table = ScoreTable::new();
        for event in &file.events {
            if score_table.points(&event.name).is_some() {
                log::warn!("{path}: duplicate score event '{}'", event.name);
            }
            score_table.insert_event(&event.name, event.points);
        }
        for entry in &file.timeblock_entry_events {
            if score_table.points(&entry.event).is_none() {
                anyhow::bail!(
                    "{path}: entry event '{}' for {} is not in the events table",
                    entry.event,
                    entry.timeblock
                );
            }
            score_table.insert_entry_event(entry.timeblock, &entry.event);
        }

        if score_table.total_points() > file.max_score {
            log::warn!(
                "{path}: events award {} points but max score is {}",
                score_table.total_points(),
                file.max_score
            );
        }
        log::info!("Loaded {} score events from {path}", score_table.len());

        Ok(Self {
            max_score: file.max_score,
            score_table,
            starting_timeblock: file.starting_timeblock.unwrap_or_default(),
            strict_contracts: cfg!(debug_assertions),
        })
    }

    /// Small in-code configuration for tests. Contract violations are
    /// reported as errors, not panics, so tests can observe them.
    pub fn default_test() -> Self {
        let opening = Timeblock::default();
        let score_table = ScoreTable::new()
            .with_event("e_110a_r25_tape", 5)
            .with_event("e_110a_lby_newspaper", 3)
            .with_event("e_sidney_translate_arcadia", 10)
            .with_event("e_207a_enter", 2)
            .with_event("e_finale", 900)
            .with_entry_event(
                Timeblock::new(2, 7).expect("207A is a valid timeblock"),
                "e_207a_enter",
            );

        Self {
            max_score: DEFAULT_MAX_SCORE,
            score_table,
            starting_timeblock: opening,
            strict_contracts: false,
        }
    }
}
