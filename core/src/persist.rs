//! Save-file codec.
//!
//! A save is a JSON `SaveDocument`: a format tag, a version, and an ordered
//! list of named sections. Each section is either a single value or a table
//! written as an explicit count followed by that many `[key, value]` pairs.
//!
//! `PersistState` is bidirectional: the same sequence of `xfer_*` calls
//! writes a save (mode `Save`) or reads one back (mode `Load`).
//!
//! SECTION ORDER (part of the format, bump SAVE_FORMAT_VERSION to change):
//!   Score, ScoreEventFlags, CurrentPeriod, PreviousPeriod, Flags,
//!   ChatCounts, TopicCounts, NounVerbCounts, GameVariables
//!
//! On load, sections the reader does not ask for are skipped with a warning.
//! A section that is asked for but absent fails the whole load.

use std::collections::VecDeque;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ci_map::CiMap,
    error::{ProgressError, ProgressResult},
};

pub const SAVE_FORMAT: &str = "gk-progress";
pub const SAVE_FORMAT_VERSION: u32 = 1;

pub mod section {
    pub const SCORE: &str = "Score";
    pub const SCORE_EVENT_FLAGS: &str = "ScoreEventFlags";
    pub const CURRENT_PERIOD: &str = "CurrentPeriod";
    pub const PREVIOUS_PERIOD: &str = "PreviousPeriod";
    pub const FLAGS: &str = "Flags";
    pub const CHAT_COUNTS: &str = "ChatCounts";
    pub const TOPIC_COUNTS: &str = "TopicCounts";
    pub const NOUN_VERB_COUNTS: &str = "NounVerbCounts";
    pub const GAME_VARIABLES: &str = "GameVariables";

    pub const ORDER: [&str; 9] = [
        SCORE,
        SCORE_EVENT_FLAGS,
        CURRENT_PERIOD,
        PREVIOUS_PERIOD,
        FLAGS,
        CHAT_COUNTS,
        TOPIC_COUNTS,
        NOUN_VERB_COUNTS,
        GAME_VARIABLES,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDocument {
    pub format:   String,
    pub version:  u32,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Section {
    Value {
        name:  String,
        value: Value,
    },
    Table {
        name:    String,
        count:   usize,
        entries: Vec<(String, Value)>,
    },
}

impl Section {
    pub fn name(&self) -> &str {
        match self {
            Section::Value { name, .. } | Section::Table { name, .. } => name,
        }
    }
}

/// Just enough of the document to check format and version before
/// committing to the full parse.
#[derive(Deserialize)]
struct DocumentHeader {
    format:  String,
    version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistMode {
    Save,
    Load,
}

#[derive(Debug)]
pub struct PersistState {
    mode:     PersistMode,
    version:  u32,
    sections: VecDeque<Section>,
    skipped:  usize,
}

fn corrupt(name: &str, reason: impl ToString) -> ProgressError {
    ProgressError::CorruptSection {
        name:   name.to_string(),
        reason: reason.to_string(),
    }
}

impl PersistState {
    pub fn for_save() -> Self {
        Self {
            mode:     PersistMode::Save,
            version:  SAVE_FORMAT_VERSION,
            sections: VecDeque::new(),
            skipped:  0,
        }
    }

    pub fn for_load(payload: &str) -> ProgressResult<Self> {
        let header: DocumentHeader = serde_json::from_str(payload)?;
        if header.format != SAVE_FORMAT {
            return Err(ProgressError::UnsupportedFormat(header.format));
        }
        if header.version > SAVE_FORMAT_VERSION {
            return Err(ProgressError::VersionMismatch {
                supported: SAVE_FORMAT_VERSION,
                found:     header.version,
            });
        }

        let doc: SaveDocument = serde_json::from_str(payload)?;
        Ok(Self {
            mode:     PersistMode::Load,
            version:  doc.version,
            sections: doc.sections.into(),
            skipped:  0,
        })
    }

    pub fn mode(&self) -> PersistMode {
        self.mode
    }

    pub fn is_loading(&self) -> bool {
        self.mode == PersistMode::Load
    }

    /// Format version of the stream being read or written.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Pop sections until `name` turns up. Anything passed over is unknown.
    fn next_section(&mut self, name: &'static str) -> ProgressResult<Section> {
        while let Some(section) = self.sections.pop_front() {
            if section.name() == name {
                return Ok(section);
            }
            log::warn!("save: skipping unknown section '{}'", section.name());
            self.skipped += 1;
        }
        Err(ProgressError::MissingSection { name })
    }

    /// Transfer a single value.
    pub fn xfer_value<T>(&mut self, name: &'static str, value: &mut T) -> ProgressResult<()>
    where
        T: Serialize + DeserializeOwned,
    {
        match self.mode {
            PersistMode::Save => {
                self.sections.push_back(Section::Value {
                    name:  name.to_string(),
                    value: serde_json::to_value(&*value)?,
                });
            }
            PersistMode::Load => match self.next_section(name)? {
                Section::Value { value: raw, .. } => {
                    *value = serde_json::from_value(raw).map_err(|e| corrupt(name, e))?;
                }
                Section::Table { .. } => return Err(corrupt(name, "expected a value, found a table")),
            },
        }
        Ok(())
    }

    /// Transfer a whole table. On load the table is replaced, never merged.
    pub fn xfer_table<V>(&mut self, name: &'static str, table: &mut CiMap<V>) -> ProgressResult<()>
    where
        V: Serialize + DeserializeOwned,
    {
        match self.mode {
            PersistMode::Save => {
                let entries = table
                    .iter()
                    .map(|(k, v)| -> ProgressResult<(String, Value)> {
                        Ok((k.to_string(), serde_json::to_value(v)?))
                    })
                    .collect::<ProgressResult<Vec<_>>>()?;
                self.sections.push_back(Section::Table {
                    name: name.to_string(),
                    count: entries.len(),
                    entries,
                });
            }
            PersistMode::Load => match self.next_section(name)? {
                Section::Table { count, entries, .. } => {
                    if count != entries.len() {
                        return Err(corrupt(
                            name,
                            format!("count {count} but {} entries", entries.len()),
                        ));
                    }
                    let mut loaded = CiMap::new();
                    for (key, raw) in entries {
                        let v = serde_json::from_value(raw)
                            .map_err(|e| corrupt(name, format!("entry '{key}': {e}")))?;
                        loaded.insert(&key, v);
                    }
                    *table = loaded;
                }
                Section::Value { .. } => return Err(corrupt(name, "expected a table, found a value")),
            },
        }
        Ok(())
    }

    /// Serialize everything written so far.
    pub fn into_payload(self) -> ProgressResult<String> {
        if self.mode != PersistMode::Save {
            return Err(anyhow::anyhow!("into_payload() called on a load stream").into());
        }
        let doc = SaveDocument {
            format:   SAVE_FORMAT.to_string(),
            version:  self.version,
            sections: self.sections.into(),
        };
        Ok(serde_json::to_string(&doc)?)
    }

    /// Finish a load. Returns how many unknown sections were skipped.
    pub fn finish_load(mut self) -> usize {
        for section in self.sections.drain(..) {
            log::warn!("save: skipping unknown trailing section '{}'", section.name());
            self.skipped += 1;
        }
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_sample() -> String {
        let mut ps = PersistState::for_save();
        let mut score = 42;
        let mut flags = CiMap::new();
        flags.insert("ArcadiaComplete", true);
        ps.xfer_value(section::SCORE, &mut score).unwrap();
        ps.xfer_table(section::FLAGS, &mut flags).unwrap();
        ps.into_payload().unwrap()
    }

    #[test]
    fn tables_are_written_with_explicit_counts() {
        let payload = write_sample();
        let doc: SaveDocument = serde_json::from_str(&payload).unwrap();
        assert_eq!(doc.format, SAVE_FORMAT);
        assert_eq!(doc.version, SAVE_FORMAT_VERSION);
        assert_eq!(doc.sections.len(), 2);
        match &doc.sections[1] {
            Section::Table { name, count, entries } => {
                assert_eq!(name, section::FLAGS);
                assert_eq!(*count, 1);
                assert_eq!(entries[0].0, "ArcadiaComplete");
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn reader_replays_the_same_calls() {
        let payload = write_sample();
        let mut ps = PersistState::for_load(&payload).unwrap();
        let mut score = 0;
        let mut flags: CiMap<bool> = CiMap::new();
        flags.insert("Stale", true);
        ps.xfer_value(section::SCORE, &mut score).unwrap();
        ps.xfer_table(section::FLAGS, &mut flags).unwrap();
        assert_eq!(score, 42);
        assert_eq!(flags.get("arcadiacomplete"), Some(&true));
        assert!(flags.get("Stale").is_none(), "load must replace, not merge");
        assert_eq!(ps.finish_load(), 0);
    }

    #[test]
    fn unknown_sections_are_skipped() {
        let payload = r#"{"format":"gk-progress","version":1,"sections":[
            {"kind":"value","name":"FutureThing","value":[1,2,3]},
            {"kind":"value","name":"Score","value":7},
            {"kind":"table","name":"Trailing","count":0,"entries":[]}
        ]}"#;
        let mut ps = PersistState::for_load(payload).unwrap();
        let mut score = 0;
        ps.xfer_value(section::SCORE, &mut score).unwrap();
        assert_eq!(score, 7);
        assert_eq!(ps.finish_load(), 2);
    }

    #[test]
    fn missing_section_is_an_error() {
        let payload = r#"{"format":"gk-progress","version":1,"sections":[]}"#;
        let mut ps = PersistState::for_load(payload).unwrap();
        let mut score = 0;
        let err = ps.xfer_value(section::SCORE, &mut score).unwrap_err();
        assert!(matches!(err, ProgressError::MissingSection { name: "Score" }));
    }

    #[test]
    fn count_mismatch_is_corrupt() {
        let payload = r#"{"format":"gk-progress","version":1,"sections":[
            {"kind":"table","name":"Flags","count":3,"entries":[["a",true]]}
        ]}"#;
        let mut ps = PersistState::for_load(payload).unwrap();
        let mut flags: CiMap<bool> = CiMap::new();
        let err = ps.xfer_table(section::FLAGS, &mut flags).unwrap_err();
        assert!(matches!(err, ProgressError::CorruptSection { .. }));
    }

    #[test]
    fn newer_version_is_rejected() {
        let payload = r#"{"format":"gk-progress","version":99,"sections":[]}"#;
        let err = PersistState::for_load(payload).unwrap_err();
        assert!(matches!(err, ProgressError::VersionMismatch { supported: 1, found: 99 }));
    }

    #[test]
    fn foreign_format_is_rejected() {
        let payload = r#"{"format":"megacity","version":1,"sections":[]}"#;
        let err = PersistState::for_load(payload).unwrap_err();
        assert!(matches!(err, ProgressError::UnsupportedFormat(_)));
    }
}
