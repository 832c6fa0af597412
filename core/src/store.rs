//! SQLite save-slot storage.
//!
//! RULE: Only store.rs talks to the database.
//! The payload column holds the JSON produced by `GameProgress::save`;
//! the other columns are denormalised for the load menu.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::{
    error::{ProgressError, ProgressResult},
    persist::SAVE_FORMAT_VERSION,
    progress::GameProgress,
    types::Points,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveSlotInfo {
    pub slot:      String,
    pub version:   u32,
    pub timeblock: String,
    pub score:     Points,
    pub saved_at:  DateTime<Utc>,
}

pub struct SaveStore {
    conn: Connection,
}

impl SaveStore {
    /// Open (or create) the save database at `path`.
    pub fn open(path: &str) -> ProgressResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only matters for real files; in-memory databases ignore it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ProgressResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ProgressResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_saves.sql"))?;
        Ok(())
    }

    // ── Write ──────────────────────────────────────────────────

    /// Serialize `progress` into `slot`, replacing whatever was there.
    pub fn save_progress(&self, slot: &str, progress: &mut GameProgress) -> ProgressResult<()> {
        let payload = progress.save()?;
        self.conn.execute(
            "INSERT OR REPLACE INTO save_slot (slot, version, timeblock, score, saved_at, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                slot,
                SAVE_FORMAT_VERSION,
                progress.timeblock().to_string(),
                progress.score(),
                Utc::now().to_rfc3339(),
                payload,
            ],
        )?;
        log::info!("Saved progress to slot '{slot}' ({} bytes)", payload.len());
        Ok(())
    }

    pub fn delete_slot(&self, slot: &str) -> ProgressResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM save_slot WHERE slot = ?1", params![slot])?;
        Ok(removed > 0)
    }

    // ── Read ───────────────────────────────────────────────────

    pub fn read_payload(&self, slot: &str) -> ProgressResult<Option<String>> {
        let payload = self
            .conn
            .query_row(
                "SELECT payload FROM save_slot WHERE slot = ?1",
                params![slot],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(payload)
    }

    /// Replace `progress` with the contents of `slot`.
    /// On any failure `progress` is left as it was.
    pub fn load_progress(&self, slot: &str, progress: &mut GameProgress) -> ProgressResult<()> {
        let payload = self
            .read_payload(slot)?
            .ok_or_else(|| ProgressError::SlotNotFound { slot: slot.to_string() })?;
        progress.load(&payload)
    }

    /// All slots, most recently saved first.
    pub fn list_slots(&self) -> ProgressResult<Vec<SaveSlotInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT slot, version, timeblock, score, saved_at
             FROM save_slot ORDER BY saved_at DESC, slot ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Points>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(slot, version, timeblock, score, saved_at)| -> ProgressResult<SaveSlotInfo> {
                let saved_at = DateTime::parse_from_rfc3339(&saved_at)
                    .map_err(|e| anyhow::anyhow!("Bad saved_at for slot {slot}: {e}"))?
                    .with_timezone(&Utc);
                Ok(SaveSlotInfo { slot, version, timeblock, score, saved_at })
            })
            .collect()
    }
}
