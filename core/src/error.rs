use thiserror::Error;

use crate::transition::TransitionPhase;

#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid timeblock '{0}'")]
    InvalidTimeblock(String),

    #[error("Save is missing required section '{name}'")]
    MissingSection { name: &'static str },

    #[error("Save section '{name}' is corrupt: {reason}")]
    CorruptSection { name: String, reason: String },

    #[error("Not a progress save (format '{0}')")]
    UnsupportedFormat(String),

    #[error("Save is v{found}, but this build only supports up to v{supported}")]
    VersionMismatch { supported: u32, found: u32 },

    #[error("{operation} called during {phase:?}")]
    TransitionContract {
        operation: &'static str,
        phase: TransitionPhase,
    },

    #[error("Transition ticket {ticket} does not match the pending transition")]
    StaleTicket { ticket: u64 },

    #[error("Save slot '{slot}' not found")]
    SlotNotFound { slot: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ProgressResult<T> = Result<T, ProgressError>;
