//! Timeblock transition state machine.
//!
//! PHASES:
//!   Idle ──end──▶ EndingTimeblock ──complete──▶ AwaitingStart
//!   Idle | AwaitingStart ──start──▶ StartingTimeblock ──complete──▶ Idle
//!
//! The teardown/setup work (fades, scene unloads, title cards) belongs to
//! the game-flow controller. Each begin call hands out a `TransitionTicket`;
//! the controller returns it through `GameProgress::complete_transition`
//! when that work is done, which fires the stored callback exactly once.
//! Tickets cannot be cloned, so a transition cannot be completed twice.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::{ProgressError, ProgressResult},
    progress::GameProgress,
    timeblock::Timeblock,
};

/// Continuation run when a transition completes.
pub type TransitionCallback = Box<dyn FnOnce(&mut GameProgress)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPhase {
    Idle,
    EndingTimeblock,
    AwaitingStart,
    StartingTimeblock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    End,
    Start { loading_save: bool },
}

/// Proof that a transition is in flight.
#[must_use = "return the ticket with complete_transition() once the work is done"]
#[derive(Debug, PartialEq, Eq)]
pub struct TransitionTicket {
    id:        u64,
    kind:      TransitionKind,
    timeblock: Timeblock,
}

impl TransitionTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> TransitionKind {
        self.kind
    }

    /// The timeblock being left (end) or entered (start).
    pub fn timeblock(&self) -> Timeblock {
        self.timeblock
    }

    pub fn loading_save(&self) -> bool {
        matches!(self.kind, TransitionKind::Start { loading_save: true })
    }
}

struct Pending {
    id:        u64,
    kind:      TransitionKind,
    timeblock: Timeblock,
    callback:  TransitionCallback,
}

pub struct PeriodTracker {
    current:     Timeblock,
    previous:    Option<Timeblock>,
    phase:       TransitionPhase,
    pending:     Option<Pending>,
    next_ticket: u64,
}

impl fmt::Debug for PeriodTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodTracker")
            .field("current", &self.current)
            .field("previous", &self.previous)
            .field("phase", &self.phase)
            .field("pending", &self.pending.as_ref().map(|p| p.id))
            .finish()
    }
}

impl PeriodTracker {
    pub fn new(start: Timeblock) -> Self {
        Self {
            current: start,
            previous: None,
            phase: TransitionPhase::Idle,
            pending: None,
            next_ticket: 1,
        }
    }

    pub fn current(&self) -> Timeblock {
        self.current
    }

    pub fn previous(&self) -> Option<Timeblock> {
        self.previous
    }

    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    pub fn is_transitioning(&self) -> bool {
        self.phase != TransitionPhase::Idle
    }

    fn issue(&mut self, kind: TransitionKind, callback: TransitionCallback) -> TransitionTicket {
        let id = self.next_ticket;
        self.next_ticket += 1;
        let timeblock = self.current;
        self.pending = Some(Pending { id, kind, timeblock, callback });
        TransitionTicket { id, kind, timeblock }
    }

    fn violation(&self, operation: &'static str) -> ProgressError {
        ProgressError::TransitionContract { operation, phase: self.phase }
    }

    pub(crate) fn begin_end(
        &mut self,
        callback: TransitionCallback,
    ) -> ProgressResult<TransitionTicket> {
        if self.phase != TransitionPhase::Idle {
            return Err(self.violation("end_current_timeblock"));
        }
        self.phase = TransitionPhase::EndingTimeblock;
        Ok(self.issue(TransitionKind::End, callback))
    }

    pub(crate) fn begin_start(
        &mut self,
        timeblock: Timeblock,
        loading_save: bool,
        callback: TransitionCallback,
    ) -> ProgressResult<TransitionTicket> {
        match self.phase {
            TransitionPhase::Idle | TransitionPhase::AwaitingStart => {}
            _ => return Err(self.violation("start_timeblock")),
        }

        // A restored save already made this block current; shifting would
        // overwrite the restored previous value.
        let restoring_same = loading_save && timeblock == self.current;
        if !restoring_same {
            self.previous = Some(self.current);
            self.current = timeblock;
        }
        self.phase = TransitionPhase::StartingTimeblock;
        Ok(self.issue(TransitionKind::Start { loading_save }, callback))
    }

    /// Close the pending transition. Returns its callback for the caller to run.
    ///
    /// Ids restart in every tracker, so a ticket must match the pending
    /// transition on id, kind and timeblock. The next phase comes from the
    /// pending record, never from the ticket.
    pub(crate) fn finish(
        &mut self,
        ticket: &TransitionTicket,
    ) -> ProgressResult<TransitionCallback> {
        let pending = match self.pending.take() {
            Some(p)
                if p.id == ticket.id
                    && p.kind == ticket.kind
                    && p.timeblock == ticket.timeblock =>
            {
                p
            }
            other => {
                self.pending = other;
                return Err(ProgressError::StaleTicket { ticket: ticket.id });
            }
        };

        self.phase = match pending.kind {
            TransitionKind::End => TransitionPhase::AwaitingStart,
            TransitionKind::Start { .. } => TransitionPhase::Idle,
        };
        Ok(pending.callback)
    }

    /// Direct assignment with no transition. Leaves `previous` alone.
    pub(crate) fn set_current(&mut self, timeblock: Timeblock) {
        self.current = timeblock;
    }

    pub(crate) fn restore(&mut self, current: Timeblock, previous: Option<Timeblock>) {
        self.current = current;
        self.previous = previous;
    }
}
