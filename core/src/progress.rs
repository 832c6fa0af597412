//! GameProgress: the single owner of mutable story state.
//!
//! One instance per session, created at startup and passed by reference to
//! the dialogue, game-flow and save/load collaborators. Nothing here is
//! global.
//!
//! RULES:
//!   - Lookups never fail. Absent counters read 0, absent flags read false.
//!   - Loads are all-or-nothing: the stream is fully parsed before any
//!     table is replaced.
//!   - Persisting while a timeblock transition is in flight is a contract
//!     violation, handled like any other (see `contract_violation`).
//!   - The event queue must be drained by the host (`drain_events`). It holds
//!     at most `MAX_PENDING_EVENTS`; past that the oldest events are dropped.

use std::{collections::VecDeque, sync::Arc};

use crate::{
    ci_map::{CiMap, CounterTable},
    config::ProgressConfig,
    counters::{InteractionCounts, InteractionKey},
    error::{ProgressError, ProgressResult},
    event::ProgressEvent,
    flags::FlagSet,
    persist::{section, PersistState},
    score::{ScoreChange, ScoreLedger},
    timeblock::Timeblock,
    transition::{PeriodTracker, TransitionKind, TransitionPhase, TransitionTicket},
    types::{Count, Points},
};

/// Undrained events kept before the oldest are discarded.
pub const MAX_PENDING_EVENTS: usize = 1024;

#[derive(Debug)]
pub struct GameProgress {
    config:           Arc<ProgressConfig>,
    ledger:           ScoreLedger,
    tracker:          PeriodTracker,
    flags:            FlagSet,
    chat_counts:      CounterTable,
    topic_counts:     InteractionCounts,
    noun_verb_counts: InteractionCounts,
    game_variables:   CounterTable,
    events:           VecDeque<ProgressEvent>,
}

impl GameProgress {
    pub fn new(config: ProgressConfig) -> Self {
        Self::with_shared_config(Arc::new(config))
    }

    pub fn with_shared_config(config: Arc<ProgressConfig>) -> Self {
        Self {
            ledger:           ScoreLedger::new(config.max_score),
            tracker:          PeriodTracker::new(config.starting_timeblock),
            flags:            FlagSet::new(),
            chat_counts:      CounterTable::new(),
            topic_counts:     InteractionCounts::new(),
            noun_verb_counts: InteractionCounts::new(),
            game_variables:   CounterTable::new(),
            events:           VecDeque::new(),
            config,
        }
    }

    pub fn config(&self) -> &ProgressConfig {
        &self.config
    }

    /// Take every event recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<ProgressEvent> {
        self.events.drain(..).collect()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    fn push_event(&mut self, event: ProgressEvent) {
        if self.events.len() >= MAX_PENDING_EVENTS {
            let dropped = self.events.pop_front();
            log::warn!("event queue full ({MAX_PENDING_EVENTS}), dropping oldest: {dropped:?}");
        }
        self.events.push_back(event);
    }

    /// Panic in strict mode; otherwise log, ignore, and hand the error back.
    fn contract_violation(&self, err: ProgressError) -> ProgressError {
        if self.config.strict_contracts {
            panic!("progress contract violation: {err}");
        }
        log::error!("ignored progress contract violation: {err}");
        err
    }

    // ── Score ──────────────────────────────────────────────────

    pub fn max_score(&self) -> Points {
        self.ledger.max_score()
    }

    pub fn score(&self) -> Points {
        self.ledger.score()
    }

    pub fn set_score(&mut self, score: Points) {
        let before = self.ledger.score();
        self.ledger.set_score(score);
        self.push_event(ProgressEvent::ScoreChanged {
            event:  None,
            points: score.saturating_sub(before),
            score,
        });
    }

    pub fn increase_score(&mut self, points: Points) {
        self.ledger.increase_score(points);
        self.push_event(ProgressEvent::ScoreChanged {
            event: None,
            points,
            score: self.ledger.score(),
        });
    }

    /// Award a named score event. At most once per event until reset.
    pub fn change_score(&mut self, event: &str) -> ScoreChange {
        let change = self.ledger.change_score(&self.config.score_table, event);
        match change {
            ScoreChange::Applied { points, score } => {
                self.push_event(ProgressEvent::ScoreChanged {
                    event: Some(event.to_string()),
                    points,
                    score,
                });
            }
            ScoreChange::UnknownEvent => {
                self.push_event(ProgressEvent::UnknownScoreEvent { event: event.to_string() });
            }
            ScoreChange::AlreadyTriggered => {}
        }
        change
    }

    pub fn is_score_event_triggered(&self, event: &str) -> bool {
        self.ledger.is_triggered(event)
    }

    pub fn reset_score_event(&mut self, event: &str) {
        self.ledger.reset_event(event);
    }

    // ── Timeblock ──────────────────────────────────────────────

    pub fn timeblock(&self) -> Timeblock {
        self.tracker.current()
    }

    /// None until the first transition.
    pub fn last_timeblock(&self) -> Option<Timeblock> {
        self.tracker.previous()
    }

    /// Jump straight to a timeblock without a transition. Debug use.
    /// Rejected while a transition is in flight.
    pub fn set_timeblock(&mut self, timeblock: Timeblock) -> ProgressResult<()> {
        if self.tracker.is_transitioning() {
            return Err(self.contract_violation(ProgressError::TransitionContract {
                operation: "set_timeblock",
                phase:     self.tracker.phase(),
            }));
        }
        self.tracker.set_current(timeblock);
        Ok(())
    }

    pub fn timeblock_display_name(&self) -> String {
        self.tracker.current().display_name()
    }

    pub fn display_name_for(&self, timeblock: &str) -> ProgressResult<String> {
        Ok(timeblock.parse::<Timeblock>()?.display_name())
    }

    pub fn is_changing_timeblock(&self) -> bool {
        self.tracker.is_transitioning()
    }

    pub fn transition_phase(&self) -> TransitionPhase {
        self.tracker.phase()
    }

    /// Begin tearing down the current timeblock. Only legal when idle.
    /// `callback` runs when the returned ticket is completed.
    pub fn end_current_timeblock<F>(&mut self, callback: F) -> ProgressResult<TransitionTicket>
    where
        F: FnOnce(&mut GameProgress) + 'static,
    {
        self.tracker
            .begin_end(Box::new(callback))
            .map_err(|e| self.contract_violation(e))
    }

    /// Enter `timeblock`. Legal when idle or after an end has completed.
    /// With `loading_save`, first-entry side effects are skipped.
    pub fn start_timeblock<F>(
        &mut self,
        timeblock: Timeblock,
        loading_save: bool,
        callback: F,
    ) -> ProgressResult<TransitionTicket>
    where
        F: FnOnce(&mut GameProgress) + 'static,
    {
        let ticket = self
            .tracker
            .begin_start(timeblock, loading_save, Box::new(callback))
            .map_err(|e| self.contract_violation(e))?;
        log::debug!(
            "timeblock: starting {} (previous {:?}, loading_save={loading_save})",
            self.tracker.current(),
            self.tracker.previous().map(|t| t.to_string())
        );
        Ok(ticket)
    }

    /// Signal that the work behind `ticket` is done and run its callback.
    pub fn complete_transition(&mut self, ticket: TransitionTicket) -> ProgressResult<()> {
        let callback = self
            .tracker
            .finish(&ticket)
            .map_err(|e| self.contract_violation(e))?;

        match ticket.kind() {
            TransitionKind::End => {
                self.push_event(ProgressEvent::TimeblockEnded { timeblock: ticket.timeblock() });
            }
            TransitionKind::Start { loading_save } => {
                if !loading_save {
                    let entry = self
                        .config
                        .score_table
                        .entry_event(ticket.timeblock())
                        .map(str::to_owned);
                    if let Some(event) = entry {
                        self.change_score(&event);
                    }
                }
                self.push_event(ProgressEvent::TimeblockStarted {
                    timeblock: ticket.timeblock(),
                    previous: self.tracker.previous(),
                    loading_save,
                });
            }
        }

        callback(self);
        Ok(())
    }

    // ── Flags ──────────────────────────────────────────────────

    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name)
    }

    pub fn set_flag(&mut self, name: &str) {
        if self.flags.set(name) {
            self.push_event(ProgressEvent::FlagChanged { flag: name.to_string(), value: true });
        }
    }

    pub fn clear_flag(&mut self, name: &str) {
        if self.flags.clear(name) {
            self.push_event(ProgressEvent::FlagChanged { flag: name.to_string(), value: false });
        }
    }

    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }

    pub fn dump_flags(&self) {
        self.flags.dump("game");
    }

    // ── Game variables ─────────────────────────────────────────

    pub fn game_variable(&self, name: &str) -> Count {
        self.game_variables.count(name)
    }

    pub fn set_game_variable(&mut self, name: &str, value: Count) {
        self.game_variables.set_count(name, value);
    }

    pub fn inc_game_variable(&mut self, name: &str) -> Count {
        self.game_variables.increment(name)
    }

    // ── Chat counts ────────────────────────────────────────────

    pub fn chat_count(&self, noun: &str) -> Count {
        self.chat_counts.count(noun)
    }

    pub fn set_chat_count(&mut self, noun: &str, count: Count) {
        self.chat_counts.set_count(noun, count);
    }

    pub fn inc_chat_count(&mut self, noun: &str) -> Count {
        self.chat_counts.increment(noun)
    }

    // ── Topic counts ───────────────────────────────────────────

    pub fn topic_count(&self, noun: &str, topic: &str) -> Count {
        self.topic_counts.get(&InteractionKey::global(noun, topic))
    }

    pub fn actor_topic_count(&self, actor: &str, noun: &str, topic: &str) -> Count {
        self.topic_counts.get(&InteractionKey::for_actor(actor, noun, topic))
    }

    pub fn set_topic_count(&mut self, noun: &str, topic: &str, count: Count) {
        self.topic_counts.set(&InteractionKey::global(noun, topic), count);
    }

    pub fn set_actor_topic_count(&mut self, actor: &str, noun: &str, topic: &str, count: Count) {
        self.topic_counts.set(&InteractionKey::for_actor(actor, noun, topic), count);
    }

    pub fn inc_topic_count(&mut self, noun: &str, topic: &str) -> Count {
        self.topic_counts.increment(&InteractionKey::global(noun, topic))
    }

    pub fn inc_actor_topic_count(&mut self, actor: &str, noun: &str, topic: &str) -> Count {
        self.topic_counts.increment(&InteractionKey::for_actor(actor, noun, topic))
    }

    pub fn topic_counts(&self) -> &InteractionCounts {
        &self.topic_counts
    }

    // ── Noun/verb counts ───────────────────────────────────────

    pub fn noun_verb_count(&self, noun: &str, verb: &str) -> Count {
        self.noun_verb_counts.get(&InteractionKey::global(noun, verb))
    }

    pub fn actor_noun_verb_count(&self, actor: &str, noun: &str, verb: &str) -> Count {
        self.noun_verb_counts.get(&InteractionKey::for_actor(actor, noun, verb))
    }

    pub fn set_noun_verb_count(&mut self, noun: &str, verb: &str, count: Count) {
        self.noun_verb_counts.set(&InteractionKey::global(noun, verb), count);
    }

    pub fn set_actor_noun_verb_count(&mut self, actor: &str, noun: &str, verb: &str, count: Count) {
        self.noun_verb_counts.set(&InteractionKey::for_actor(actor, noun, verb), count);
    }

    pub fn inc_noun_verb_count(&mut self, noun: &str, verb: &str) -> Count {
        self.noun_verb_counts.increment(&InteractionKey::global(noun, verb))
    }

    pub fn inc_actor_noun_verb_count(&mut self, actor: &str, noun: &str, verb: &str) -> Count {
        self.noun_verb_counts.increment(&InteractionKey::for_actor(actor, noun, verb))
    }

    pub fn noun_verb_counts(&self) -> &InteractionCounts {
        &self.noun_verb_counts
    }

    // ── Persistence ────────────────────────────────────────────

    /// Write to or read from `ps`, depending on its mode.
    ///
    /// Works on copies and only swaps them in after every section has been
    /// read, so a failed load leaves the current state untouched.
    pub fn on_persist(&mut self, ps: &mut PersistState) -> ProgressResult<()> {
        if self.tracker.is_transitioning() {
            return Err(self.contract_violation(ProgressError::TransitionContract {
                operation: "on_persist",
                phase:     self.tracker.phase(),
            }));
        }

        let mut score = self.ledger.score();
        let mut triggered: CiMap<bool> = self.ledger.triggered().clone();
        let mut current = self.tracker.current();
        let mut previous = self.tracker.previous();
        let mut flags = self.flags.table().clone();
        let mut chat_counts = self.chat_counts.clone();
        let mut topic_counts = self.topic_counts.table().clone();
        let mut noun_verb_counts = self.noun_verb_counts.table().clone();
        let mut game_variables = self.game_variables.clone();

        ps.xfer_value(section::SCORE, &mut score)?;
        ps.xfer_table(section::SCORE_EVENT_FLAGS, &mut triggered)?;
        ps.xfer_value(section::CURRENT_PERIOD, &mut current)?;
        ps.xfer_value(section::PREVIOUS_PERIOD, &mut previous)?;
        ps.xfer_table(section::FLAGS, &mut flags)?;
        ps.xfer_table(section::CHAT_COUNTS, &mut chat_counts)?;
        ps.xfer_table(section::TOPIC_COUNTS, &mut topic_counts)?;
        ps.xfer_table(section::NOUN_VERB_COUNTS, &mut noun_verb_counts)?;
        ps.xfer_table(section::GAME_VARIABLES, &mut game_variables)?;

        if ps.is_loading() {
            self.ledger.restore(score, triggered);
            self.tracker.restore(current, previous);
            self.flags.replace(flags);
            self.chat_counts = chat_counts;
            self.topic_counts.replace(topic_counts);
            self.noun_verb_counts.replace(noun_verb_counts);
            self.game_variables = game_variables;
        }
        Ok(())
    }

    /// Serialize the full progress state to a save payload.
    pub fn save(&mut self) -> ProgressResult<String> {
        let mut ps = PersistState::for_save();
        self.on_persist(&mut ps)?;
        ps.into_payload()
    }

    /// Replace the full progress state from a save payload.
    pub fn load(&mut self, payload: &str) -> ProgressResult<()> {
        let mut ps = PersistState::for_load(payload)?;
        let version = ps.version();
        self.on_persist(&mut ps)?;
        let skipped = ps.finish_load();
        log::info!(
            "Loaded progress v{version}: score {}/{}, timeblock {} ({skipped} unknown sections skipped)",
            self.score(),
            self.max_score(),
            self.timeblock()
        );
        self.push_event(ProgressEvent::ProgressLoaded { version });
        Ok(())
    }
}
