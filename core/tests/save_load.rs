//! Persistence tests.
//!
//! Tests cover: full round-trip through the save codec, the fixed section
//! order, all-or-nothing loads, unknown-section skipping, the
//! no-persist-while-transitioning rule, and SQLite save slots.

use progress_core::{
    config::ProgressConfig,
    error::ProgressError,
    event::ProgressEvent,
    persist::{section, SaveDocument, SAVE_FORMAT_VERSION},
    progress::GameProgress,
    store::SaveStore,
    timeblock::Timeblock,
};

fn tb(code: &str) -> Timeblock {
    code.parse().expect("valid timeblock")
}

fn fresh() -> GameProgress {
    GameProgress::new(ProgressConfig::default_test())
}

/// A mid-game state touching every persisted table.
fn populated() -> GameProgress {
    let mut progress = fresh();
    let ticket = progress.start_timeblock(tb("206P"), false, |_| {}).unwrap();
    progress.complete_transition(ticket).unwrap();

    progress.change_score("e_110a_r25_tape");
    progress.change_score("e_sidney_translate_arcadia");
    progress.set_flag("ArcadiaComplete");
    progress.set_flag("MetMosely");
    progress.set_chat_count("Mosely", 3);
    progress.inc_topic_count("door", "lock");
    progress.set_actor_topic_count("john", "door", "lock", 4);
    progress.set_noun_verb_count("Tape", "Pickup", 1);
    progress.set_actor_noun_verb_count("Gabe", "Door", "Open", 2);
    progress.set_game_variable("CluesFound", 12);
    progress.drain_events();
    progress
}

fn assert_same_state(a: &GameProgress, b: &GameProgress) {
    assert_eq!(a.score(), b.score());
    assert_eq!(a.timeblock(), b.timeblock());
    assert_eq!(a.last_timeblock(), b.last_timeblock());
    assert_eq!(
        a.flags().set_flags().collect::<Vec<_>>(),
        b.flags().set_flags().collect::<Vec<_>>()
    );
    for event in ["e_110a_r25_tape", "e_sidney_translate_arcadia", "e_finale"] {
        assert_eq!(a.is_score_event_triggered(event), b.is_score_event_triggered(event));
    }
    assert_eq!(a.chat_count("mosely"), b.chat_count("mosely"));
    assert_eq!(a.topic_count("door", "lock"), b.topic_count("door", "lock"));
    assert_eq!(
        a.actor_topic_count("john", "door", "lock"),
        b.actor_topic_count("john", "door", "lock")
    );
    assert_eq!(a.noun_verb_count("tape", "pickup"), b.noun_verb_count("tape", "pickup"));
    assert_eq!(
        a.actor_noun_verb_count("gabe", "door", "open"),
        b.actor_noun_verb_count("gabe", "door", "open")
    );
    assert_eq!(a.game_variable("cluesfound"), b.game_variable("cluesfound"));
}

#[test]
fn round_trip_restores_every_table() {
    let mut original = populated();
    let payload = original.save().unwrap();

    let mut restored = fresh();
    restored.load(&payload).unwrap();

    assert_same_state(&original, &restored);
    assert_eq!(restored.score(), 15);
    assert_eq!(restored.timeblock(), tb("206P"));
    assert_eq!(restored.last_timeblock(), Some(tb("110A")));
    assert_eq!(restored.actor_topic_count("JOHN", "DOOR", "LOCK"), 4);

    // Saving the restored state reproduces the same bytes.
    assert_eq!(restored.save().unwrap(), payload);
}

#[test]
fn load_replaces_instead_of_merging() {
    let mut source = populated();
    let payload = source.save().unwrap();

    let mut target = fresh();
    target.set_flag("OnlyInTarget");
    target.set_game_variable("OnlyInTarget", 7);
    target.change_score("e_finale");
    target.load(&payload).unwrap();

    assert!(!target.flag("OnlyInTarget"));
    assert_eq!(target.game_variable("OnlyInTarget"), 0);
    assert!(!target.is_score_event_triggered("e_finale"));
    assert_same_state(&source, &target);
}

#[test]
fn restored_events_cannot_score_twice() {
    let mut source = populated();
    let payload = source.save().unwrap();

    let mut target = fresh();
    target.load(&payload).unwrap();
    target.change_score("e_110a_r25_tape");
    assert_eq!(target.score(), 15);
}

#[test]
fn sections_are_written_in_fixed_order() {
    let mut progress = populated();
    let payload = progress.save().unwrap();
    let doc: SaveDocument = serde_json::from_str(&payload).unwrap();

    assert_eq!(doc.version, SAVE_FORMAT_VERSION);
    let names: Vec<_> = doc.sections.iter().map(|s| s.name()).collect();
    assert_eq!(names, section::ORDER.to_vec());
}

#[test]
fn fresh_game_saves_null_previous_period() {
    let mut progress = fresh();
    let payload = progress.save().unwrap();
    let mut restored = fresh();
    restored.set_timeblock(tb("305P")).unwrap();
    restored.load(&payload).unwrap();
    assert_eq!(restored.last_timeblock(), None);
    assert_eq!(restored.timeblock(), tb("110A"));
}

#[test]
fn missing_section_fails_and_leaves_state_untouched() {
    let mut source = populated();
    let payload = source.save().unwrap();
    let mut doc: SaveDocument = serde_json::from_str(&payload).unwrap();
    doc.sections.retain(|s| s.name() != section::NOUN_VERB_COUNTS);
    let broken = serde_json::to_string(&doc).unwrap();

    let mut target = fresh();
    target.set_flag("KeepMe");
    target.change_score("e_110a_r25_tape");
    let err = target.load(&broken).unwrap_err();

    assert!(matches!(err, ProgressError::MissingSection { name: "NounVerbCounts" }));
    assert!(target.flag("KeepMe"));
    assert!(!target.flag("ArcadiaComplete"));
    assert_eq!(target.score(), 5);
    assert_eq!(target.timeblock(), tb("110A"));
}

#[test]
fn unknown_sections_are_skipped() {
    let mut source = populated();
    let payload = source.save().unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&payload).unwrap();
    let sections = value["sections"].as_array_mut().unwrap();
    sections.insert(
        2,
        serde_json::json!({ "kind": "table", "name": "InventoryFromTheFuture", "count": 1,
                            "entries": [["tape", 1]] }),
    );
    sections.push(serde_json::json!({ "kind": "value", "name": "Trailer", "value": "x" }));
    value["future_field"] = serde_json::json!(true);

    let mut target = fresh();
    target.load(&value.to_string()).unwrap();
    assert_same_state(&source, &target);
}

#[test]
fn garbage_and_future_saves_are_rejected() {
    let mut target = fresh();
    target.set_flag("KeepMe");

    assert!(matches!(target.load("not json"), Err(ProgressError::Serialization(_))));
    let future = format!(
        r#"{{"format":"gk-progress","version":{},"sections":[]}}"#,
        SAVE_FORMAT_VERSION + 1
    );
    assert!(matches!(target.load(&future), Err(ProgressError::VersionMismatch { .. })));
    assert!(target.flag("KeepMe"));
}

#[test]
fn wrong_value_type_is_corrupt() {
    let mut source = populated();
    let payload = source.save().unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&payload).unwrap();
    value["sections"][0]["value"] = serde_json::json!("lots");

    let mut target = fresh();
    let err = target.load(&value.to_string()).unwrap_err();
    assert!(matches!(err, ProgressError::CorruptSection { .. }));
    assert_eq!(target.score(), 0);
}

#[test]
fn persisting_mid_transition_is_rejected() {
    let mut progress = populated();
    let ticket = progress.end_current_timeblock(|_| {}).unwrap();

    assert!(matches!(progress.save(), Err(ProgressError::TransitionContract { .. })));

    progress.complete_transition(ticket).unwrap();
    assert!(progress.save().is_err(), "still transitioning until the start completes");

    let ticket = progress.start_timeblock(tb("207A"), false, |_| {}).unwrap();
    progress.complete_transition(ticket).unwrap();
    assert!(progress.save().is_ok());
}

#[test]
fn load_reports_an_event() {
    let mut source = populated();
    let payload = source.save().unwrap();
    let mut target = fresh();
    target.load(&payload).unwrap();
    assert_eq!(
        target.drain_events(),
        vec![ProgressEvent::ProgressLoaded { version: SAVE_FORMAT_VERSION }]
    );
}

// ── Save slots ─────────────────────────────────────────────────

fn store() -> SaveStore {
    let store = SaveStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

#[test]
fn slot_round_trip() {
    let store = store();
    let mut original = populated();
    store.save_progress("quicksave", &mut original).unwrap();

    let mut restored = fresh();
    store.load_progress("QuickSave".to_lowercase().as_str(), &mut restored).unwrap();
    assert_same_state(&original, &restored);

    let slots = store.list_slots().unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].slot, "quicksave");
    assert_eq!(slots[0].timeblock, "206P");
    assert_eq!(slots[0].score, 15);
    assert_eq!(slots[0].version, SAVE_FORMAT_VERSION);
}

#[test]
fn saving_a_slot_twice_overwrites_it() {
    let store = store();
    let mut progress = populated();
    store.save_progress("slot1", &mut progress).unwrap();
    progress.change_score("e_110a_lby_newspaper");
    store.save_progress("slot1", &mut progress).unwrap();

    let slots = store.list_slots().unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].score, 18);
}

#[test]
fn missing_slot_is_reported() {
    let store = store();
    let mut progress = fresh();
    let err = store.load_progress("nope", &mut progress).unwrap_err();
    assert!(matches!(err, ProgressError::SlotNotFound { .. }));
}

#[test]
fn delete_slot() {
    let store = store();
    let mut progress = populated();
    store.save_progress("autosave", &mut progress).unwrap();
    assert!(store.delete_slot("autosave").unwrap());
    assert!(!store.delete_slot("autosave").unwrap());
    assert!(store.read_payload("autosave").unwrap().is_none());
}
