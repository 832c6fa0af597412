//! progress-runner: headless driver for the game-progress store.
//!
//! Usage:
//!   progress-runner --db saves.db
//!   progress-runner --db saves.db --data-dir ./data --ipc-mode
//!
//! In IPC mode, one JSON command per stdin line; one JSON state per stdout line.
//! Without it, lists the save slots in --db.

use anyhow::Result;
use progress_core::{
    config::ProgressConfig,
    event::ProgressEvent,
    progress::GameProgress,
    score::ScoreChange,
    store::SaveStore,
    timeblock::Timeblock,
    types::{Count, Points},
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    SetFlag { flag: String },
    ClearFlag { flag: String },
    ChangeScore { event: String },
    IncChat { noun: String },
    IncTopic {
        #[serde(default)]
        actor: Option<String>,
        noun:  String,
        topic: String,
    },
    IncNounVerb {
        #[serde(default)]
        actor: Option<String>,
        noun:  String,
        verb:  String,
    },
    SetVariable { name: String, value: Count },
    /// End the current timeblock and start `timeblock`, completing both
    /// transitions immediately (no fades in headless mode).
    Advance { timeblock: String },
    Save { slot: String },
    Load { slot: String },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState {
    score:          Points,
    max_score:      Points,
    timeblock:      String,
    timeblock_name: String,
    last_timeblock: Option<String>,
    transitioning:  bool,
    flags:          Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    score_change:   Option<ScoreChange>,
    events:         Vec<ProgressEvent>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = arg_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = arg_value(&args, "--data-dir").unwrap_or("./data");

    let store = if db == ":memory:" { SaveStore::in_memory()? } else { SaveStore::open(db)? };
    store.migrate()?;

    if !ipc_mode {
        println!("progress-runner");
        println!("  db:        {db}");
        println!();
        print_slots(&store)?;
        return Ok(());
    }

    let config = ProgressConfig::load(data_dir)?;
    let mut progress = GameProgress::new(config);
    run_ipc_loop(&mut progress, &store)
}

fn run_ipc_loop(progress: &mut GameProgress, store: &SaveStore) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };
        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        match handle_command(progress, store, cmd) {
            Ok(score_change) => {
                let state = build_ui_state(progress, score_change);
                writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
            }
            Err(e) => write_error(&mut stdout, &e.to_string())?,
        }
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(
    progress: &mut GameProgress,
    store: &SaveStore,
    cmd: IpcCommand,
) -> Result<Option<ScoreChange>> {
    match cmd {
        IpcCommand::GetState | IpcCommand::Quit => {}
        IpcCommand::SetFlag { flag } => progress.set_flag(&flag),
        IpcCommand::ClearFlag { flag } => progress.clear_flag(&flag),
        IpcCommand::ChangeScore { event } => return Ok(Some(progress.change_score(&event))),
        IpcCommand::IncChat { noun } => {
            progress.inc_chat_count(&noun);
        }
        IpcCommand::IncTopic { actor, noun, topic } => {
            match actor {
                Some(actor) => progress.inc_actor_topic_count(&actor, &noun, &topic),
                None => progress.inc_topic_count(&noun, &topic),
            };
        }
        IpcCommand::IncNounVerb { actor, noun, verb } => {
            match actor {
                Some(actor) => progress.inc_actor_noun_verb_count(&actor, &noun, &verb),
                None => progress.inc_noun_verb_count(&noun, &verb),
            };
        }
        IpcCommand::SetVariable { name, value } => progress.set_game_variable(&name, value),
        IpcCommand::Advance { timeblock } => {
            let next: Timeblock = timeblock.parse()?;
            let ticket = progress.end_current_timeblock(|_| {})?;
            progress.complete_transition(ticket)?;
            let ticket = progress.start_timeblock(next, false, |_| {})?;
            progress.complete_transition(ticket)?;
        }
        IpcCommand::Save { slot } => store.save_progress(&slot, progress)?,
        IpcCommand::Load { slot } => {
            store.load_progress(&slot, progress)?;
            // Re-enter the restored block the way the game does after a load.
            let ticket = progress.start_timeblock(progress.timeblock(), true, |_| {})?;
            progress.complete_transition(ticket)?;
        }
    }
    Ok(None)
}

fn build_ui_state(progress: &mut GameProgress, score_change: Option<ScoreChange>) -> UiState {
    UiState {
        score:          progress.score(),
        max_score:      progress.max_score(),
        timeblock:      progress.timeblock().to_string(),
        timeblock_name: progress.timeblock_display_name(),
        last_timeblock: progress.last_timeblock().map(|t| t.to_string()),
        transitioning:  progress.is_changing_timeblock(),
        flags:          progress.flags().set_flags().map(str::to_string).collect(),
        score_change,
        events:         progress.drain_events(),
    }
}

fn write_error(stdout: &mut io::Stdout, message: &str) -> Result<()> {
    let err_json = serde_json::json!({ "error": message });
    writeln!(stdout, "{}", err_json)?;
    stdout.flush()?;
    Ok(())
}

fn print_slots(store: &SaveStore) -> Result<()> {
    let slots = store.list_slots()?;
    println!("=== SAVE SLOTS ===");
    if slots.is_empty() {
        println!("  (no saves)");
        return Ok(());
    }
    for s in &slots {
        let name = match s.timeblock.parse::<Timeblock>() {
            Ok(t) => t.display_name(),
            Err(_) => {
                log::warn!("slot {} has unreadable timeblock '{}'", s.slot, s.timeblock);
                s.timeblock.clone()
            }
        };
        println!(
            "  {:<12} | {:<16} | score {:>4} | v{} | {}",
            s.slot,
            name,
            s.score,
            s.version,
            s.saved_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
