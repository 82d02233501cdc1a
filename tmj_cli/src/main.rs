use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};
use tmj_core::narrator::select_voice;
use tmj_core::*;

#[derive(Parser)]
#[command(name = "tmjguide")]
#[command(about = "Guided TMJ exercise sessions with spoken instructions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a guided exercise session (default)
    Start {
        /// Start with narration turned off
        #[arg(long)]
        mute: bool,

        /// Exit after one session instead of offering another
        #[arg(long)]
        once: bool,

        /// Multiply every wait by this factor (0 runs without pauses)
        #[arg(long)]
        time_scale: Option<f64>,
    },

    /// List the exercises in session order
    List,

    /// Show one exercise in full
    Show {
        /// Exercise number (1-6)
        id: u32,
    },

    /// Show how many sessions were completed today
    Today,

    /// List the voices of the configured speech engine
    Voices,
}

fn main() -> Result<()> {
    // Initialize logging
    tmj_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());

    let catalog = get_default_catalog();
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }

    match cli.command {
        Some(Commands::Start {
            mute,
            once,
            time_scale,
        }) => cmd_start(data_dir, &config, mute, once, time_scale),
        Some(Commands::List) => {
            cmd_list(catalog);
            Ok(())
        }
        Some(Commands::Show { id }) => cmd_show(catalog, id),
        Some(Commands::Today) => {
            cmd_today(data_dir);
            Ok(())
        }
        Some(Commands::Voices) => cmd_voices(&config),
        None => cmd_start(data_dir, &config, false, false, None),
    }
}

fn store_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("store.json")
}

fn cmd_start(
    data_dir: PathBuf,
    config: &Config,
    mute: bool,
    once: bool,
    time_scale: Option<f64>,
) -> Result<()> {
    let mut config = config.clone();
    if let Some(scale) = time_scale {
        config.pacing.time_scale = scale;
        config.validate()?;
    }

    let mut narrator = SpeechNarrator::new(CommandEngine::detect(&config.narration), &config.narration);
    let narration_ready = narrator.initialize();

    let clock = SystemClock::new(config.pacing.time_scale);
    let store = JsonFileStore::new(store_path(&data_dir));

    let mut controller = SessionController::new(
        get_default_catalog().clone(),
        Pacing::from(&config.pacing),
        narrator,
        clock,
        store,
    )?;
    if mute {
        controller.toggle_audio();
        controller.drain_events();
    }

    display_overview(controller.sessions_today(), narration_ready, controller.audio_enabled());

    let controls = spawn_control_reader();
    if !wait_for_start(&controls, &mut controller) {
        return Ok(());
    }

    loop {
        controller.start();
        let outcome = controller.run(|| controls.try_recv().ok(), display_event);

        match outcome {
            RunOutcome::Completed => {}
            RunOutcome::Reset => println!("\nSession reset."),
            RunOutcome::Quit | RunOutcome::Idle => break,
        }

        if once {
            break;
        }

        println!("─────────────────────────────────────────");
        println!("Press Enter to start another session");
        println!("  'm' + Enter to toggle audio");
        println!("  'q' + Enter to quit");

        if !wait_for_start(&controls, &mut controller) {
            break;
        }
    }

    Ok(())
}

/// Block until the user asks for another session; `false` means quit
fn wait_for_start<N, C, S>(
    controls: &Receiver<ControlEvent>,
    controller: &mut SessionController<N, C, S>,
) -> bool
where
    N: Narrator,
    C: Clock,
    S: KeyValueStore,
{
    loop {
        match controls.recv() {
            Ok(ControlEvent::Start) => return true,
            Ok(ControlEvent::ToggleAudio) => {
                controller.toggle_audio();
                controller.drain_events();
                println!(
                    "Audio {}",
                    if controller.audio_enabled() { "on" } else { "off" }
                );
            }
            Ok(ControlEvent::Reset) => {}
            Ok(ControlEvent::Quit) | Err(_) => return false,
        }
    }
}

/// Forward stdin lines as control events from a helper thread
fn spawn_control_reader() -> Receiver<ControlEvent> {
    let (tx, rx) = channel::<ControlEvent>();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let event = match line.trim().to_lowercase().as_str() {
                "" => ControlEvent::Start,
                "r" => ControlEvent::Reset,
                "m" => ControlEvent::ToggleAudio,
                "q" => ControlEvent::Quit,
                other => {
                    tracing::debug!("Ignoring input {:?}", other);
                    continue;
                }
            };
            if tx.send(event).is_err() {
                break;
            }
        }
    });
    rx
}

fn display_overview(sessions_today: u32, narration_ready: bool, audio_enabled: bool) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  TMJ EXERCISE GUIDE");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  • {} exercises", SESSION_SUMMARY.total_exercises);
    println!("  • {} duration", SESSION_SUMMARY.estimated_duration);
    println!(
        "  • {} times daily recommended",
        SESSION_SUMMARY.daily_frequency
    );
    println!("  • Continue for {}+ weeks", SESSION_SUMMARY.minimum_weeks);
    println!();
    println!("  ⚠ {}", SESSION_SUMMARY.general_safety_note);
    println!();
    println!(
        "  Sessions today: {}/{}",
        sessions_today, SESSION_SUMMARY.daily_frequency
    );
    let audio = match (audio_enabled, narration_ready) {
        (false, _) => "off",
        (true, true) => "on",
        (true, false) => "unavailable",
    };
    println!("  Audio: {}", audio);
    println!();
    println!("  Controls: 'r' + Enter to reset, 'm' + Enter to toggle audio, 'q' + Enter to quit");
    println!();
    println!("Press Enter to start");
    let _ = io::stdout().flush();
}

fn display_exercise_card(snapshot: &Snapshot<'_>) {
    let exercise = snapshot.exercise;
    println!("\n╭─────────────────────────────────────────╮");
    println!(
        "│  {}/{}  {}",
        snapshot.exercise_index + 1,
        snapshot.exercise_count,
        exercise.short_name
    );
    println!("╰─────────────────────────────────────────╯");
    println!("  {}", exercise.description);
    println!();
    println!("  Instructions:");
    for (index, step) in exercise.instructions.iter().enumerate() {
        println!("    {}. {}", index + 1, step);
    }

    if !exercise.safety_notes.is_empty() {
        println!();
        println!("  Safety notes:");
        for note in &exercise.safety_notes {
            println!("    • {}", note);
        }
    }
    println!();
}

fn display_event(event: &SessionEvent, snapshot: &Snapshot<'_>) {
    match event {
        SessionEvent::ExerciseStarted { .. } => display_exercise_card(snapshot),
        SessionEvent::ExerciseStateChanged { state, .. } => match state {
            ExerciseState::Preparation | ExerciseState::Resting | ExerciseState::Completed => {
                println!("  [{}]", state.label())
            }
            ExerciseState::Holding => println!("  [{}] {}s", state.label(), snapshot.countdown),
            ExerciseState::Intro | ExerciseState::Executing => {}
        },
        SessionEvent::RepStarted { rep, side, .. } => {
            let timing = &snapshot.exercise.timing;
            let side = side.map(|s| format!(" ({} side)", s)).unwrap_or_default();
            println!(
                "  → Rep {}/{}{}  [{:.0}%]",
                rep,
                timing.repetitions,
                side,
                snapshot.exercise_progress()
            );
        }
        SessionEvent::CountdownTick { remaining } if *remaining > 0 => {
            println!("      {}…", remaining);
        }
        SessionEvent::CountdownTick { .. } => {}
        SessionEvent::SideSwitched { .. } => println!("  ⇄ Switching to the right side"),
        SessionEvent::SessionCompleted { sessions_today } => {
            println!("\n╭─────────────────────────────────────────╮");
            println!("│  ✓ SESSION COMPLETE");
            println!("╰─────────────────────────────────────────╯");
            println!(
                "  Great work completing all {} exercises",
                snapshot.exercise_count
            );
            println!(
                "  Sessions today: {}/{}",
                sessions_today, SESSION_SUMMARY.daily_frequency
            );
            println!("  {}", SESSION_SUMMARY.daily_goal_message(*sessions_today));
            println!();
        }
        SessionEvent::AudioToggled { enabled } => {
            println!("  Audio {}", if *enabled { "on" } else { "off" })
        }
        SessionEvent::SessionStateChanged(_) | SessionEvent::Reset => {}
    }
    let _ = io::stdout().flush();
}

fn pattern_label(timing: &Timing) -> String {
    let base = match timing.pattern() {
        TimingPattern::Breathing => format!("{} breaths", timing.repetitions),
        TimingPattern::Hold(secs) => format!("{} × {}s hold", timing.repetitions, secs),
        TimingPattern::Repetition => format!("{} reps", timing.repetitions),
    };
    if timing.has_sides {
        format!("{} per side", base)
    } else {
        base
    }
}

fn cmd_list(catalog: &Catalog) {
    for exercise in &catalog.exercises {
        println!(
            "{}. {} ({})",
            exercise.id,
            exercise.name,
            pattern_label(&exercise.timing)
        );
        println!("   {}", exercise.description);
    }
    println!();
    println!(
        "{} exercises, about {}. Recommended {} times daily for at least {} weeks.",
        SESSION_SUMMARY.total_exercises,
        SESSION_SUMMARY.estimated_duration,
        SESSION_SUMMARY.daily_frequency,
        SESSION_SUMMARY.minimum_weeks
    );
}

fn cmd_show(catalog: &Catalog, id: u32) -> Result<()> {
    let exercise = catalog
        .find(id)
        .ok_or_else(|| Error::Other(format!("No exercise with id {}", id)))?;

    println!("{}. {}", exercise.id, exercise.name);
    println!("   {}", exercise.short_name);
    println!();
    println!("{}", exercise.description);
    println!("Timing: {}", pattern_label(&exercise.timing));
    println!();
    println!("Instructions:");
    for (index, step) in exercise.instructions.iter().enumerate() {
        println!("  {}. {}", index + 1, step);
    }
    if !exercise.safety_notes.is_empty() {
        println!();
        println!("Safety notes:");
        for note in &exercise.safety_notes {
            println!("  • {}", note);
        }
    }

    let audio = &exercise.audio_instructions;
    println!();
    println!("Narration:");
    println!("  Introduction: {}", audio.introduction);
    println!("  Preparation:  {}", audio.preparation);
    println!("  Execution:    {} <rep>", audio.execution);
    if let Some(hold) = &audio.hold {
        println!("  Hold:         {}", hold);
    }
    println!("  Completion:   {}", audio.completion);
    Ok(())
}

fn cmd_today(data_dir: PathBuf) {
    let store = JsonFileStore::new(store_path(&data_dir));
    let count = DailyTally::count(&store, SystemClock::default().today());
    println!(
        "Sessions today: {}/{}",
        count, SESSION_SUMMARY.daily_frequency
    );
    println!("{}", SESSION_SUMMARY.daily_goal_message(count));
}

fn cmd_voices(config: &Config) -> Result<()> {
    let Some(mut engine) = CommandEngine::detect(&config.narration) else {
        println!("No speech engine available. Sessions will run without narration.");
        return Ok(());
    };

    let voices = engine.list_voices()?;
    println!("{:?} reports {} voices:", engine.kind(), voices.len());
    for voice in &voices {
        println!("  {:<32} {}", voice.name, voice.lang);
    }

    match select_voice(&voices, &config.narration.locale, config.narration.voice.as_deref()) {
        Some(voice) => println!("\nNarration voice: {}", voice.name),
        None => println!("\nNarration voice: engine default"),
    }
    Ok(())
}
