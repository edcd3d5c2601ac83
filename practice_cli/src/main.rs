use clap::{Args, Parser, Subcommand};
use practice_core::*;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "morning-practice")]
#[command(about = "Guided, narrated morning exercise session", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a practice session (default)
    Run(RunArgs),

    /// Print a freshly shuffled exercise selection
    Plan {
        #[command(flatten)]
        overrides: SessionOverrides,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List every exercise in the catalog
    Catalog {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write the default configuration to the config path
        #[arg(long)]
        init: bool,

        /// Overwrite an existing file with --init
        #[arg(long, requires = "init")]
        force: bool,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    #[command(flatten)]
    overrides: SessionOverrides,

    /// Start immediately, press Go automatically and exit when complete
    #[arg(long)]
    auto: bool,
}

#[derive(Args, Default)]
struct SessionOverrides {
    /// Number of exercises per session
    #[arg(long)]
    exercises: Option<usize>,

    /// Warm-up length in seconds
    #[arg(long)]
    warm_up: Option<u32>,

    /// Exercise length in seconds
    #[arg(long)]
    exercise_secs: Option<u32>,

    /// Cool-down length in seconds
    #[arg(long)]
    cool_down: Option<u32>,

    /// Wall-clock milliseconds per countdown second
    #[arg(long)]
    tick_millis: Option<u64>,

    /// Start with narration and chimes muted
    #[arg(long)]
    mute: bool,
}

impl SessionOverrides {
    fn apply(&self, config: &mut Config) {
        let session = &mut config.session;
        if let Some(count) = self.exercises {
            session.exercise_count = count;
        }
        if let Some(seconds) = self.warm_up {
            session.warm_up_seconds = seconds;
        }
        if let Some(seconds) = self.exercise_secs {
            session.exercise_seconds = seconds;
        }
        if let Some(seconds) = self.cool_down {
            session.cool_down_seconds = seconds;
        }
        if let Some(millis) = self.tick_millis {
            session.tick_millis = millis;
        }
        if self.mute {
            session.start_muted = true;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep stdout for the session display
    practice_core::logging::init_with_level(if cli.verbose { "debug" } else { "warn" });

    let config_path = cli.config.as_deref();

    match cli.command {
        Some(Commands::Run(args)) => cmd_run(config_path, args),
        Some(Commands::Plan { overrides, json }) => cmd_plan(config_path, &overrides, json),
        Some(Commands::Catalog { json }) => cmd_catalog(json),
        Some(Commands::Config { init, force }) => cmd_config(config_path, init, force),
        None => {
            // Default to "run" command
            cmd_run(config_path, RunArgs::default())
        }
    }
}

/// Config from `--config` when given, otherwise from the standard location
fn load_config(path: Option<&Path>, overrides: &SessionOverrides) -> Result<Config> {
    let mut config = match path {
        Some(path) if path.exists() => Config::load_from(path)?,
        Some(path) => {
            tracing::info!("No config file at {:?}, using defaults", path);
            Config::default()
        }
        None => Config::load()?,
    };
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn load_catalog() -> Result<&'static Catalog> {
    let catalog = get_default_catalog();
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }
    Ok(catalog)
}

fn cmd_run(config_path: Option<&Path>, args: RunArgs) -> Result<()> {
    let config = load_config(config_path, &args.overrides)?;
    let catalog = load_catalog()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run_session(config, catalog, args.auto));
    // The stdin reader may still be blocked on a read
    runtime.shutdown_background();
    result
}

async fn run_session(config: Config, catalog: &Catalog, auto: bool) -> Result<()> {
    let narrator = Narrator::detect(config.voice.clone());
    let chime = Chime::detect(&config.chime);
    let mut session = Session::new(
        &config,
        catalog.exercises.clone(),
        narrator,
        chime,
        rand::rng(),
    );

    if !auto {
        print_controls();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut display = Display::default();

    loop {
        if auto {
            press_for_auto(&mut session);
        }
        display.refresh(session.state());

        if session.state().stage() == Stage::Complete && auto {
            break;
        }

        tokio::select! {
            event = session.next_event() => match event {
                Some(event) => session.handle(event),
                None => break,
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if !handle_command(&mut session, &line) {
                        break;
                    }
                }
                Ok(None) if auto => stdin_open = false,
                // Nothing left to read from and nobody to press the buttons
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!("Failed to read input: {}", err);
                    stdin_open = false;
                }
            },
        }
    }

    if let Some(run) = session.run() {
        if let Some(elapsed) = run.elapsed() {
            let seconds = u32::try_from(elapsed.num_seconds()).unwrap_or_default();
            println!("\n✓ Practice complete in {}", format_clock(seconds));
            println!("  Run: {}", run.id);
        }
    }
    Ok(())
}

/// Start the session, then press Go whenever it waits for it
fn press_for_auto<R: rand::Rng>(session: &mut Session<R>) {
    let state = session.state();
    match state.stage() {
        Stage::Start if session.run().is_none() => session.start_practice(),
        Stage::Exercise if !state.timer_running() && !state.awaiting_narration() => {
            session.start_exercise()
        }
        _ => {}
    }
}

/// Returns false when the user asked to quit
fn handle_command<R: rand::Rng>(session: &mut Session<R>, line: &str) -> bool {
    match line.trim().to_lowercase().as_str() {
        "s" => session.start_practice(),
        "g" => session.start_exercise(),
        "l" => session.listen_again(),
        "r" => session.reset_practice(),
        "m" => session.toggle_mute(),
        "q" => return false,
        "" => {}
        other => {
            println!("Unknown command: {}", other);
            print_controls();
        }
    }
    true
}

fn print_controls() {
    println!("─────────────────────────────────────────");
    println!("  's' + Enter to start");
    println!("  'g' + Enter to begin the exercise");
    println!("  'l' + Enter to hear the instructions again");
    println!("  'r' + Enter to reset");
    println!("  'm' + Enter to mute or unmute");
    println!("  'q' + Enter to quit");
    println!("─────────────────────────────────────────");
}

/// What is on screen; redrawn only when it changes
#[derive(Default, PartialEq)]
struct Display {
    stage: Stage,
    clock: u32,
    exercise: Option<usize>,
    muted: bool,
    shown: bool,
}

impl Display {
    fn refresh(&mut self, state: &SessionState) {
        let clock = match state.stage() {
            Stage::Exercise if !state.timer_running() => state.timings().exercise_seconds,
            _ => state.seconds_remaining(),
        };
        let next = Display {
            stage: state.stage(),
            clock,
            exercise: state.current_exercise().map(|_| state.exercise_index()),
            muted: state.muted(),
            shown: true,
        };
        if *self == next {
            return;
        }

        if !self.shown || self.stage != next.stage || self.exercise != next.exercise {
            print_stage(state);
        }
        let mute_note = if next.muted { "  (muted)" } else { "" };
        match next.stage {
            Stage::Start | Stage::Complete => println!("  {}{}", next.stage, mute_note),
            _ => println!("  {}{}", format_clock(clock), mute_note),
        }
        *self = next;
    }
}

fn print_stage(state: &SessionState) {
    match state.stage() {
        Stage::Start => {
            println!("\n╭─────────────────────────────────────────╮");
            println!("│  MORNING PRACTICE");
            println!("╰─────────────────────────────────────────╯");
        }
        Stage::WarmUp => {
            println!("\n[Warm Up]");
            println!("  {}", prompts::WARM_UP_HINT);
        }
        Stage::Exercise => {
            println!(
                "\n[Exercise {} of {}]",
                state.exercise_index() + 1,
                state.total_exercises()
            );
            if let Some(exercise) = state.current_exercise() {
                println!("  {}", exercise.name);
                println!("  {}", exercise.description);
            }
        }
        Stage::CoolDown => {
            println!("\n[Cool Down]");
            println!("  {}", prompts::COOL_DOWN_HINT);
        }
        Stage::Complete => {
            println!("\n[Complete]");
        }
    }
}

fn cmd_plan(config_path: Option<&Path>, overrides: &SessionOverrides, json: bool) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let catalog = load_catalog()?;

    let selection = shuffle::select(
        &catalog.exercises,
        config.session.exercise_count,
        &mut rand::rng(),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&selection)?);
        return Ok(());
    }

    for (i, exercise) in selection.iter().enumerate() {
        println!("{:>2}. {}", i + 1, exercise.name);
        println!("    {}", exercise.description);
    }
    Ok(())
}

fn cmd_catalog(json: bool) -> Result<()> {
    let catalog = load_catalog()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&catalog.exercises)?);
        return Ok(());
    }

    println!("{} exercises:", catalog.len());
    for exercise in &catalog.exercises {
        println!("  • {}: {}", exercise.name, exercise.description);
    }
    Ok(())
}

fn cmd_config(path: Option<&Path>, init: bool, force: bool) -> Result<()> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::default_config_path);
    if init {
        if config_path.exists() && !force {
            return Err(Error::Config(format!(
                "{} already exists (use --force to overwrite)",
                config_path.display()
            )));
        }
        Config::default().save_to(&config_path)?;
        println!("✓ Wrote default config to {}", config_path.display());
        return Ok(());
    }

    let config = load_config(path, &SessionOverrides::default())?;
    let source = if config_path.exists() {
        "loaded"
    } else {
        "not found, showing defaults"
    };
    println!("# {} ({})", config_path.display(), source);
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
