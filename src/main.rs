use clap::Parser;
use notefall::app::{self, InputSource, RunOptions};
use notefall::config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "notefall", about = "Four-column falling-note rhythm game")]
struct Args {
    /// Note dataset to play (overrides DatasetPath in the config file).
    dataset: Option<PathBuf>,

    /// Path to the INI config file [default: notefall.ini].
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fixed noise seed for reproducible penalty tones.
    #[arg(long)]
    seed: Option<u64>,

    /// Press every user-played note perfectly.
    #[arg(long, conflicts_with = "input")]
    autoplay: bool,

    /// Replay file of `time_ms,KeyCode::<Variant>` lines.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Print the run summary as JSON on stdout.
    #[arg(long)]
    summary_json: bool,

    /// Pace the game against wall time instead of a virtual clock.
    #[arg(long)]
    realtime: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install logger immediately, then set runtime max level from config after loading it.
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    // Startup default when config is missing or malformed.
    log::set_max_level(log::LevelFilter::Warn);

    let args = Args::parse();
    match &args.config {
        Some(path) => config::load_from(path),
        None => config::load(),
    }
    let cfg = config::get();
    log::set_max_level(cfg.log_level.as_level_filter());

    let input = if args.autoplay {
        InputSource::Autoplay
    } else if let Some(path) = args.input {
        InputSource::Replay(path)
    } else {
        InputSource::None
    };
    let opts = RunOptions {
        dataset: args.dataset,
        seed: args.seed,
        input,
        realtime: args.realtime,
    };

    let summary = app::run(&cfg, &opts)?;
    if args.summary_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        log::info!(
            "Final score {} of {} user-played notes ({} penalties).",
            summary.score,
            summary.user_notes,
            summary.penalties_played
        );
    }
    Ok(())
}
