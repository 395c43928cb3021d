use crate::config::Config;
use crate::core::audio::{LoggingVoiceBank, SharedVoiceBank};
use crate::core::input::{KeyPress, parse_replay};
use crate::core::render::{LoggingSurface, SharedSurface};
use crate::game::error::LoadError;
use crate::game::gameplay::{Game, autoplay_presses};
use crate::game::noise::NoiseSource;
use crate::game::parsing::notes;
use crate::game::stage_stats::StageSummary;
use log::{info, warn};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Where key presses come from.
#[derive(Debug, Clone)]
pub enum InputSource {
    /// No presses; the song plays out on its own.
    None,
    Autoplay,
    Replay(PathBuf),
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub dataset: Option<PathBuf>,
    pub seed: Option<u64>,
    pub input: InputSource,
    pub realtime: bool,
}

/// Loads the dataset, plays it to the end and returns the run summary.
pub fn run(cfg: &Config, opts: &RunOptions) -> Result<StageSummary, LoadError> {
    let dataset = opts
        .dataset
        .clone()
        .or_else(|| cfg.dataset_path.clone())
        .ok_or(LoadError::NoDataset)?;
    if cfg.voices.is_empty() {
        return Err(LoadError::NoVoices);
    }

    let bank = LoggingVoiceBank::new(cfg.voices.iter().cloned());
    let voices: BTreeSet<String> = cfg.voices.iter().cloned().collect();
    let profile = cfg.timing_profile();
    let timeline = notes::load_file(&dataset, &voices, profile.tick_ms)?;

    let noise = match opts.seed.or(cfg.seed) {
        Some(seed) => NoiseSource::new(seed),
        None => NoiseSource::from_wall_clock(),
    };
    let audio: SharedVoiceBank = Rc::new(RefCell::new(bank));
    let surface: SharedSurface = Rc::new(RefCell::new(LoggingSurface::default()));
    let mut game = Game::new(&timeline, cfg.keymap.clone(), profile, noise, audio, surface);

    let presses = match &opts.input {
        InputSource::None => Vec::new(),
        InputSource::Autoplay => autoplay_presses(game.notes(), &cfg.keymap, &profile),
        InputSource::Replay(path) => load_replay(path)?,
    };
    info!("Playing with {} scripted presses.", presses.len());

    if opts.realtime {
        play_realtime(&mut game, &presses);
    } else {
        play_virtual(&mut game, &presses);
    }
    Ok(game.summary())
}

fn load_replay(path: &Path) -> Result<Vec<KeyPress>, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReplayRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_replay(&content))
}

fn play_virtual(game: &mut Game, presses: &[KeyPress]) {
    for &press in presses {
        if game.is_ended() {
            break;
        }
        game.press(press);
    }
    game.run_to_end();
}

/// Paces the virtual clock against wall time, sleeping until the next due
/// event or scripted press.
fn play_realtime(game: &mut Game, presses: &[KeyPress]) {
    let origin = Instant::now();
    let mut pending = presses.iter().peekable();

    while !game.is_ended() {
        let next_press_ms = pending.peek().map(|p| p.time_ms as f64);
        let next_ms = match (game.next_due_ms(), next_press_ms) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => {
                warn!("Nothing left to schedule before the end; stopping.");
                break;
            }
        };

        let target = origin + Duration::from_secs_f64(next_ms.max(0.0) / 1000.0);
        if let Some(wait) = target.checked_duration_since(Instant::now()) {
            std::thread::sleep(wait);
        }

        if let Some(&&press) = pending.peek()
            && press.time_ms as f64 <= next_ms
        {
            pending.next();
            game.press(press);
        } else {
            game.advance_to(next_ms);
        }
    }
}
