use crate::core::input::{Keymap, key_token, parse_binding_list};
use crate::game::note::Column;
use crate::game::timing_windows::TimingProfile;
use log::{LevelFilter, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

pub const CONFIG_PATH: &str = "notefall.ini";

const DEFAULT_VOICES: [&str; 4] = ["bass", "guitar", "piano", "strings"];

// --- Minimal INI reader ---
#[derive(Debug, Default)]
pub struct SimpleIni {
    sections: HashMap<String, HashMap<String, String>>,
}

impl SimpleIni {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        self.load_str(&content);
        Ok(())
    }

    pub fn load_str(&mut self, content: &str) {
        self.sections.clear();
        let mut current_section = String::new();

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                current_section = name.trim().to_string();
                self.sections.entry(current_section.clone()).or_default();
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                self.sections
                    .entry(current_section.clone())
                    .or_default()
                    .insert(key.to_string(), value.trim().to_string());
            }
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.sections.get(section).and_then(|s| s.get(key)).cloned()
    }

    pub fn get_section(&self, section: &str) -> Option<&HashMap<String, String>> {
        self.sections.get(section)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }

    pub const fn as_level_filter(&self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::Off,
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: LogLevel,
    pub pre_roll_ms: f64,
    pub settle_ms: f64,
    pub tolerance_ms: f64,
    pub debounce_ms: f64,
    pub tick_ms: f64,
    // None = Auto (seed from the wall clock)
    pub seed: Option<u64>,
    /// Instrument names the voice bank can play.
    pub voices: Vec<String>,
    pub dataset_path: Option<PathBuf>,
    pub keymap: Keymap,
}

impl Default for Config {
    fn default() -> Self {
        let timing = TimingProfile::default();
        Self {
            log_level: LogLevel::Warn,
            pre_roll_ms: timing.pre_roll_ms,
            settle_ms: timing.settle_ms,
            tolerance_ms: timing.tolerance_ms,
            debounce_ms: timing.debounce_ms,
            tick_ms: timing.tick_ms,
            seed: None,
            voices: DEFAULT_VOICES.iter().map(|s| s.to_string()).collect(),
            dataset_path: None,
            keymap: Keymap::default(),
        }
    }
}

/// Parses a non-negative, finite millisecond value.
fn parse_ms(v: &str) -> Option<f64> {
    v.trim()
        .parse::<f64>()
        .ok()
        .filter(|ms| ms.is_finite() && *ms >= 0.0)
}

impl Config {
    pub const fn timing_profile(&self) -> TimingProfile {
        TimingProfile {
            pre_roll_ms: self.pre_roll_ms,
            settle_ms: self.settle_ms,
            tolerance_ms: self.tolerance_ms,
            debounce_ms: self.debounce_ms,
            tick_ms: self.tick_ms,
        }
    }

    /// Builds a config from parsed INI content, using defaults for any
    /// missing or malformed key.
    pub fn from_ini(conf: &SimpleIni) -> Self {
        let default = Self::default();
        let ms = |key: &str, fallback: f64| {
            conf.get("Options", key)
                .and_then(|v| parse_ms(&v))
                .unwrap_or(fallback)
        };

        let log_level = conf
            .get("Options", "LogLevel")
            .and_then(|v| LogLevel::from_str(&v).ok())
            .unwrap_or(default.log_level);
        let tick_ms = ms("TickMs", default.tick_ms);
        let seed = match conf.get("Options", "Seed") {
            Some(v) if v.eq_ignore_ascii_case("auto") || v.is_empty() => None,
            Some(v) => match v.parse::<u64>() {
                Ok(seed) => Some(seed),
                Err(_) => {
                    warn!("Ignoring invalid Seed '{v}'; using wall clock.");
                    None
                }
            },
            None => default.seed,
        };
        let voices = conf
            .get("Options", "Voices")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or(default.voices);
        let dataset_path = conf
            .get("Options", "DatasetPath")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Self {
            log_level,
            pre_roll_ms: ms("PreRollMs", default.pre_roll_ms),
            settle_ms: ms("SettleMs", default.settle_ms),
            tolerance_ms: ms("ToleranceMs", default.tolerance_ms),
            debounce_ms: ms("DebounceMs", default.debounce_ms),
            tick_ms: if tick_ms > 0.0 { tick_ms } else { default.tick_ms },
            seed,
            voices,
            dataset_path,
            keymap: load_keymap_from_ini(conf),
        }
    }

    fn to_ini_string(&self) -> String {
        let mut content = String::new();

        // [Options] section - keys in alphabetical order
        content.push_str("[Options]\n");
        content.push_str(&format!(
            "DatasetPath={}\n",
            self.dataset_path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        ));
        content.push_str(&format!("DebounceMs={}\n", self.debounce_ms));
        content.push_str(&format!("LogLevel={}\n", self.log_level.as_str()));
        content.push_str(&format!("PreRollMs={}\n", self.pre_roll_ms));
        content.push_str(&format!(
            "Seed={}\n",
            self.seed.map_or_else(|| "Auto".to_string(), |s| s.to_string())
        ));
        content.push_str(&format!("SettleMs={}\n", self.settle_ms));
        content.push_str(&format!("TickMs={}\n", self.tick_ms));
        content.push_str(&format!("ToleranceMs={}\n", self.tolerance_ms));
        content.push_str(&format!("Voices={}\n", self.voices.join(",")));
        content.push('\n');

        content.push_str("[Keymaps]\n");
        for column in Column::ALL {
            let tokens: Vec<String> = self
                .keymap
                .keys_for(column)
                .into_iter()
                .map(key_token)
                .collect();
            content.push_str(&format!("Column{}={}\n", column.index(), tokens.join(";")));
        }
        content
    }
}

static CONFIG: std::sync::LazyLock<Mutex<Config>> =
    std::sync::LazyLock::new(|| Mutex::new(Config::default()));

// --- File I/O ---

fn load_keymap_from_ini(conf: &SimpleIni) -> Keymap {
    // Columns missing from [Keymaps] keep their built-in keys.
    let mut km = Keymap::default();
    let Some(section) = conf
        .get_section("Keymaps")
        .or_else(|| conf.get_section("keymaps"))
    else {
        return km;
    };

    for column in Column::ALL {
        let key = format!("column{}", column.index());
        let value = section
            .iter()
            .find(|(k, _)| k.to_ascii_lowercase() == key)
            .map(|(_, v)| v);
        if let Some(v) = value {
            let bindings = parse_binding_list(v);
            if bindings.is_empty() {
                warn!("No usable keys for Column{}; keeping defaults.", column.index());
            } else {
                km.bind(column, &bindings);
            }
        }
    }
    km
}

fn create_default_config_file(path: &Path) -> Result<(), std::io::Error> {
    info!("'{}' not found, creating with default values.", path.display());
    std::fs::write(path, Config::default().to_ini_string())
}

/// Loads `notefall.ini` from the working directory.
pub fn load() {
    load_from(Path::new(CONFIG_PATH));
}

pub fn load_from(path: &Path) {
    if !path.exists()
        && let Err(e) = create_default_config_file(path)
    {
        warn!("Failed to create default config file: {e}");
    }

    let mut conf = SimpleIni::new();
    match conf.load(path) {
        Ok(()) => {
            let loaded = Config::from_ini(&conf);
            match CONFIG.lock() {
                Ok(mut cfg) => *cfg = loaded,
                Err(poisoned) => *poisoned.into_inner() = loaded,
            }
            info!("Configuration loaded from '{}'.", path.display());
        }
        Err(e) => warn!(
            "Failed to load '{}': {e}. Using default values.",
            path.display()
        ),
    }
}

pub fn get() -> Config {
    match CONFIG.lock() {
        Ok(cfg) => cfg.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::KeyCode;

    fn ini(content: &str) -> SimpleIni {
        let mut conf = SimpleIni::new();
        conf.load_str(content);
        conf
    }

    #[test]
    fn ini_reader_handles_sections_and_comments() {
        let conf = ini("; comment\n# another\nTop=1\n[Options]\n Key = some value \n=orphan\n");
        assert_eq!(conf.get("", "Top").as_deref(), Some("1"));
        assert_eq!(conf.get("Options", "Key").as_deref(), Some("some value"));
        assert!(conf.get("Options", "").is_none());
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let cfg = Config::from_ini(&ini("[Options]\n"));
        assert_eq!(cfg.timing_profile(), TimingProfile::default());
        assert_eq!(cfg.log_level, LogLevel::Warn);
        assert_eq!(cfg.seed, None);
        assert_eq!(cfg.voices.len(), DEFAULT_VOICES.len());
        assert_eq!(cfg.keymap.primary_key(Column::ALL[0]), Some(KeyCode::KeyD));
    }

    #[test]
    fn options_override_defaults() {
        let cfg = Config::from_ini(&ini(
            "[Options]\nLogLevel=debug\nToleranceMs=90\nTickMs=0\nSeed=1234\nVoices= piano , ,organ\nDatasetPath=songs/a.csv\n",
        ));
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(cfg.tolerance_ms, 90.0);
        // A zero tick would never advance a fall.
        assert_eq!(cfg.tick_ms, TimingProfile::default().tick_ms);
        assert_eq!(cfg.seed, Some(1234));
        assert_eq!(cfg.voices, vec!["piano".to_string(), "organ".to_string()]);
        assert_eq!(cfg.dataset_path, Some(PathBuf::from("songs/a.csv")));
    }

    #[test]
    fn malformed_values_are_ignored() {
        let cfg = Config::from_ini(&ini("[Options]\nLogLevel=loud\nPreRollMs=-5\nSeed=soon\n"));
        assert_eq!(cfg.log_level, LogLevel::Warn);
        assert_eq!(cfg.pre_roll_ms, TimingProfile::default().pre_roll_ms);
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn keymaps_section_rebinds_columns() {
        let cfg = Config::from_ini(&ini(
            "[Keymaps]\nColumn0=KeyCode::KeyA;KeyCode::KeyS\ncolumn3=KeyCode::Semicolon\nColumn1=Bogus\n",
        ));
        let km = &cfg.keymap;
        assert_eq!(km.column_for(KeyCode::KeyA), Some(Column::ALL[0]));
        assert_eq!(km.column_for(KeyCode::KeyS), Some(Column::ALL[0]));
        assert_eq!(km.column_for(KeyCode::KeyD), None);
        assert_eq!(km.column_for(KeyCode::Semicolon), Some(Column::ALL[3]));
        assert_eq!(km.column_for(KeyCode::KeyF), Some(Column::ALL[1]));
    }

    #[test]
    fn load_from_creates_missing_file_and_updates_global() {
        let path = std::env::temp_dir().join(format!("notefall-cfg-{}.ini", std::process::id()));
        std::fs::remove_file(&path).ok();
        load_from(&path);
        assert!(path.exists());
        assert_eq!(get().timing_profile(), TimingProfile::default());

        std::fs::write(&path, "[Options]\nToleranceMs=80\nSeed=5\n").unwrap();
        load_from(&path);
        let cfg = get();
        assert_eq!(cfg.tolerance_ms, 80.0);
        assert_eq!(cfg.seed, Some(5));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn default_file_round_trips() {
        let cfg = Config::from_ini(&ini(&Config::default().to_ini_string()));
        assert_eq!(cfg.timing_profile(), TimingProfile::default());
        assert_eq!(cfg.voices, Config::default().voices);
        for column in Column::ALL {
            assert_eq!(cfg.keymap.keys_for(column), Keymap::default().keys_for(column));
        }
    }
}
