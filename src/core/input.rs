use std::collections::HashMap;

use log::warn;
use winit::keyboard::KeyCode;

use crate::game::note::{Column, NUM_COLUMNS};

/// A key press as it arrives from the input source, before mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyPress {
    pub code: KeyCode,
    /// Milliseconds since game start.
    pub time_ms: u64,
}

/// A mapped key press. `column` is `None` for keys bound to no column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputEvent {
    pub column: Option<Column>,
    pub time_ms: f64,
}

/* ------------------------ Column keymap ------------------------ */

#[derive(Clone, Debug)]
pub struct Keymap {
    map: HashMap<KeyCode, Column>,
    primary: [Option<KeyCode>; NUM_COLUMNS],
}

impl Default for Keymap {
    fn default() -> Self {
        let mut km = Self::empty();
        km.bind(Column::ALL[0], &[KeyCode::KeyD]);
        km.bind(Column::ALL[1], &[KeyCode::KeyF]);
        km.bind(Column::ALL[2], &[KeyCode::KeyJ]);
        km.bind(Column::ALL[3], &[KeyCode::KeyK]);
        km
    }
}

impl Keymap {
    pub fn empty() -> Self {
        Self {
            map: HashMap::with_capacity(8),
            primary: [None; NUM_COLUMNS],
        }
    }

    /// Replaces every binding of `column`. A key moves to the column it was
    /// bound to last.
    pub fn bind(&mut self, column: Column, keys: &[KeyCode]) {
        self.map.retain(|_, c| *c != column);
        for &key in keys {
            if let Some(prev) = self.map.insert(key, column)
                && prev != column
                && self.primary[prev.index()] == Some(key)
            {
                self.primary[prev.index()] = None;
            }
        }
        self.primary[column.index()] = keys.first().copied();
    }

    #[inline(always)]
    pub fn column_for(&self, code: KeyCode) -> Option<Column> {
        self.map.get(&code).copied()
    }

    /// First key bound to `column`, used to synthesize presses.
    #[inline(always)]
    pub fn primary_key(&self, column: Column) -> Option<KeyCode> {
        self.primary[column.index()]
    }

    pub fn keys_for(&self, column: Column) -> Vec<KeyCode> {
        let mut keys: Vec<KeyCode> = self
            .map
            .iter()
            .filter(|(_, c)| **c == column)
            .map(|(k, _)| *k)
            .collect();
        keys.sort_by_key(|k| key_token(*k));
        if let Some(p) = self.primary_key(column) {
            keys.retain(|k| *k != p);
            keys.insert(0, p);
        }
        keys
    }

    #[inline(always)]
    pub fn map_key(&self, press: KeyPress) -> InputEvent {
        InputEvent {
            column: self.column_for(press.code),
            time_ms: press.time_ms as f64,
        }
    }
}

/* ------------------------ Debounce ------------------------ */

/// Collapses key-repeat bursts: a press within `window_ms` of the previous
/// press on the same column is swallowed.
#[derive(Clone, Debug)]
pub struct Debouncer {
    window_ms: f64,
    last_seen: [Option<f64>; NUM_COLUMNS],
}

impl Debouncer {
    pub const fn new(window_ms: f64) -> Self {
        Self {
            window_ms,
            last_seen: [None; NUM_COLUMNS],
        }
    }

    /// Returns the column of a logical press, or `None` for unmapped or
    /// collapsed presses.
    pub fn accept(&mut self, ev: InputEvent) -> Option<Column> {
        let column = ev.column?;
        let slot = &mut self.last_seen[column.index()];
        let collapsed = matches!(*slot, Some(prev) if (ev.time_ms - prev).abs() <= self.window_ms);
        *slot = Some(ev.time_ms);
        if collapsed { None } else { Some(column) }
    }
}

/* ------------------------ Token parsing ------------------------ */

const KEY_TOKENS: &[(&str, KeyCode)] = &[
    ("KeyA", KeyCode::KeyA), ("KeyB", KeyCode::KeyB), ("KeyC", KeyCode::KeyC), ("KeyD", KeyCode::KeyD),
    ("KeyE", KeyCode::KeyE), ("KeyF", KeyCode::KeyF), ("KeyG", KeyCode::KeyG), ("KeyH", KeyCode::KeyH),
    ("KeyI", KeyCode::KeyI), ("KeyJ", KeyCode::KeyJ), ("KeyK", KeyCode::KeyK), ("KeyL", KeyCode::KeyL),
    ("KeyM", KeyCode::KeyM), ("KeyN", KeyCode::KeyN), ("KeyO", KeyCode::KeyO), ("KeyP", KeyCode::KeyP),
    ("KeyQ", KeyCode::KeyQ), ("KeyR", KeyCode::KeyR), ("KeyS", KeyCode::KeyS), ("KeyT", KeyCode::KeyT),
    ("KeyU", KeyCode::KeyU), ("KeyV", KeyCode::KeyV), ("KeyW", KeyCode::KeyW), ("KeyX", KeyCode::KeyX),
    ("KeyY", KeyCode::KeyY), ("KeyZ", KeyCode::KeyZ),
    ("Digit0", KeyCode::Digit0), ("Digit1", KeyCode::Digit1), ("Digit2", KeyCode::Digit2),
    ("Digit3", KeyCode::Digit3), ("Digit4", KeyCode::Digit4), ("Digit5", KeyCode::Digit5),
    ("Digit6", KeyCode::Digit6), ("Digit7", KeyCode::Digit7), ("Digit8", KeyCode::Digit8),
    ("Digit9", KeyCode::Digit9),
    ("ArrowUp", KeyCode::ArrowUp), ("ArrowDown", KeyCode::ArrowDown),
    ("ArrowLeft", KeyCode::ArrowLeft), ("ArrowRight", KeyCode::ArrowRight),
    ("Space", KeyCode::Space), ("Semicolon", KeyCode::Semicolon), ("Comma", KeyCode::Comma),
    ("Period", KeyCode::Period), ("Slash", KeyCode::Slash),
    ("Enter", KeyCode::Enter), ("Escape", KeyCode::Escape),
];

/// Parses `KeyCode::<Variant>` (the prefix is optional).
pub fn parse_key_token(tok: &str) -> Option<KeyCode> {
    let tok = tok.trim();
    let rest = tok.strip_prefix("KeyCode::").unwrap_or(tok);
    KEY_TOKENS
        .iter()
        .find(|(name, _)| *name == rest)
        .map(|(_, code)| *code)
}

pub fn key_token(code: KeyCode) -> String {
    KEY_TOKENS
        .iter()
        .find(|(_, c)| *c == code)
        .map_or_else(|| format!("{code:?}"), |(name, _)| format!("KeyCode::{name}"))
}

/// Parses a `;`- or `,`-separated binding list, skipping unknown tokens.
pub fn parse_binding_list(list: &str) -> Vec<KeyCode> {
    list.split([';', ','])
        .filter(|t| !t.trim().is_empty())
        .filter_map(|t| {
            let parsed = parse_key_token(t);
            if parsed.is_none() {
                warn!("Unknown key binding token '{}'", t.trim());
            }
            parsed
        })
        .collect()
}

/* ------------------------ Replay logs ------------------------ */

/// Parses a replay line of the form `time_ms,KeyCode::<Variant>`.
pub fn parse_replay_line(line: &str) -> Option<KeyPress> {
    let (time, key) = line.split_once(',')?;
    let time_ms = time.trim().parse::<u64>().ok()?;
    let code = parse_key_token(key)?;
    Some(KeyPress { code, time_ms })
}

/// Parses a whole replay log. Blank and `#` lines are skipped, bad lines are
/// warned about and dropped. The result is sorted by time.
pub fn parse_replay(content: &str) -> Vec<KeyPress> {
    let mut out = Vec::new();
    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_replay_line(line) {
            Some(p) => out.push(p),
            None => warn!("Replay line {} is not 'time_ms,key': '{line}'", idx + 1),
        }
    }
    out.sort_by_key(|p| p.time_ms);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(col: usize, t: f64) -> InputEvent {
        InputEvent {
            column: Column::new(col),
            time_ms: t,
        }
    }

    #[test]
    fn default_keymap_binds_four_columns() {
        let km = Keymap::default();
        assert_eq!(km.column_for(KeyCode::KeyD), Column::new(0));
        assert_eq!(km.column_for(KeyCode::KeyF), Column::new(1));
        assert_eq!(km.column_for(KeyCode::KeyJ), Column::new(2));
        assert_eq!(km.column_for(KeyCode::KeyK), Column::new(3));
        assert_eq!(km.column_for(KeyCode::Space), None);
    }

    #[test]
    fn rebinding_moves_keys_between_columns() {
        let mut km = Keymap::default();
        km.bind(Column::ALL[1], &[KeyCode::KeyD, KeyCode::ArrowDown]);
        assert_eq!(km.column_for(KeyCode::KeyD), Column::new(1));
        assert_eq!(km.column_for(KeyCode::KeyF), None);
        assert_eq!(km.primary_key(Column::ALL[0]), None);
        assert_eq!(km.keys_for(Column::ALL[1]), vec![KeyCode::KeyD, KeyCode::ArrowDown]);
    }

    #[test]
    fn unmapped_keys_never_pass_the_debouncer() {
        let mut d = Debouncer::new(50.0);
        let km = Keymap::default();
        let e = km.map_key(KeyPress { code: KeyCode::KeyQ, time_ms: 100 });
        assert_eq!(e.column, None);
        assert_eq!(d.accept(e), None);
    }

    #[test]
    fn presses_within_window_collapse() {
        let mut d = Debouncer::new(50.0);
        assert_eq!(d.accept(ev(0, 1000.0)), Column::new(0));
        assert_eq!(d.accept(ev(0, 1030.0)), None);
        // Other columns are independent.
        assert_eq!(d.accept(ev(1, 1031.0)), Column::new(1));
        assert_eq!(d.accept(ev(0, 1100.0)), Column::new(0));
    }

    #[test]
    fn key_repeat_chain_stays_collapsed() {
        let mut d = Debouncer::new(50.0);
        assert!(d.accept(ev(2, 0.0)).is_some());
        for i in 1..10 {
            assert!(d.accept(ev(2, f64::from(i) * 30.0)).is_none(), "repeat {i}");
        }
        assert!(d.accept(ev(2, 400.0)).is_some());
    }

    #[test]
    fn key_tokens_round_trip() {
        for (name, code) in KEY_TOKENS {
            assert_eq!(parse_key_token(&format!("KeyCode::{name}")), Some(*code));
            assert_eq!(key_token(*code), format!("KeyCode::{name}"));
        }
        assert_eq!(parse_key_token("KeyCode::Bogus"), None);
        assert_eq!(parse_binding_list("KeyCode::KeyD; Bogus ;KeyF"), vec![KeyCode::KeyD, KeyCode::KeyF]);
    }

    #[test]
    fn replay_log_is_parsed_and_sorted() {
        let log = "# recorded\n3100,KeyCode::KeyD\n\n1000,KeyJ\nnot a line\n";
        let presses = parse_replay(log);
        assert_eq!(
            presses,
            vec![
                KeyPress { code: KeyCode::KeyJ, time_ms: 1000 },
                KeyPress { code: KeyCode::KeyD, time_ms: 3100 },
            ]
        );
    }
}
