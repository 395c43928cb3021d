use log::debug;

use crate::core::input::{Debouncer, KeyPress, Keymap};
use crate::game::note::{Column, NoteId, ScheduledNote};
use crate::game::timing_windows::TimingProfile;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Outcome {
    Correct,
    WrongColumn,
    Mistimed,
    Miss,
}

impl Outcome {
    pub const fn from_flags(timing_ok: bool, column_ok: bool) -> Self {
        match (timing_ok, column_ok) {
            (true, true) => Self::Correct,
            (true, false) => Self::WrongColumn,
            (false, true) => Self::Mistimed,
            (false, false) => Self::Miss,
        }
    }

    /// Only a fully correct press plays the intended note and scores.
    #[inline(always)]
    pub const fn scores(self) -> bool {
        matches!(self, Self::Correct)
    }
}

/// Judgement of one logical key press against one user-played note.
#[derive(Clone, Debug, PartialEq)]
pub struct Verdict {
    pub note: ScheduledNote,
    pub timing_ok: bool,
    pub column_ok: bool,
    pub pressed_column: Column,
    pub key_time_ms: f64,
    pub expected_ms: f64,
}

impl Verdict {
    #[inline(always)]
    pub const fn outcome(&self) -> Outcome {
        Outcome::from_flags(self.timing_ok, self.column_ok)
    }

    #[inline(always)]
    pub fn time_error_ms(&self) -> f64 {
        self.key_time_ms - self.expected_ms
    }
}

#[derive(Clone, Debug)]
struct Candidate {
    note: ScheduledNote,
    expected_ms: f64,
    resolved: bool,
}

/// Pairs logical key presses with user-played notes.
///
/// A press is judged against, in order of preference:
/// 1. an unresolved note whose tolerance window contains the press
///    (same-column notes first, then the earliest);
/// 2. the user-played note most recently published by the scheduler;
/// 3. the next unresolved note still to come.
///
/// Only a judgement of the first kind resolves its note, and a resolved note
/// is never a candidate again. A press with no candidate yields no verdict.
#[derive(Clone, Debug)]
pub struct InputMatcher {
    keymap: Keymap,
    debouncer: Debouncer,
    profile: TimingProfile,
    candidates: Vec<Candidate>,
    last_published: Option<usize>,
}

impl InputMatcher {
    pub fn new(notes: &[ScheduledNote], keymap: Keymap, profile: TimingProfile) -> Self {
        let mut candidates: Vec<Candidate> = notes
            .iter()
            .filter(|n| n.user_played())
            .map(|n| Candidate {
                note: n.clone(),
                expected_ms: profile.note_due_ms(n.record.start),
                resolved: false,
            })
            .collect();
        candidates.sort_by(|a, b| a.expected_ms.total_cmp(&b.expected_ms));
        Self {
            keymap,
            debouncer: Debouncer::new(profile.debounce_ms),
            profile,
            candidates,
            last_published: None,
        }
    }

    /// Called when the scheduler fires a user-played note's trigger.
    pub fn publish(&mut self, id: NoteId) {
        if let Some(idx) = self.candidates.iter().position(|c| c.note.id == id) {
            self.last_published = Some(idx);
        }
    }

    pub fn unresolved(&self) -> usize {
        self.candidates.iter().filter(|c| !c.resolved).count()
    }

    /// Maps, debounces and judges one raw key press.
    pub fn on_key(&mut self, press: KeyPress) -> Option<Verdict> {
        let event = self.keymap.map_key(press);
        let column = self.debouncer.accept(event)?;
        self.judge(column, event.time_ms)
    }

    fn judge(&mut self, column: Column, key_ms: f64) -> Option<Verdict> {
        let idx = self
            .open_candidate(column, key_ms)
            .or_else(|| self.last_published.filter(|&i| !self.candidates[i].resolved))
            .or_else(|| self.upcoming_candidate(key_ms))?;

        let cand = &mut self.candidates[idx];
        // A resolved note is never judged twice.
        debug_assert!(!cand.resolved);
        let timing_ok = self.profile.within_tolerance(key_ms, cand.expected_ms);
        if timing_ok {
            cand.resolved = true;
        }
        let verdict = Verdict {
            note: cand.note.clone(),
            timing_ok,
            column_ok: cand.note.column == column,
            pressed_column: column,
            key_time_ms: key_ms,
            expected_ms: cand.expected_ms,
        };
        debug!(
            "VERDICT: {:?}, note={}, note_col={}, key_col={}, expected_ms={:.1}, key_ms={:.1}, offset_ms={:+.1}",
            verdict.outcome(),
            verdict.note.id.0,
            verdict.note.column,
            column,
            verdict.expected_ms,
            key_ms,
            verdict.time_error_ms()
        );
        Some(verdict)
    }

    fn open_candidate(&self, column: Column, key_ms: f64) -> Option<usize> {
        let mut open = self
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.resolved && self.profile.within_tolerance(key_ms, c.expected_ms));
        let first = open.next()?;
        if first.1.note.column == column {
            return Some(first.0);
        }
        Some(
            open.find(|(_, c)| c.note.column == column)
                .map_or(first.0, |(i, _)| i),
        )
    }

    fn upcoming_candidate(&self, key_ms: f64) -> Option<usize> {
        self.candidates
            .iter()
            .position(|c| !c.resolved && c.expected_ms > key_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::note::NoteRecord;
    use winit::keyboard::KeyCode;

    fn user_note(id: usize, pitch: i32, start: f64) -> ScheduledNote {
        ScheduledNote::new(
            NoteId(id),
            NoteRecord {
                user_played: true,
                instrument: "piano".to_string(),
                velocity: 0.5,
                pitch,
                start,
                end: start + 0.5,
            },
            16.0,
        )
    }

    fn press(code: KeyCode, time_ms: u64) -> KeyPress {
        KeyPress { code, time_ms }
    }

    fn matcher(notes: &[ScheduledNote]) -> InputMatcher {
        InputMatcher::new(notes, Keymap::default(), TimingProfile::default())
    }

    #[test]
    fn outcome_table() {
        assert_eq!(Outcome::from_flags(true, true), Outcome::Correct);
        assert_eq!(Outcome::from_flags(true, false), Outcome::WrongColumn);
        assert_eq!(Outcome::from_flags(false, true), Outcome::Mistimed);
        assert_eq!(Outcome::from_flags(false, false), Outcome::Miss);
        assert!(Outcome::Correct.scores());
        assert!(!Outcome::WrongColumn.scores());
        assert!(!Outcome::Mistimed.scores());
        assert!(!Outcome::Miss.scores());
    }

    #[test]
    fn press_inside_window_on_right_column_is_correct() {
        // pitch 64 -> column 0 -> KeyD; expected at 3000ms
        let mut m = matcher(&[user_note(0, 64, 1.0)]);
        let v = m.on_key(press(KeyCode::KeyD, 2900)).unwrap();
        assert!(v.timing_ok && v.column_ok);
        assert_eq!(v.expected_ms, 3000.0);
        assert_eq!(m.unresolved(), 0);
    }

    #[test]
    fn wrong_column_inside_window_still_resolves_the_note() {
        let mut m = matcher(&[user_note(0, 64, 1.0)]);
        let v = m.on_key(press(KeyCode::KeyK, 3050)).unwrap();
        assert_eq!(v.outcome(), Outcome::WrongColumn);
        assert_eq!(m.unresolved(), 0);
    }

    #[test]
    fn late_press_pairs_with_last_published_note() {
        let mut m = matcher(&[user_note(0, 64, 1.0)]);
        m.publish(NoteId(0));
        let v = m.on_key(press(KeyCode::KeyD, 3300)).unwrap();
        assert_eq!(v.outcome(), Outcome::Mistimed);
        assert_eq!(v.note.id, NoteId(0));
        assert_eq!(m.unresolved(), 1);
    }

    #[test]
    fn early_press_pairs_with_next_unresolved_note() {
        let mut m = matcher(&[user_note(0, 64, 1.0)]);
        let v = m.on_key(press(KeyCode::KeyF, 1000)).unwrap();
        assert_eq!(v.outcome(), Outcome::Miss);
        assert_eq!(v.note.id, NoteId(0));
    }

    #[test]
    fn chords_prefer_the_pressed_column() {
        let notes = [user_note(0, 64, 1.0), user_note(1, 66, 1.0)];
        let mut m = matcher(&notes);
        let v = m.on_key(press(KeyCode::KeyJ, 3000)).unwrap();
        assert_eq!(v.note.id, NoteId(1));
        assert!(v.column_ok);
        let v = m.on_key(press(KeyCode::KeyD, 3010)).unwrap();
        assert_eq!(v.note.id, NoteId(0));
        assert!(v.column_ok);
        assert_eq!(m.unresolved(), 0);
    }

    #[test]
    fn unmapped_and_repeated_keys_yield_no_verdict() {
        let mut m = matcher(&[user_note(0, 64, 1.0)]);
        assert!(m.on_key(press(KeyCode::Space, 3000)).is_none());
        assert!(m.on_key(press(KeyCode::KeyF, 2990)).is_some());
        assert!(m.on_key(press(KeyCode::KeyF, 3020)).is_none());
    }

    #[test]
    fn resolved_note_is_never_judged_again() {
        let mut m = matcher(&[user_note(0, 64, 1.0)]);
        let v = m.on_key(press(KeyCode::KeyD, 2950)).unwrap();
        assert_eq!(v.outcome(), Outcome::Correct);
        m.publish(NoteId(0));
        // Past the debounce window but still inside the note's tolerance.
        assert!(m.on_key(press(KeyCode::KeyD, 3010)).is_none());
        assert!(m.on_key(press(KeyCode::KeyD, 3080)).is_none());
        assert!(m.on_key(press(KeyCode::KeyJ, 3140)).is_none());
        assert_eq!(m.unresolved(), 0);
    }

    #[test]
    fn press_between_notes_targets_the_next_unresolved_one() {
        let notes = [user_note(0, 64, 1.0), user_note(1, 68, 2.0)];
        let mut m = matcher(&notes);
        m.publish(NoteId(0));
        assert!(m.on_key(press(KeyCode::KeyD, 3000)).unwrap().timing_ok);

        let v = m.on_key(press(KeyCode::KeyD, 3500)).unwrap();
        assert_eq!(v.note.id, NoteId(1));
        assert_eq!(v.outcome(), Outcome::Mistimed);
        assert_eq!(m.unresolved(), 1);

        m.publish(NoteId(1));
        let v = m.on_key(press(KeyCode::KeyD, 4020)).unwrap();
        assert_eq!(v.note.id, NoteId(1));
        assert_eq!(v.outcome(), Outcome::Correct);
        assert_eq!(m.unresolved(), 0);
    }

    #[test]
    fn no_user_notes_means_no_verdicts() {
        let mut m = matcher(&[]);
        assert!(m.on_key(press(KeyCode::KeyD, 3000)).is_none());
    }
}
