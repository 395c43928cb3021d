use crate::core::audio::{self, SharedVoiceBank, ToneRequest};
use crate::core::input::{KeyPress, Keymap};
use crate::core::render::{Marker, SharedSurface};
use crate::game::end_detector::EndDetector;
use crate::game::judgment::{InputMatcher, Verdict};
use crate::game::noise::NoiseSource;
use crate::game::note::{NoteId, ScheduledNote};
use crate::game::parsing::notes::Timeline;
use crate::game::penalty;
use crate::game::scheduler::{FallPlan, Scheduler, TimelineEvent};
use crate::game::scores::ScoreAggregator;
use crate::game::stage_stats::{StageStats, StageSummary};
use crate::game::timing_windows::{TimingProfile, fall_offset_px};
use log::{debug, info, warn};
use std::collections::HashMap;

#[derive(Debug)]
struct FallingMarker {
    marker: Marker,
    plan: FallPlan,
}

/// Routes scheduled triggers and verdicts to the audio and render
/// collaborators, and owns the three mutable cells of a run: score, noise
/// seed and end state.
pub struct Game {
    notes: Vec<ScheduledNote>,
    profile: TimingProfile,
    scheduler: Scheduler,
    matcher: Option<InputMatcher>,
    score: ScoreAggregator,
    noise: NoiseSource,
    end: EndDetector,
    voices: Vec<String>,
    audio: SharedVoiceBank,
    surface: SharedSurface,
    falling: HashMap<NoteId, FallingMarker>,
    stats: StageStats,
    bad_records: Vec<String>,
    missing_instruments: Vec<String>,
    /// User notes still unresolved when the matcher was torn down.
    unplayed_at_end: usize,
    now_ms: f64,
}

impl Game {
    pub fn new(
        timeline: &Timeline,
        keymap: Keymap,
        profile: TimingProfile,
        noise: NoiseSource,
        audio: SharedVoiceBank,
        surface: SharedSurface,
    ) -> Self {
        let notes = timeline.notes.clone();
        let scheduler = Scheduler::new(&notes, profile);
        let matcher = InputMatcher::new(&notes, keymap, profile);
        let voices: Vec<String> = audio.borrow().voice_names().into_iter().collect();

        // Observers see the initial score before any verdict.
        surface.borrow_mut().show_score(0);

        info!(
            "Game ready: {} notes, {} voices, pre-roll {:.0}ms.",
            notes.len(),
            voices.len(),
            profile.pre_roll_ms
        );

        Self {
            notes,
            profile,
            scheduler,
            matcher: Some(matcher),
            score: ScoreAggregator::new(),
            noise,
            end: EndDetector::new(),
            voices,
            audio,
            surface,
            falling: HashMap::new(),
            stats: StageStats::default(),
            bad_records: timeline.errors.iter().map(ToString::to_string).collect(),
            missing_instruments: timeline.missing_instruments.iter().cloned().collect(),
            unplayed_at_end: 0,
            now_ms: 0.0,
        }
    }

    #[inline(always)]
    pub const fn score(&self) -> u32 {
        self.score.value()
    }

    #[inline(always)]
    pub const fn is_ended(&self) -> bool {
        self.end.is_ended()
    }

    #[inline(always)]
    pub const fn now_ms(&self) -> f64 {
        self.now_ms
    }

    pub const fn profile(&self) -> &TimingProfile {
        &self.profile
    }

    pub fn notes(&self) -> &[ScheduledNote] {
        &self.notes
    }

    pub fn next_due_ms(&self) -> Option<f64> {
        self.scheduler.next_due_ms()
    }

    pub fn falling_markers(&self) -> usize {
        self.falling.len()
    }

    /// Dispatches, in due order, every event due at or before `t_ms`.
    pub fn advance_to(&mut self, t_ms: f64) {
        while let Some((due_ms, event)) = self.scheduler.pop_due(t_ms) {
            self.now_ms = self.now_ms.max(due_ms);
            self.dispatch(due_ms, event);
        }
        if t_ms.is_finite() {
            self.now_ms = self.now_ms.max(t_ms);
        }
    }

    /// Runs the clock forward until the end state is reached.
    pub fn run_to_end(&mut self) {
        self.advance_to(f64::INFINITY);
    }

    /// Feeds one raw key press. Returns the verdict it produced, if any.
    pub fn press(&mut self, press: KeyPress) -> Option<Verdict> {
        self.advance_to(press.time_ms as f64);
        let verdict = self.matcher.as_mut()?.on_key(press)?;
        self.stats.record_verdict(&verdict);

        if let Some(score) = self.score.apply(&verdict) {
            self.surface.borrow_mut().show_score(score);
            let tone = note_tone(&verdict.note);
            self.play(&tone);
        } else {
            self.play_penalty();
        }
        Some(verdict)
    }

    fn dispatch(&mut self, due_ms: f64, event: TimelineEvent) {
        match event {
            TimelineEvent::Sound(id) => self.on_sound(due_ms, id),
            TimelineEvent::AnimationStart(id) => self.on_animation_start(due_ms, id),
            TimelineEvent::AnimationTick(id) => self.on_animation_tick(due_ms, id),
            TimelineEvent::Settle => self.on_settle(due_ms),
        }
    }

    fn on_sound(&mut self, due_ms: f64, id: NoteId) {
        let Some(note) = self.notes.get(id.0) else {
            return;
        };
        if note.user_played() {
            if let Some(m) = self.matcher.as_mut() {
                m.publish(id);
            }
        } else {
            let tone = note_tone(note);
            self.play(&tone);
        }
        if self.scheduler.note_trigger_fired(due_ms) {
            debug!("Last note trigger fired at {due_ms:.0}ms; settling.");
        }
    }

    fn on_animation_start(&mut self, due_ms: f64, id: NoteId) {
        let Some(note) = self.notes.get(id.0) else {
            return;
        };
        let plan = FallPlan::for_note(note, &self.profile);
        let marker = Marker::spawn(&self.surface, note.column);
        if plan.is_finished_at(due_ms) {
            // Zero-length fall: the marker is released as soon as it appears.
            drop(marker);
            return;
        }
        marker.set_y(0.0);
        self.falling.insert(id, FallingMarker { marker, plan });
        self.scheduler.push(
            plan.next_tick_ms(due_ms, self.profile.tick_ms),
            TimelineEvent::AnimationTick(id),
        );
    }

    fn on_animation_tick(&mut self, due_ms: f64, id: NoteId) {
        let Some(falling) = self.falling.get(&id) else {
            return;
        };
        let plan = falling.plan;
        let elapsed = due_ms - plan.start_ms;
        falling.marker.set_y(fall_offset_px(elapsed, plan.duration_ms));
        if plan.is_finished_at(due_ms) {
            self.falling.remove(&id);
        } else {
            self.scheduler.push(
                plan.next_tick_ms(due_ms, self.profile.tick_ms),
                TimelineEvent::AnimationTick(id),
            );
        }
    }

    fn on_settle(&mut self, due_ms: f64) {
        if !self.end.finish(due_ms) {
            return;
        }
        // No verdicts after the end.
        if let Some(m) = self.matcher.take() {
            self.unplayed_at_end = m.unresolved();
        }
        if !self.falling.is_empty() {
            warn!("{} markers still falling at game end; releasing.", self.falling.len());
            self.falling.clear();
        }
        let score = self.score.value();
        self.surface.borrow_mut().show_end_screen(score);
        info!("Final score: {score}");
    }

    fn play(&mut self, tone: &ToneRequest) {
        if !audio::play_tone(&self.audio, tone) {
            self.stats.record_silent(&tone.instrument);
        }
    }

    fn play_penalty(&mut self) {
        match penalty::penalty_tone(&mut self.noise, &self.voices) {
            Some(tone) => {
                self.stats.penalties_played += 1;
                self.play(&tone);
            }
            None => warn!("No voices loaded; penalty tone skipped."),
        }
    }

    pub fn summary(&self) -> StageSummary {
        let user_notes = self.notes.iter().filter(|n| n.user_played()).count();
        StageSummary {
            notes: self.notes.len(),
            user_notes,
            score: self.score.value(),
            verdicts: self.stats.verdicts.clone(),
            penalties_played: self.stats.penalties_played,
            unplayed: self.unplayed(),
            bad_records: self.bad_records.clone(),
            missing_instruments: self.missing_instruments.clone(),
            silent_triggers: self.stats.silent_triggers.clone(),
            ended_at_ms: self.end.ended_at_ms(),
            mean_offset_ms: self.stats.mean_offset_ms(),
        }
    }

    fn unplayed(&self) -> usize {
        self.matcher
            .as_ref()
            .map_or(self.unplayed_at_end, InputMatcher::unresolved)
    }
}

impl Drop for Game {
    fn drop(&mut self) {
        // Release any in-flight visuals before the surface handle goes.
        self.falling.clear();
        self.scheduler.cancel_all();
    }
}

/// The intended tone of a note.
pub fn note_tone(note: &ScheduledNote) -> ToneRequest {
    ToneRequest {
        instrument: note.record.instrument.clone(),
        pitch: note.record.pitch,
        duration_s: note.record.duration_s(),
        velocity: note.record.velocity,
    }
}

/// One correctly timed, correctly columned press per user-played note.
pub fn autoplay_presses(notes: &[ScheduledNote], keymap: &Keymap, profile: &TimingProfile) -> Vec<KeyPress> {
    let mut out: Vec<KeyPress> = notes
        .iter()
        .filter(|n| n.user_played())
        .filter_map(|n| {
            let code = keymap.primary_key(n.column)?;
            Some(KeyPress {
                code,
                time_ms: profile.note_due_ms(n.record.start).round().max(0.0) as u64,
            })
        })
        .collect();
    out.sort_by_key(|p| p.time_ms);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio::LoggingVoiceBank;
    use crate::core::render::LoggingSurface;
    use crate::game::parsing::notes::build;
    use std::cell::RefCell;
    use std::collections::BTreeSet;
    use std::rc::Rc;
    use winit::keyboard::KeyCode;

    const HEADER: &str = "user_played,instrument_name,velocity,pitch,start,end";

    fn game(lines: &[&str]) -> (Game, Rc<RefCell<LoggingSurface>>) {
        let voices: BTreeSet<String> = ["piano".to_string()].into();
        let timeline = build(lines.iter().copied(), &voices, 16.0);
        let surface = Rc::new(RefCell::new(LoggingSurface::default()));
        let audio: SharedVoiceBank = Rc::new(RefCell::new(LoggingVoiceBank::new(["piano"])));
        let g = Game::new(
            &timeline,
            Keymap::default(),
            TimingProfile::default(),
            NoiseSource::new(42),
            audio,
            surface.clone(),
        );
        (g, surface)
    }

    #[test]
    fn markers_fall_and_are_released() {
        let (mut g, surface) = game(&[HEADER, "True,piano,64,64,1.0,1.5"]);
        g.advance_to(1100.0);
        assert_eq!(g.falling_markers(), 1);
        assert_eq!(surface.borrow().live_markers(), 1);
        g.advance_to(3000.0);
        assert_eq!(g.falling_markers(), 0);
        assert_eq!(surface.borrow().live_markers(), 0);
    }

    #[test]
    fn dropping_the_game_mid_fall_releases_markers() {
        let (mut g, surface) = game(&[HEADER, "True,piano,64,64,1.0,1.5"]);
        g.advance_to(2000.0);
        assert_eq!(surface.borrow().live_markers(), 1);
        drop(g);
        assert_eq!(surface.borrow().live_markers(), 0);
    }

    #[test]
    fn no_verdicts_after_the_end() {
        let (mut g, surface) = game(&[HEADER, "True,piano,64,64,1.0,1.5"]);
        g.run_to_end();
        assert!(g.is_ended());
        assert!(surface.borrow().ended);
        assert!(g.press(KeyPress { code: KeyCode::KeyD, time_ms: 3000 }).is_none());
        assert_eq!(g.score(), 0);
    }

    #[test]
    fn autoplay_clears_every_user_note() {
        let lines = [
            HEADER,
            "True,piano,64,64,1.0,1.5",
            "False,piano,64,60,1.2,1.5",
            "True,piano,64,65,1.5,2.0",
            "True,piano,64,67,2.0,2.5",
        ];
        let (mut g, surface) = game(&lines);
        let presses = autoplay_presses(g.notes(), &Keymap::default(), g.profile());
        assert_eq!(presses.len(), 3);
        for p in presses {
            let v = g.press(p).unwrap();
            assert!(v.timing_ok && v.column_ok, "{v:?}");
        }
        g.run_to_end();
        assert_eq!(g.score(), 3);
        assert_eq!(surface.borrow().last_score, 3);
        let summary = g.summary();
        assert_eq!(summary.verdicts.correct, 3);
        assert_eq!(summary.penalties_played, 0);
        assert_eq!(summary.unplayed, 0);
        assert_eq!(summary.ended_at_ms, Some(6000.0));
    }
}
