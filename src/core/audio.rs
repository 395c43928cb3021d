use crate::game::error::PlaybackError;
use log::{info, warn};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

/* ============================== Public API ============================== */

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
const A4_MIDI: i32 = 69;
const A4_HZ: f64 = 440.0;

/// Equal-tempered frequency of a MIDI pitch.
#[inline(always)]
pub fn midi_to_frequency(pitch: i32) -> f64 {
    A4_HZ * 2.0_f64.powf(f64::from(pitch - A4_MIDI) / 12.0)
}

/// Scientific pitch name of a MIDI pitch, e.g. 60 -> "C4".
pub fn midi_to_note_name(pitch: i32) -> String {
    let name = NOTE_NAMES[pitch.rem_euclid(12) as usize];
    let octave = pitch.div_euclid(12) - 1;
    format!("{name}{octave}")
}

/// One attack/release request addressed to a named voice.
#[derive(Clone, Debug, PartialEq)]
pub struct ToneRequest {
    pub instrument: String,
    pub pitch: i32,
    pub duration_s: f64,
    pub velocity: f32,
}

impl ToneRequest {
    #[inline(always)]
    pub fn frequency_hz(&self) -> f64 {
        midi_to_frequency(self.pitch)
    }

    #[inline(always)]
    pub fn note_name(&self) -> String {
        midi_to_note_name(self.pitch)
    }
}

/// The audio collaborator: a bank of sampled voices addressable by name.
///
/// Implementations must tolerate overlapping triggers on the same voice.
pub trait VoiceBank {
    fn voice_names(&self) -> BTreeSet<String>;

    fn has_voice(&self, name: &str) -> bool {
        self.voice_names().contains(name)
    }

    fn trigger_attack_release(&mut self, tone: &ToneRequest) -> Result<(), PlaybackError>;
}

pub type SharedVoiceBank = Rc<RefCell<dyn VoiceBank>>;

/// Plays a tone, recovering locally from a missing voice.
pub fn play_tone(bank: &SharedVoiceBank, tone: &ToneRequest) -> bool {
    match bank.borrow_mut().trigger_attack_release(tone) {
        Ok(()) => true,
        Err(e) => {
            warn!("Skipped tone {} on '{}': {e}", tone.note_name(), tone.instrument);
            false
        }
    }
}

/* ============================ Headless backend ============================ */

/// Voice bank with no sound output; logs each trigger instead.
#[derive(Debug, Clone, Default)]
pub struct LoggingVoiceBank {
    voices: BTreeSet<String>,
    triggered: u64,
}

impl LoggingVoiceBank {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let voices: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        info!("Voice bank ready ({} voices).", voices.len());
        Self {
            voices,
            triggered: 0,
        }
    }

    pub const fn triggered(&self) -> u64 {
        self.triggered
    }
}

impl VoiceBank for LoggingVoiceBank {
    fn voice_names(&self) -> BTreeSet<String> {
        self.voices.clone()
    }

    fn has_voice(&self, name: &str) -> bool {
        self.voices.contains(name)
    }

    fn trigger_attack_release(&mut self, tone: &ToneRequest) -> Result<(), PlaybackError> {
        if !self.has_voice(&tone.instrument) {
            return Err(PlaybackError::MissingVoice {
                instrument: tone.instrument.clone(),
            });
        }
        self.triggered += 1;
        info!(
            "TONE: voice={}, note={}, freq_hz={:.2}, duration_s={:.3}, velocity={:.3}",
            tone.instrument,
            tone.note_name(),
            tone.frequency_hz(),
            tone.duration_s,
            tone.velocity
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_names_follow_scientific_pitch() {
        assert_eq!(midi_to_note_name(60), "C4");
        assert_eq!(midi_to_note_name(61), "C#4");
        assert_eq!(midi_to_note_name(64), "E4");
        assert_eq!(midi_to_note_name(21), "A0");
        assert_eq!(midi_to_note_name(108), "C8");
    }

    #[test]
    fn frequencies_are_equal_tempered() {
        assert!((midi_to_frequency(69) - 440.0).abs() < 1e-9);
        assert!((midi_to_frequency(81) - 880.0).abs() < 1e-9);
        assert!((midi_to_frequency(64) - 329.627_556_9).abs() < 1e-6);
    }

    #[test]
    fn logging_bank_rejects_unknown_voices() {
        let mut bank = LoggingVoiceBank::new(["piano"]);
        assert!(bank.has_voice("piano"));
        assert!(!bank.has_voice("kazoo"));
        let mut tone = ToneRequest {
            instrument: "piano".to_string(),
            pitch: 60,
            duration_s: 0.25,
            velocity: 0.8,
        };
        assert!(bank.trigger_attack_release(&tone).is_ok());
        tone.instrument = "kazoo".to_string();
        assert_eq!(
            bank.trigger_attack_release(&tone),
            Err(PlaybackError::MissingVoice {
                instrument: "kazoo".to_string()
            })
        );
        assert_eq!(bank.triggered(), 1);
    }

    #[test]
    fn play_tone_recovers_from_missing_voice() {
        let bank: SharedVoiceBank = Rc::new(RefCell::new(LoggingVoiceBank::new(["piano"])));
        let tone = ToneRequest {
            instrument: "organ".to_string(),
            pitch: 60,
            duration_s: 0.25,
            velocity: 0.8,
        };
        assert!(!play_tone(&bank, &tone));
    }
}
