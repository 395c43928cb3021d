use crate::core::audio::ToneRequest;
use crate::game::noise::NoiseSource;

// Playable piano range.
pub const PENALTY_PITCH_LOW: i32 = 21;
pub const PENALTY_PITCH_HIGH: i32 = 108;
pub const PENALTY_DURATION_S: (f64, f64) = (0.1, 0.5);
pub const PENALTY_VELOCITY: (f32, f32) = (0.5, 1.0);

/// Picks the penalty tone played for any press that is not fully correct.
///
/// One draw drives every derived value, so voice, pitch, length and
/// loudness are correlated.
pub fn penalty_tone(noise: &mut NoiseSource, voices: &[String]) -> Option<ToneRequest> {
    if voices.is_empty() {
        return None;
    }
    let r = noise.next();
    let voice_idx = ((r * voices.len() as f64) as usize).min(voices.len() - 1);
    let span = (PENALTY_PITCH_HIGH - PENALTY_PITCH_LOW + 1) as f64;
    let pitch = PENALTY_PITCH_LOW + (r * span) as i32;
    let duration_s = PENALTY_DURATION_S.0 + r * (PENALTY_DURATION_S.1 - PENALTY_DURATION_S.0);
    let velocity = PENALTY_VELOCITY.0 + r as f32 * (PENALTY_VELOCITY.1 - PENALTY_VELOCITY.0);

    Some(ToneRequest {
        instrument: voices[voice_idx].clone(),
        pitch: pitch.min(PENALTY_PITCH_HIGH),
        duration_s,
        velocity,
    })
}
