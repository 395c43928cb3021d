// Shared timing definitions to keep scheduling, judging and visuals in sync.

// All base values are in milliseconds.
pub const BASE_PRE_ROLL_MS: f64 = 2000.0;
pub const BASE_SETTLE_MS: f64 = 2000.0;
pub const BASE_TOLERANCE_MS: f64 = 150.0;
pub const BASE_DEBOUNCE_MS: f64 = 50.0;
pub const BASE_TICK_MS: f64 = 16.0;

// Fall geometry, in pixels.
pub const BOTTOM_ROW_PX: f64 = 600.0;
pub const MARKER_RADIUS_PX: f64 = 25.0;

// Remaining fall distance maps linearly onto fall duration.
const FALL_DISTANCE_DIVISOR: f64 = 1.25;
const FALL_DURATION_SCALE: f64 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingProfile {
    pub pre_roll_ms: f64,
    pub settle_ms: f64,
    pub tolerance_ms: f64,
    pub debounce_ms: f64,
    pub tick_ms: f64,
}

impl Default for TimingProfile {
    fn default() -> Self {
        Self {
            pre_roll_ms: BASE_PRE_ROLL_MS,
            settle_ms: BASE_SETTLE_MS,
            tolerance_ms: BASE_TOLERANCE_MS,
            debounce_ms: BASE_DEBOUNCE_MS,
            tick_ms: BASE_TICK_MS,
        }
    }
}

impl TimingProfile {
    /// Instant (ms after game start) at which a note starting at `start_s` is due.
    #[inline(always)]
    pub fn note_due_ms(&self, start_s: f64) -> f64 {
        self.pre_roll_ms + start_s * 1000.0
    }

    #[inline(always)]
    pub fn within_tolerance(&self, key_ms: f64, expected_ms: f64) -> bool {
        (key_ms - expected_ms).abs() <= self.tolerance_ms
    }
}

/// Fall duration for a marker whose note starts at `start_s`.
///
/// Clamped at zero: a note starting past the bottom row has no fall at all.
#[inline(always)]
pub fn fall_duration_ms(start_s: f64) -> f64 {
    ((BOTTOM_ROW_PX - start_s) / FALL_DISTANCE_DIVISOR * FALL_DURATION_SCALE).max(0.0)
}

/// Vertical offset of a falling marker after `elapsed_ms` of a `duration_ms` fall.
#[inline(always)]
pub fn fall_offset_px(elapsed_ms: f64, duration_ms: f64) -> f64 {
    if duration_ms <= 0.0 {
        return BOTTOM_ROW_PX + MARKER_RADIUS_PX;
    }
    (elapsed_ms / duration_ms).clamp(0.0, 1.0) * (BOTTOM_ROW_PX + MARKER_RADIUS_PX)
}
