use log::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Running,
    Ended,
}

/// One-shot `Running -> Ended` latch.
#[derive(Clone, Copy, Debug)]
pub struct EndDetector {
    phase: Phase,
    ended_at_ms: Option<f64>,
}

impl Default for EndDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl EndDetector {
    pub const fn new() -> Self {
        Self {
            phase: Phase::Running,
            ended_at_ms: None,
        }
    }

    #[inline(always)]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[inline(always)]
    pub const fn is_ended(&self) -> bool {
        matches!(self.phase, Phase::Ended)
    }

    pub const fn ended_at_ms(&self) -> Option<f64> {
        self.ended_at_ms
    }

    /// Returns `true` only for the call that performs the transition.
    pub fn finish(&mut self, now_ms: f64) -> bool {
        if self.is_ended() {
            return false;
        }
        self.phase = Phase::Ended;
        self.ended_at_ms = Some(now_ms);
        info!("Game ended at {now_ms:.0}ms.");
        true
    }
}
