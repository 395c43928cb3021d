use serde::Serialize;
use std::collections::BTreeMap;

use crate::game::judgment::{Outcome, Verdict};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VerdictCounts {
    pub correct: u32,
    pub wrong_column: u32,
    pub mistimed: u32,
    pub miss: u32,
}

impl VerdictCounts {
    pub fn record(&mut self, outcome: Outcome) {
        let slot = match outcome {
            Outcome::Correct => &mut self.correct,
            Outcome::WrongColumn => &mut self.wrong_column,
            Outcome::Mistimed => &mut self.mistimed,
            Outcome::Miss => &mut self.miss,
        };
        *slot = slot.saturating_add(1);
    }

    pub const fn total(&self) -> u32 {
        self.correct + self.wrong_column + self.mistimed + self.miss
    }
}

/// Everything worth reporting once a run is over.
#[derive(Clone, Debug, Default, Serialize)]
pub struct StageSummary {
    pub notes: usize,
    pub user_notes: usize,
    pub score: u32,
    pub verdicts: VerdictCounts,
    pub penalties_played: u32,
    /// User-played notes nobody pressed inside their window.
    pub unplayed: usize,
    pub bad_records: Vec<String>,
    pub missing_instruments: Vec<String>,
    /// Triggers per instrument that found no voice.
    pub silent_triggers: BTreeMap<String, u32>,
    pub ended_at_ms: Option<f64>,
    pub mean_offset_ms: Option<f64>,
}

/// Running tallies gathered while a game plays.
#[derive(Clone, Debug, Default)]
pub struct StageStats {
    pub verdicts: VerdictCounts,
    pub penalties_played: u32,
    pub silent_triggers: BTreeMap<String, u32>,
    offset_sum_ms: f64,
    offset_count: u32,
}

impl StageStats {
    pub fn record_verdict(&mut self, verdict: &Verdict) {
        self.verdicts.record(verdict.outcome());
        if verdict.timing_ok {
            self.offset_sum_ms += verdict.time_error_ms();
            self.offset_count += 1;
        }
    }

    pub fn record_silent(&mut self, instrument: &str) {
        *self.silent_triggers.entry(instrument.to_string()).or_default() += 1;
    }

    /// Mean signed offset of in-window presses. Negative means early.
    pub fn mean_offset_ms(&self) -> Option<f64> {
        (self.offset_count > 0).then(|| self.offset_sum_ms / f64::from(self.offset_count))
    }
}
