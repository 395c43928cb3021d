use crate::game::judgment::Verdict;

/// Left fold of verdicts into the score: +1 per fully correct verdict.
///
/// Starts at 0 and never decreases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScoreAggregator {
    value: u32,
}

impl ScoreAggregator {
    pub const fn new() -> Self {
        Self { value: 0 }
    }

    #[inline(always)]
    pub const fn value(&self) -> u32 {
        self.value
    }

    /// Folds one verdict in. Returns the new score when it changed.
    pub fn apply(&mut self, verdict: &Verdict) -> Option<u32> {
        if verdict.outcome().scores() {
            self.value = self.value.saturating_add(1);
            Some(self.value)
        } else {
            None
        }
    }
}

/// Score after folding a whole verdict stream.
pub fn fold_score<'a, I>(verdicts: I) -> u32
where
    I: IntoIterator<Item = &'a Verdict>,
{
    verdicts.into_iter().fold(ScoreAggregator::new(), |mut acc, v| {
        acc.apply(v);
        acc
    })
    .value()
}
