// Seeded linear congruential generator.
//
//   seed' = (seed * 9301 + 49297) mod 233280
//   out   = seed' / 233280

const MULTIPLIER: u64 = 9301;
const INCREMENT: u64 = 49297;
const MODULUS: u64 = 233_280;

/// Reproducible noise in [0, 1). Sole owner of its seed.
#[derive(Debug, Clone)]
pub struct NoiseSource {
    seed: u64,
}

impl NoiseSource {
    pub const fn new(seed: u64) -> Self {
        Self {
            seed: seed % MODULUS,
        }
    }

    /// Seeds from the wall clock, as production play does.
    pub fn from_wall_clock() -> Self {
        let millis = chrono::Utc::now().timestamp_millis().unsigned_abs();
        Self::new(millis)
    }

    #[inline(always)]
    pub fn next(&mut self) -> f64 {
        self.seed = (self.seed * MULTIPLIER + INCREMENT) % MODULUS;
        self.seed as f64 / MODULUS as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_draws_for_seed_zero() {
        let mut n = NoiseSource::new(0);
        assert_eq!(n.next(), 49297.0 / 233280.0);
        // (49297 * 9301 + 49297) % 233280
        assert_eq!(n.next(), 165_494.0 / 233_280.0);
    }

    proptest! {
        #[test]
        fn same_seed_same_sequence(seed in any::<u64>(), n in 1usize..256) {
            let mut a = NoiseSource::new(seed);
            let mut b = NoiseSource::new(seed);
            for _ in 0..n {
                prop_assert_eq!(a.next().to_bits(), b.next().to_bits());
            }
        }

        #[test]
        fn draws_stay_in_unit_interval(seed in any::<u64>()) {
            let mut noise = NoiseSource::new(seed);
            for _ in 0..64 {
                let v = noise.next();
                prop_assert!((0.0..1.0).contains(&v), "draw {} out of range", v);
            }
        }
    }
}
