//! Sources of uniform random numbers.
//!
//! Composites draw their randomness (initial oscillator phases, the string
//! stretch decision, noise) through [RandomSource] so tests can substitute
//! a seeded generator or a scripted sequence.

use oorandom::Rand32;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Default random seed to use if not provided a seed
pub const RANDOM_SEED: u64 = 0xce607a9d25ec3d88u64; //random 64 bit integer

/// A stream of uniformly distributed numbers
pub trait RandomSource {
    /// The next number, in `[0, 1)`
    fn next_unit(&mut self) -> f32;
}

impl RandomSource for Rand32 {
    fn next_unit(&mut self) -> f32 {
        self.rand_float()
    }
}

impl RandomSource for SmallRng {
    fn next_unit(&mut self) -> f32 {
        self.gen::<f32>()
    }
}

/// Constructs per-channel random sources from a seed
pub trait SeededSource: RandomSource + Sized {
    /// Create a source from `seed`
    fn with_seed(seed: u64) -> Self;
}

impl SeededSource for Rand32 {
    fn with_seed(seed: u64) -> Self {
        Rand32::new(seed)
    }
}

impl SeededSource for SmallRng {
    fn with_seed(seed: u64) -> Self {
        SmallRng::seed_from_u64(seed)
    }
}

/// Derive the seed for `channel` from a base seed, so that channels get
/// independent (but reproducible) streams
pub const fn channel_seed(seed: u64, channel: usize) -> u64 {
    seed ^ (channel as u64).wrapping_mul(0x9e3779b97f4a7c15)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_range<R: RandomSource>(mut r: R) {
        for _ in 0..10000 {
            let x = r.next_unit();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn sources_stay_in_unit_interval() {
        check_range(Rand32::with_seed(RANDOM_SEED));
        check_range(SmallRng::with_seed(RANDOM_SEED));
    }

    #[test]
    fn seeded_sources_repeat() {
        let mut a = Rand32::with_seed(5);
        let mut b = Rand32::with_seed(5);
        for _ in 0..100 {
            assert_eq!(a.next_unit(), b.next_unit());
        }
        assert_ne!(channel_seed(5, 0), channel_seed(5, 1));
        assert_eq!(channel_seed(5, 0), 5);
    }
}
