//! Various utility functions and helpful constants

use crate::Float;

/// Relative tolerance used when deciding whether a parameter has changed
/// enough to re-derive the state that depends on it
pub const PARAM_TOLERANCE: f32 = 1e-6;

/// Linear interpolation: returns `v0` at `frac == 0` and `v1` at `frac == 1`
#[inline]
pub fn linear_interpolate<T: Float>(v0: T, v1: T, frac: T) -> T {
    frac * (v1 - v0) + v0
}

/// Equal-gain crossfade from `dry` (`mix == 0`) to `wet` (`mix == 1`)
#[inline]
pub fn crossfade<T: Float>(dry: T, wet: T, mix: T) -> T {
    linear_interpolate(dry, wet, mix)
}

/// Force `x` into `[lo, hi]`.  NaN maps to `lo`.
#[inline]
pub fn clamp<T: Float>(x: T, lo: T, hi: T) -> T {
    x.max(lo).min(hi)
}

/// Replace NaN and infinities with 0
#[inline]
pub fn sanitize<T: Float>(x: T) -> T {
    if x.is_finite() {
        x
    } else {
        T::ZERO
    }
}

/// Returns true if `a` and `b` are within `delta` of each other
#[inline]
pub fn are_same<T: Float>(a: T, b: T, delta: T) -> bool {
    (a - b).abs() <= delta
}

/// Convert a linear gain to decibels
pub fn db<T: Float>(gain: T) -> T {
    T::TWENTY * gain.log10()
}

/// Convert decibels to a linear gain
pub fn gain_from_db<T: Float>(db: T) -> T {
    T::TEN.powf(db / T::TWENTY)
}

/// A cheap rational approximation of `tanh`, accurate near zero and clamped
/// to `[-1, 1]` where the approximation would overshoot
pub fn fast_tanh<T: Float>(x: T) -> T {
    let x2 = x * x;
    let n27 = T::from_u16(27);
    let n9 = T::from_u16(9);
    let y = x * (n27 + x2) / (n27 + n9 * x2);
    clamp(y, -T::ONE, T::ONE)
}

/// Stores the last set of parameters some derived state (filter
/// coefficients, time constants, ...) was computed from.
///
/// Call [Memo::changed] with the current parameters before re-deriving:
/// it returns false when every value is within [PARAM_TOLERANCE] (relative)
/// of the stored value, and otherwise records the new values and returns
/// true.
#[derive(Clone, Copy, Debug, Default)]
pub struct Memo<T: Float, const N: usize> {
    last: Option<[T; N]>,
}

impl<T: Float, const N: usize> Memo<T, N> {
    /// Create an empty memo.  The first call to [Memo::changed] always
    /// reports a change.
    pub const fn new() -> Self {
        Self { last: None }
    }
    /// Check `values` against the stored parameters, recording them if they
    /// differ
    pub fn changed(&mut self, values: [T; N]) -> bool {
        let tol = T::from_f32(PARAM_TOLERANCE);
        let same = self.last.is_some_and(|last| {
            last.iter().zip(values.iter()).all(|(&a, &b)| {
                let scale = T::ONE.max(a.abs()).max(b.abs());
                are_same(a, b, tol * scale)
            })
        });
        if !same {
            self.last = Some(values);
        }
        !same
    }
    /// Forget the stored parameters, forcing the next check to report a
    /// change
    pub fn invalidate(&mut self) {
        self.last = None;
    }
    /// The last recorded parameters, if any
    pub fn last(&self) -> Option<[T; N]> {
        self.last
    }
}

/// Detects sign changes in a signal
#[derive(Clone, Copy, Debug, Default)]
pub struct ZeroCrossing {
    last_positive: bool,
}

impl ZeroCrossing {
    /// Returns true if `x` has a different sign than the previous sample
    /// (zero counts as negative)
    pub fn process<T: Float>(&mut self, x: T) -> bool {
        let positive = x > T::ZERO;
        let ret = positive != self.last_positive;
        self.last_positive = positive;
        ret
    }
}

// currently the only users of these functions are unit tests

/// Root mean square of the differences between each pair
#[cfg(test)]
pub fn rms_error(samples: impl Iterator<Item = (f32, f32)>) -> f32 {
    let mut error = 0.0;
    let mut count = 0;
    for (a, b) in samples {
        error += (a - b) * (a - b);
        count += 1;
    }
    (error / count.max(1) as f32).sqrt()
}

/// Sum of squares of the last `tail` samples of `signal`
#[cfg(test)]
pub fn tail_energy(signal: &[f32], tail: usize) -> f32 {
    signal[signal.len().saturating_sub(tail)..]
        .iter()
        .map(|x| x * x)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_round_trip() {
        assert!(db(1.0f32).abs() < 1e-6);
        assert!((db(0.5f32) + 6.0206).abs() < 1e-3);
        assert!((gain_from_db(-6.0206f32) - 0.5).abs() < 1e-4);
        assert!((gain_from_db(db(0.25f64)) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn fast_tanh_tracks_tanh() {
        let error = rms_error((-300..=300).map(|i| {
            let x = i as f32 / 100.0;
            (fast_tanh(x), x.tanh())
        }));
        assert!(error < 0.03);
        assert_eq!(fast_tanh(100.0f32), 1.0);
        assert_eq!(fast_tanh(-100.0f32), -1.0);
    }

    #[test]
    fn interpolation_endpoints() {
        assert_eq!(linear_interpolate(2.0f32, 4.0, 0.0), 2.0);
        assert_eq!(linear_interpolate(2.0f32, 4.0, 1.0), 4.0);
        assert_eq!(linear_interpolate(2.0f32, 4.0, 0.25), 2.5);
        assert_eq!(crossfade(-1.0f32, 1.0, 1.0), 1.0);
    }

    #[test]
    fn clamp_and_sanitize() {
        assert_eq!(clamp(5.0f32, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-5.0f32, 0.0, 1.0), 0.0);
        assert_eq!(clamp(f32::NAN, -1.0, 1.0), -1.0);
        assert_eq!(sanitize(f32::NAN), 0.0);
        assert_eq!(sanitize(f64::NEG_INFINITY), 0.0);
        assert_eq!(sanitize(0.5f32), 0.5);
    }

    #[test]
    fn memo_tracks_changes_beyond_tolerance() {
        let mut memo = Memo::<f32, 2>::new();
        assert!(memo.changed([44100.0, 1000.0]));
        assert!(!memo.changed([44100.0, 1000.0]));
        assert!(!memo.changed([44100.0, 1000.0001]));
        assert!(memo.changed([44100.0, 1001.0]));
        assert_eq!(memo.last(), Some([44100.0, 1001.0]));
        memo.invalidate();
        assert!(memo.changed([44100.0, 1001.0]));
    }

    #[test]
    fn zero_crossings_of_a_square() {
        let mut zc = ZeroCrossing::default();
        let crossings = (0..40)
            .map(|i| if (i / 5) % 2 == 0 { 1.0f32 } else { -1.0 })
            .filter(|&x| zc.process(x))
            .count();
        assert_eq!(crossings, 8);
    }
}
