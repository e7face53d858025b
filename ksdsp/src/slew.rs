//! A slew rate limiter, used for pitch glide

use crate::util::Memo;
use crate::Float;

/// Limits how quickly a value may rise and fall.  Rates are in units per
/// second; the output starts at 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct SlewLimiter<T: Float> {
    rise: T,
    fall: T,
    out: T,
    rates: Memo<T, 2>,
}

impl<T: Float> SlewLimiter<T> {
    /// A limiter with the given rates
    pub fn new(rise: T, fall: T) -> Self {
        let mut ret = Self::default();
        ret.set_rise_fall(rise, fall);
        ret
    }
    /// Set the maximum rise and fall rates.  Negative rates are treated as
    /// zero (the output holds).
    pub fn set_rise_fall(&mut self, rise: T, fall: T) {
        if self.rates.changed([rise, fall]) {
            self.rise = rise.max(T::ZERO);
            self.fall = fall.max(T::ZERO);
        }
    }
    /// Move toward `target` by no more than the rates allow over `dt`
    /// seconds, returning the new output
    #[inline]
    pub fn process(&mut self, dt: T, target: T) -> T {
        let lower = self.out - self.fall * dt;
        let upper = self.out + self.rise * dt;
        self.out = target.max(lower).min(upper);
        self.out
    }
    /// Jump straight to `value`
    pub fn reset(&mut self, value: T) {
        self.out = value;
    }
    /// The current output
    pub fn value(&self) -> T {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rises_and_falls_at_limited_rates() {
        let mut slew = SlewLimiter::new(8.0f32, 4.0);
        assert_eq!(slew.process(0.125, 10.0), 1.0);
        assert_eq!(slew.process(0.125, 10.0), 2.0);
        assert_eq!(slew.process(0.125, -10.0), 1.5);
        assert_eq!(slew.process(0.125, 1.4), 1.4);
        slew.reset(-3.0);
        assert_eq!(slew.value(), -3.0);
    }

    #[test]
    fn reaches_target_and_holds() {
        let mut slew = SlewLimiter::new(1000.0f64, 1000.0);
        let mut out = 0.0;
        for _ in 0..100 {
            out = slew.process(1.0 / 44100.0, 0.5);
        }
        assert_eq!(out, 0.5);
        slew.set_rise_fall(-1.0, -1.0);
        assert_eq!(slew.process(1.0, 100.0), 0.5);
    }
}
