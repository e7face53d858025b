//! Dynamics processing: an envelope-following compressor/limiter evaluated
//! at a reduced rate, and a soft-knee saturator.

use crate::util::Memo;
use crate::Float;
use serde::{Deserialize, Serialize};

/// Gates work to every Nth call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockDivider {
    division: u32,
    clock: u32,
}

impl ClockDivider {
    /// Create a divider that fires on every `division`th call.
    ///
    /// # Panics
    ///
    /// Panics if `division` is zero.
    pub const fn new(division: u32) -> Self {
        assert!(division > 0, "clock division must be at least 1");
        Self { division, clock: 0 }
    }
    /// Count one call, returning true on every `division`th one
    #[inline]
    pub fn process(&mut self) -> bool {
        self.clock += 1;
        if self.clock >= self.division {
            self.clock = 0;
            true
        } else {
            false
        }
    }
    /// Restart the count
    pub fn reset(&mut self) {
        self.clock = 0;
    }
    /// The division ratio
    pub const fn division(&self) -> u32 {
        self.division
    }
}

/// The compressor updates its envelope and gain once per this many samples
pub const COMPRESSOR_DIVISION: u32 = 4;

/// Time constant of the envelope follower: ln(0.368), the fraction a
/// capacitor discharges to in one time constant
const TC: f64 = -0.9996723408;

/// Floor on the envelope so the detector never takes the log of zero
const ENV_FLOOR: f64 = 1e-11;

/// Configuration of a [Compressor]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorParams<T> {
    /// Attack time, in seconds
    pub attack: T,
    /// Release time, in seconds
    pub release: T,
    /// Compression ratio above the threshold (at least 1)
    pub ratio: T,
    /// Threshold, in dB
    pub threshold: T,
}

impl<T: Float> Default for CompressorParams<T> {
    fn default() -> Self {
        Self {
            attack: T::from_f32(0.0001),
            release: T::from_f32(0.025),
            ratio: T::from_f32(10.5),
            threshold: T::ZERO,
        }
    }
}

/// A hard-knee compressor driven by an asymmetric envelope follower.
///
/// The envelope and gain are updated every [COMPRESSOR_DIVISION] samples,
/// while the most recent gain is applied to every sample.  The gain starts
/// at unity.
#[derive(Clone, Copy, Debug)]
pub struct Compressor<T: Float> {
    params: CompressorParams<T>,
    attack_coeff: T,
    release_coeff: T,
    last_env: T,
    sample_rate: T,
    gain: T,
    divider: ClockDivider,
    coeffs: Memo<T, 3>,
}

impl<T: Float> Default for Compressor<T> {
    fn default() -> Self {
        Self::new(CompressorParams::default())
    }
}

impl<T: Float> Compressor<T> {
    /// Create a compressor running at 44.1kHz
    pub fn new(params: CompressorParams<T>) -> Self {
        let mut ret = Self {
            params,
            attack_coeff: T::ZERO,
            release_coeff: T::ZERO,
            last_env: T::ZERO,
            sample_rate: T::ONE,
            gain: T::ONE,
            divider: ClockDivider::new(COMPRESSOR_DIVISION),
            coeffs: Memo::new(),
        };
        ret.set_sample_rate(T::from_u16(44100));
        ret
    }
    fn calc_coeffs(&mut self) {
        let key = [self.sample_rate, self.params.attack, self.params.release];
        if self.coeffs.changed(key) {
            let tc = T::from_f64(TC);
            self.attack_coeff = (tc / (self.sample_rate * self.params.attack)).exp();
            self.release_coeff = (tc / (self.sample_rate * self.params.release)).exp();
        }
    }
    /// Set the audio sample rate.  The detector runs at a fraction of it.
    pub fn set_sample_rate(&mut self, sample_rate: T) {
        self.sample_rate = sample_rate / T::from_u16(COMPRESSOR_DIVISION as u16);
        self.calc_coeffs();
    }
    /// Set the attack and release times, in seconds.  A time of zero makes
    /// the envelope follow that direction instantly.
    pub fn set_times(&mut self, attack: T, release: T) {
        self.params.attack = attack.max(T::ZERO);
        self.params.release = release.max(T::ZERO);
        self.calc_coeffs();
    }
    /// Set the threshold, in dB
    pub fn set_threshold(&mut self, threshold: T) {
        self.params.threshold = threshold;
    }
    /// Set the compression ratio (clamped to at least 1)
    pub fn set_ratio(&mut self, ratio: T) {
        self.params.ratio = ratio.max(T::ONE);
    }
    /// Replace every parameter at once
    pub fn set_params(&mut self, params: CompressorParams<T>) {
        self.set_threshold(params.threshold);
        self.set_ratio(params.ratio);
        self.set_times(params.attack, params.release);
    }
    /// The current configuration
    pub fn params(&self) -> &CompressorParams<T> {
        &self.params
    }
    /// The gain currently being applied
    pub fn gain(&self) -> T {
        self.gain
    }
    /// The current envelope level
    pub fn envelope(&self) -> T {
        self.last_env
    }
    /// Return the envelope and gain to their initial state
    pub fn reset(&mut self) {
        self.last_env = T::ZERO;
        self.gain = T::ONE;
        self.divider.reset();
    }
    /// Compress one sample
    #[inline]
    pub fn process(&mut self, x: T) -> T {
        if self.divider.process() {
            let rect = x.abs();
            let coeff = if rect > self.last_env {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            let env = (coeff * (self.last_env - rect) + rect).max(T::from_f64(ENV_FLOOR));
            self.last_env = env;

            let level = T::TWENTY * env.log10();
            let threshold = self.params.threshold;
            let compressed = if level <= threshold {
                level
            } else {
                threshold + (level - threshold) / self.params.ratio
            };
            self.gain = T::TEN.powf((compressed - level) / T::TWENTY);
        }
        x * self.gain
    }
}

/// Soft-knee clipper: the identity below `max - knee`, a quadratic knee up
/// to `max`, and `±max` beyond.  NaN maps to 0.
pub fn saturate<T: Float>(x: T, max: T, knee: T) -> T {
    if x.is_nan() {
        return T::ZERO;
    }
    let mag = x.abs();
    if mag < max - knee {
        x
    } else if mag < max {
        let half_knee = knee * T::ONE_HALF;
        if x > T::ZERO {
            let over = x - max + half_knee;
            x - over * over / (T::TWO * knee)
        } else {
            let over = x + max - half_knee;
            x + over * over / (T::TWO * knee)
        }
    } else if x > T::ZERO {
        max
    } else {
        -max
    }
}

/// Saturate a signal to the ±11.7V range of a modular output
pub fn voltage_saturate<T: Float>(x: T) -> T {
    saturate(x, T::from_f32(11.7), T::ONE_HALF)
}

/// [saturate] with a stored limit and knee width
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Saturator<T> {
    /// Output limit
    pub max: T,
    /// Width of the knee below the limit
    pub knee: T,
}

impl<T: Float> Saturator<T> {
    /// Create a saturator
    pub fn new(max: T, knee: T) -> Self {
        Self { max, knee }
    }
    /// Saturate one sample
    #[inline]
    pub fn process(&self, x: T) -> T {
        saturate(x, self.max, self.knee)
    }
}

impl<T: Float> Default for Saturator<T> {
    fn default() -> Self {
        Self::new(T::ONE, T::from_f32(0.05))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::gain_from_db;

    fn settle(comp: &mut Compressor<f32>, level: f32) -> f32 {
        for _ in 0..20000 {
            comp.process(level);
        }
        comp.gain()
    }

    fn compressor(threshold: f32) -> Compressor<f32> {
        Compressor::new(CompressorParams {
            threshold,
            ..Default::default()
        })
    }

    #[test]
    fn divider_fires_every_nth_call() {
        let mut div = ClockDivider::new(4);
        let fired: [bool; 8] = core::array::from_fn(|_| div.process());
        assert_eq!(fired, [false, false, false, true, false, false, false, true]);
        let mut every = ClockDivider::new(1);
        assert!(every.process() && every.process());
    }

    #[test]
    #[should_panic]
    fn zero_division_is_a_fault() {
        let _ = ClockDivider::new(0);
    }

    #[test]
    fn steady_state_gain_above_threshold() {
        let mut comp = compressor(-6.0);
        let expected = gain_from_db((-6.0 + (0.0 + 6.0) / 10.5) - 0.0f32);
        let gain = settle(&mut comp, 1.0);
        assert!((gain - expected).abs() < 1e-4, "{} vs {}", gain, expected);
        assert!((comp.envelope() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn unity_gain_below_threshold() {
        let mut comp = compressor(-6.0);
        assert_eq!(settle(&mut comp, 0.25), 1.0);
        assert_eq!(settle(&mut comp, -0.25), 1.0);
    }

    #[test]
    fn gain_falls_as_level_rises() {
        let mut last = 1.0;
        for level in [0.6, 0.8, 1.0, 2.0, 4.0] {
            let gain = settle(&mut compressor(-6.0), level);
            assert!(gain < last, "level {} gain {}", level, gain);
            last = gain;
        }
    }

    #[test]
    fn gain_only_updates_on_divider_ticks() {
        let mut comp = compressor(-20.0);
        comp.set_times(0.0, 0.1);
        let gains: [f32; 4] = core::array::from_fn(|_| {
            comp.process(1.0);
            comp.gain()
        });
        assert_eq!(gains[0], 1.0);
        assert_eq!(gains[2], 1.0);
        assert!(gains[3] < 1.0);
        // instant attack reaches the final envelope on the first tick
        assert_eq!(comp.envelope(), 1.0);
        comp.reset();
        assert_eq!(comp.gain(), 1.0);
        assert_eq!(comp.envelope(), 0.0);
    }

    #[test]
    fn parameters_are_sanitized() {
        let mut comp = compressor(-6.0);
        comp.set_ratio(0.1);
        comp.set_times(-1.0, -1.0);
        assert_eq!(comp.params().ratio, 1.0);
        assert_eq!(comp.params().attack, 0.0);
        let gain = settle(&mut comp, 1.0);
        assert!((gain - 1.0).abs() < 1e-6);
    }

    #[test]
    fn saturator_regions() {
        for sat in [Saturator::default(), Saturator::new(11.7f32, 0.5)] {
            let (max, knee) = (sat.max, sat.knee);
            for i in 0..1000 {
                let x = (max - knee) * (i as f32 / 1000.0);
                assert_eq!(sat.process(x), x);
                assert_eq!(sat.process(-x), -x);
            }
            for i in 0..1000 {
                let x = max - knee * (i as f32 / 1000.0) * 0.98;
                let y = sat.process(x);
                assert!(y <= max && y >= max - knee - 0.05);
                let y = sat.process(-x);
                assert!(y >= -max && y <= -(max - knee) + 0.05);
            }
            for x in [max, max + 0.5, max * 20.0, f32::INFINITY] {
                assert_eq!(sat.process(x), max);
                assert_eq!(sat.process(-x), -max);
            }
            assert_eq!(sat.process(f32::NAN), 0.0);
        }
    }

    #[test]
    fn voltage_saturation_matches_saturator() {
        let sat = Saturator::new(11.7f32, 0.5);
        for i in -1500..1500 {
            let x = i as f32 / 10.0;
            assert_eq!(voltage_saturate(x), sat.process(x));
        }
    }
}
