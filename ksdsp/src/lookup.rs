//! Lookup-table approximations of transcendental functions.
//!
//! A [Table] samples a function at a fixed interval over a bounded domain
//! and evaluates it by linear interpolation between neighbouring samples.
//! The tables are built once (they are comparatively expensive to
//! construct) and are read-only afterwards, so a single [Lookup] can be
//! shared by reference between every voice and lane that needs it.

use crate::util::linear_interpolate;
use crate::{Float, LANES};
use alloc::vec::Vec;

/// A function sampled over `[min_x, max_x]` at a fixed interval
#[derive(Clone, Debug)]
pub struct Table<T: Float> {
    min_x: T,
    max_x: T,
    interval: T,
    samples: Vec<T>,
}

impl<T: Float> Table<T> {
    /// Sample `f` every `interval` starting at `min_x`, up to and including
    /// the first sample at or past `max_x`.
    ///
    /// # Panics
    ///
    /// Panics if the domain is empty or the interval is not positive.
    pub fn new(min_x: T, max_x: T, interval: T, f: impl Fn(T) -> T) -> Self {
        assert!(min_x < max_x, "lookup table domain must not be empty");
        assert!(interval > T::ZERO, "lookup table interval must be positive");
        let steps = ((max_x - min_x) / interval).ceil().to_index().max(1) as usize;
        let samples: Vec<T> = (0..=steps)
            .map(|i| f(min_x + T::from_usize(i) * interval))
            .collect();
        log::debug!(
            "built lookup table over [{:?}, {:?}] with {} samples",
            min_x,
            max_x,
            samples.len()
        );
        Self {
            min_x,
            max_x,
            interval,
            samples,
        }
    }
    /// The number of samples in the table
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    /// Always false: a table holds at least two samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    /// The domain the table was built over
    pub fn domain(&self) -> (T, T) {
        (self.min_x, self.max_x)
    }
    /// The sampling interval
    pub fn interval(&self) -> T {
        self.interval
    }
    #[inline]
    fn position(&self, x: T) -> T {
        (x - self.min_x) / self.interval
    }
    /// Evaluate the table at `x`.  Inputs outside of the domain evaluate to
    /// the value at the nearest edge of the table.
    pub fn process(&self, x: T) -> T {
        let pos = self.position(x);
        let last = (self.samples.len() - 2) as isize;
        let index = pos.floor().to_index().clamp(0, last) as usize;
        let frac = (pos - T::from_usize(index)).max(T::ZERO).min(T::ONE);
        linear_interpolate(self.samples[index], self.samples[index + 1], frac)
    }
    /// Evaluate the table at four independent points.  Unlike
    /// [Table::process] this does not clamp the index, so every lane must
    /// already lie within the table's domain.
    ///
    /// # Panics
    ///
    /// Panics if any lane falls outside of the table.
    pub fn process_x4(&self, x: [T; LANES]) -> [T; LANES] {
        x.map(|x| {
            let pos = self.position(x);
            let whole = pos.floor();
            let index = whole.to_index() as usize;
            linear_interpolate(self.samples[index], self.samples[index + 1], pos - whole)
        })
    }
}

/// Interval shared by the exponential, logarithmic and sine tables
const FINE_INTERVAL: f64 = 0.001;

/// The polynomial fit that maps the unison spread control to the detune
/// scaling applied to the unison tunings
pub fn unison_spread_curve(x: f64) -> f64 {
    const COEFFS: [f64; 12] = [
        10028.7312891634,
        -50818.8652045924,
        111363.4808729368,
        -138150.6761080548,
        106649.6679158292,
        -53046.9642751875,
        17019.9518580080,
        -3425.0836591318,
        404.2703938388,
        -24.1878824391,
        0.6717417634,
        0.0030115596,
    ];
    COEFFS.iter().fold(0.0, |acc, &c| acc * x + c)
}

/// The set of tables shared by the devices in this crate.
///
/// Construct this once at startup and pass it by reference to the
/// composites that need it.
#[derive(Clone, Debug)]
pub struct Lookup<T: Float> {
    sin: Table<T>,
    pow2: Table<T>,
    pow10: Table<T>,
    log10: Table<T>,
    unison_spread: Table<T>,
}

impl<T: Float> Lookup<T> {
    /// Build all of the tables
    pub fn new() -> Self {
        let interval = T::from_f64(FINE_INTERVAL);
        let sin_bound = T::from_u16(4) * T::TAU + T::from_f64(0.1);
        let exp_bound = T::from_f64(10.1);
        Self {
            sin: Table::new(-sin_bound, sin_bound, interval, |x| x.sin()),
            pow2: Table::new(-exp_bound, exp_bound, interval, |x| x.exp2()),
            pow10: Table::new(-exp_bound, exp_bound, interval, |x| T::TEN.powf(x)),
            log10: Table::new(T::from_f64(0.00001), exp_bound, interval, |x| x.log10()),
            unison_spread: Table::new(T::ZERO, T::from_f64(1.1), T::from_f64(0.01), |x| {
                T::from_f64(unison_spread_curve(x.as_f64()))
            }),
        }
    }
    /// sin(x), for x within four periods either side of zero
    pub fn sin(&self, x: T) -> T {
        self.sin.process(x)
    }
    /// 2^x, for x in [-10.1, 10.1]
    pub fn pow2(&self, x: T) -> T {
        self.pow2.process(x)
    }
    /// 2^x on four lanes.  Every lane must lie in [-10.1, 10.1).
    pub fn pow2_x4(&self, x: [T; LANES]) -> [T; LANES] {
        self.pow2.process_x4(x)
    }
    /// 10^x, for x in [-10.1, 10.1]
    pub fn pow10(&self, x: T) -> T {
        self.pow10.process(x)
    }
    /// log10(x), for x in [0.00001, 10.1]
    pub fn log10(&self, x: T) -> T {
        self.log10.process(x)
    }
    /// The unison detune scaling for a spread control in [0, 1.1]
    pub fn unison_spread(&self, x: T) -> T {
        self.unison_spread.process(x)
    }
    /// The table backing [Lookup::sin]
    pub fn sin_table(&self) -> &Table<T> {
        &self.sin
    }
}

impl<T: Float> Default for Lookup<T> {
    fn default() -> Self {
        Self::new()
    }
}
