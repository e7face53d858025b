//! Second order IIR filter sections and the routines that design them.

use crate::util::Memo;
use crate::{Float, LANES};

/// Designs never place a cutoff above this fraction of nyquist
pub const MAX_CUTOFF_RATIO: f32 = 0.95;
/// Designs never place a cutoff below this frequency, in Hz
pub const MIN_CUTOFF: f32 = 0.001;

/// The coefficients of a [BiQuad] section.
///
/// The section computes `y = a0·x + a1·x[n-1] + a2·x[n-2] - b1·y[n-1] -
/// b2·y[n-2]` and outputs `c0·y + d0·x`, so `c0` and `d0` set the wet and
/// dry mix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coefficients<T: Float> {
    /// Feedforward gain of the current input
    pub a0: T,
    /// Feedforward gain of the previous input
    pub a1: T,
    /// Feedforward gain of the input two samples ago
    pub a2: T,
    /// Feedback gain of the previous output
    pub b1: T,
    /// Feedback gain of the output two samples ago
    pub b2: T,
    /// Wet gain
    pub c0: T,
    /// Dry gain
    pub d0: T,
}

impl<T: Float> Default for Coefficients<T> {
    /// The default is a unity gain pass-through
    fn default() -> Self {
        Self {
            a0: T::ONE,
            a1: T::ZERO,
            a2: T::ZERO,
            b1: T::ZERO,
            b2: T::ZERO,
            c0: T::ONE,
            d0: T::ZERO,
        }
    }
}

/// The filter responses [Coefficients::design] knows how to derive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Design {
    /// 2nd order Butterworth low-pass (-3dB at the cutoff)
    ButterworthLp2,
    /// 2nd order Butterworth high-pass (-3dB at the cutoff)
    ButterworthHp2,
    /// 2nd order Linkwitz-Riley low-pass (-6dB at the cutoff)
    LinkwitzRileyLp2,
    /// 2nd order Linkwitz-Riley high-pass (-6dB at the cutoff)
    LinkwitzRileyHp2,
    /// 1st order all-pass (90 degrees of phase shift at the cutoff)
    AllPass1,
}

impl<T: Float> Coefficients<T> {
    /// Derive the coefficients for `design` at `cutoff` Hz using the
    /// bilinear transform.  The cutoff is clamped to 95% of nyquist.
    pub fn design(design: Design, sample_rate: T, cutoff: T) -> Self {
        let fc = cutoff
            .min(T::from_f32(MAX_CUTOFF_RATIO) * sample_rate * T::ONE_HALF)
            .max(T::from_f32(MIN_CUTOFF));
        let theta = T::PI * fc / sample_rate;
        match design {
            Design::ButterworthLp2 => {
                let c = T::ONE / theta.tan();
                let a0 = T::ONE / (T::ONE + T::SQRT_2 * c + c * c);
                Self {
                    a0,
                    a1: T::TWO * a0,
                    a2: a0,
                    b1: T::TWO * a0 * (T::ONE - c * c),
                    b2: a0 * (T::ONE - T::SQRT_2 * c + c * c),
                    ..Default::default()
                }
            }
            Design::ButterworthHp2 => {
                let c = theta.tan();
                let a0 = T::ONE / (T::ONE + T::SQRT_2 * c + c * c);
                Self {
                    a0,
                    a1: -T::TWO * a0,
                    a2: a0,
                    b1: T::TWO * a0 * (c * c - T::ONE),
                    b2: a0 * (T::ONE - T::SQRT_2 * c + c * c),
                    ..Default::default()
                }
            }
            Design::LinkwitzRileyLp2 | Design::LinkwitzRileyHp2 => {
                let omega = T::PI * fc;
                let kappa = omega / theta.tan();
                let delta = kappa * kappa + omega * omega + T::TWO * kappa * omega;
                let b1 = (T::TWO * omega * omega - T::TWO * kappa * kappa) / delta;
                let b2 = (kappa * kappa + omega * omega - T::TWO * kappa * omega) / delta;
                let gain = if design == Design::LinkwitzRileyLp2 {
                    omega * omega
                } else {
                    kappa * kappa
                };
                let a1 = if design == Design::LinkwitzRileyLp2 {
                    T::TWO * gain
                } else {
                    -T::TWO * gain
                };
                Self {
                    a0: gain / delta,
                    a1: a1 / delta,
                    a2: gain / delta,
                    b1,
                    b2,
                    ..Default::default()
                }
            }
            Design::AllPass1 => {
                let t = theta.tan();
                let alpha = (t - T::ONE) / (t + T::ONE);
                Self {
                    a0: alpha,
                    a1: T::ONE,
                    a2: T::ZERO,
                    b1: alpha,
                    b2: T::ZERO,
                    ..Default::default()
                }
            }
        }
    }
}

/// A single second order section.  The filter memory is only cleared by
/// [BiQuad::clear]; redesigning the filter keeps it.
#[derive(Clone, Copy, Debug, Default)]
pub struct BiQuad<T: Float> {
    coeffs: Coefficients<T>,
    xz1: T,
    xz2: T,
    yz1: T,
    yz2: T,
    design: Memo<T, 3>,
}

impl<T: Float> BiQuad<T> {
    /// A pass-through section
    pub fn new() -> Self {
        Default::default()
    }
    /// Use arbitrary coefficients
    pub fn set_coefficients(&mut self, coeffs: Coefficients<T>) {
        self.design.invalidate();
        self.coeffs = coeffs;
    }
    /// The coefficients currently in use
    pub fn coefficients(&self) -> &Coefficients<T> {
        &self.coeffs
    }
    /// Design the section, skipping the work if neither the design, rate,
    /// nor cutoff changed since the last call
    pub fn set_design(&mut self, design: Design, sample_rate: T, cutoff: T) {
        let key = [T::from_u16(design as u16), sample_rate, cutoff];
        if self.design.changed(key) {
            self.coeffs = Coefficients::design(design, sample_rate, cutoff);
        }
    }
    /// Configure as a 2nd order Butterworth low-pass
    pub fn set_butterworth_lp2(&mut self, sample_rate: T, cutoff: T) {
        self.set_design(Design::ButterworthLp2, sample_rate, cutoff);
    }
    /// Configure as a 2nd order Butterworth high-pass
    pub fn set_butterworth_hp2(&mut self, sample_rate: T, cutoff: T) {
        self.set_design(Design::ButterworthHp2, sample_rate, cutoff);
    }
    /// Configure as a 2nd order Linkwitz-Riley low-pass
    pub fn set_linkwitz_riley_lp2(&mut self, sample_rate: T, cutoff: T) {
        self.set_design(Design::LinkwitzRileyLp2, sample_rate, cutoff);
    }
    /// Configure as a 2nd order Linkwitz-Riley high-pass
    pub fn set_linkwitz_riley_hp2(&mut self, sample_rate: T, cutoff: T) {
        self.set_design(Design::LinkwitzRileyHp2, sample_rate, cutoff);
    }
    /// Configure as a 1st order all-pass
    pub fn set_all_pass_1st_order(&mut self, sample_rate: T, cutoff: T) {
        self.set_design(Design::AllPass1, sample_rate, cutoff);
    }
    /// Filter one sample
    #[inline]
    pub fn process(&mut self, x: T) -> T {
        let c = &self.coeffs;
        let y = c.a0 * x + c.a1 * self.xz1 + c.a2 * self.xz2 - c.b1 * self.yz1 - c.b2 * self.yz2;
        self.xz2 = self.xz1;
        self.xz1 = x;
        self.yz2 = self.yz1;
        self.yz1 = y;
        y * c.c0 + x * c.d0
    }
    /// Zero the filter memory
    pub fn clear(&mut self) {
        self.xz1 = T::ZERO;
        self.xz2 = T::ZERO;
        self.yz1 = T::ZERO;
        self.yz2 = T::ZERO;
    }
}

/// Four independent [BiQuad] sections processed together, one per lane
#[derive(Clone, Copy, Debug, Default)]
pub struct BiQuadX4<T: Float> {
    lanes: [BiQuad<T>; LANES],
}

impl<T: Float> BiQuadX4<T> {
    /// Design every lane with the same response and rate but its own
    /// cutoff
    pub fn set_design(&mut self, design: Design, sample_rate: T, cutoffs: [T; LANES]) {
        for (lane, cutoff) in self.lanes.iter_mut().zip(cutoffs) {
            lane.set_design(design, sample_rate, cutoff);
        }
    }
    /// Filter one sample on each lane
    #[inline]
    pub fn process(&mut self, x: [T; LANES]) -> [T; LANES] {
        let mut ret = x;
        for (lane, y) in self.lanes.iter_mut().zip(ret.iter_mut()) {
            *y = lane.process(*y);
        }
        ret
    }
    /// Zero the memory of every lane
    pub fn clear(&mut self) {
        self.lanes.iter_mut().for_each(BiQuad::clear);
    }
}

/// A 4th order Linkwitz-Riley low-pass: two cascaded Butterworth sections
#[derive(Clone, Copy, Debug, Default)]
pub struct LinkwitzRileyLp4<T: Float> {
    sections: [BiQuad<T>; 2],
}

impl<T: Float> LinkwitzRileyLp4<T> {
    /// Set the rate and the -6dB cutoff
    pub fn set_parameters(&mut self, sample_rate: T, cutoff: T) {
        for section in self.sections.iter_mut() {
            section.set_butterworth_lp2(sample_rate, cutoff);
        }
    }
    /// Filter one sample
    #[inline]
    pub fn process(&mut self, x: T) -> T {
        let y = self.sections[0].process(x);
        self.sections[1].process(y)
    }
    /// Zero the filter memory
    pub fn clear(&mut self) {
        self.sections.iter_mut().for_each(BiQuad::clear);
    }
}

/// A 4th order Linkwitz-Riley high-pass: two cascaded Butterworth sections
#[derive(Clone, Copy, Debug, Default)]
pub struct LinkwitzRileyHp4<T: Float> {
    sections: [BiQuad<T>; 2],
}

impl<T: Float> LinkwitzRileyHp4<T> {
    /// Set the rate and the -6dB cutoff
    pub fn set_parameters(&mut self, sample_rate: T, cutoff: T) {
        for section in self.sections.iter_mut() {
            section.set_butterworth_hp2(sample_rate, cutoff);
        }
    }
    /// Filter one sample
    #[inline]
    pub fn process(&mut self, x: T) -> T {
        let y = self.sections[0].process(x);
        self.sections[1].process(y)
    }
    /// Zero the filter memory
    pub fn clear(&mut self) {
        self.sections.iter_mut().for_each(BiQuad::clear);
    }
}
