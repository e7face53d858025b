//! This module provides objects to reason about the processing context.
//! Currently, the only information wrapped is the current audio sample rate.

use crate::Float;

/// The highest cutoff or pitch any device in this crate will use, in Hz
pub const MAX_AUDIO_FREQ: u16 = 20000;

#[derive(Clone, Copy, Debug, PartialEq)]
/// A floating point (using the type `Smp`) processing context
pub struct Context<Smp: Float> {
    /// The sample rate, in Hz, with the same type as a processing type
    pub sample_rate: Smp,
}

impl<Smp: Float> Context<Smp> {
    /// Create a new `Context`
    pub fn new(sample_rate: Smp) -> Self {
        Self { sample_rate }
    }
    /// Create a processing context if the sample rate provided is finite and
    /// positive, or return `None` otherwise.
    pub fn maybe_create(sample_rate: Smp) -> Option<Self> {
        if sample_rate.is_finite() && sample_rate > Smp::ZERO {
            Some(Self { sample_rate })
        } else {
            None
        }
    }
    /// Half the sample rate
    pub fn nyquist(&self) -> Smp {
        self.sample_rate * Smp::ONE_HALF
    }
    /// The duration of one sample, in seconds
    pub fn sample_period(&self) -> Smp {
        Smp::ONE / self.sample_rate
    }
    /// The highest usable frequency: the lower of 20kHz and nyquist
    pub fn max_cutoff(&self) -> Smp {
        self.nyquist().min(Smp::from_u16(MAX_AUDIO_FREQ))
    }
}

impl<Smp: Float> Default for Context<Smp> {
    fn default() -> Self {
        Self::new(<Smp as From<u16>>::from(44100u16))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unusable_rates() {
        assert!(Context::<f32>::maybe_create(0.0).is_none());
        assert!(Context::<f32>::maybe_create(-48000.0).is_none());
        assert!(Context::<f32>::maybe_create(f32::NAN).is_none());
        assert!(Context::<f64>::maybe_create(f64::INFINITY).is_none());
        assert_eq!(Context::<f32>::maybe_create(48000.0), Some(Context::new(48000.0)));
    }

    #[test]
    fn max_cutoff_is_bounded_by_nyquist() {
        assert_eq!(Context::<f32>::default().max_cutoff(), 20000.0);
        assert_eq!(Context::<f32>::new(32000.0).max_cutoff(), 16000.0);
    }
}
