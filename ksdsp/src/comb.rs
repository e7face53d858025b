//! A polyphonic feedback comb filter.
//!
//! Each channel adds a delayed copy of its input back onto itself.  The
//! delay is tuned like an oscillator (1V/octave around C4), so the comb's
//! teeth land on the harmonics of the played note.

use crate::biquad::BiQuad;
use crate::delay::CircularBuffer;
use crate::devices::Device;
use crate::dynamics::{Compressor, CompressorParams};
use crate::lookup::Lookup;
use crate::port::SignalPort;
use crate::util::{clamp, sanitize, Memo};
use crate::{Context, Float, FREQ_C4, MAX_CHANNELS};
use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

/// The lowest frequency the delay lines are sized for, in Hz.  Lower
/// frequencies play at this pitch.
pub const MIN_BUFFER_FREQ: u16 = 10;
/// The lowest frequency the comb may be tuned to, in Hz
pub const MIN_FREQ: f32 = 0.1;
/// The feedback amount is limited to this magnitude
pub const MAX_FEEDBACK: f32 = 0.9;

const DC_CUTOFF: f32 = 4.0;

/// The panel controls of the comb filter
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombFilterParams<T> {
    /// Tuning in octaves around C4, -4 to 4
    pub frequency: T,
    /// Attenuverter for the frequency CV, -1 to 1
    pub freq_cv_atten: T,
    /// Comb depth, -1 to 1.  Negative values invert the delayed signal.
    pub comb: T,
    /// Attenuverter for the comb CV, -1 to 1
    pub comb_atten: T,
    /// Feedback, 0 to 1.1 (the effective feedback saturates at 0.9)
    pub feedback: T,
    /// Attenuverter for the feedback CV, -1 to 1
    pub feedback_atten: T,
}

impl<T: Float> CombFilterParams<T> {
    /// A copy with every control forced into its range
    pub fn clamped(&self) -> Self {
        let one = T::ONE;
        Self {
            frequency: clamp(self.frequency, -T::from_u16(4), T::from_u16(4)),
            freq_cv_atten: clamp(self.freq_cv_atten, -one, one),
            comb: clamp(self.comb, -one, one),
            comb_atten: clamp(self.comb_atten, -one, one),
            feedback: clamp(self.feedback, T::ZERO, T::from_f32(1.1)),
            feedback_atten: clamp(self.feedback_atten, -one, one),
        }
    }
}

/// Per-channel voltages for a [CombVoice]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CombVoiceInput<T: Float> {
    /// Pitch, 1V/octave
    pub voct: T,
    /// Frequency CV, scaled by its attenuverter
    pub freq_cv: T,
    /// Comb depth CV, 5V for full scale
    pub comb_cv: T,
    /// Feedback CV, 5V for full scale
    pub feedback_cv: T,
    /// Audio to filter
    pub audio: T,
}

/// One channel of the comb filter
pub struct CombVoice<'a, T: Float> {
    lookup: &'a Lookup<T>,
    buffer: CircularBuffer<T>,
    dc_out: BiQuad<T>,
    limiter: Compressor<T>,
    rate: Memo<T, 1>,
}

impl<'a, T: Float> CombVoice<'a, T> {
    /// Create a voice, initialized for the default context
    pub fn new(lookup: &'a Lookup<T>) -> Self {
        let mut ret = Self {
            lookup,
            buffer: CircularBuffer::new(1),
            dc_out: BiQuad::new(),
            limiter: Compressor::new(CompressorParams {
                attack: T::from_f32(0.001),
                release: T::from_f32(0.12),
                ratio: T::from_f32(10.5),
                threshold: T::from_f32(-0.3),
            }),
            rate: Memo::new(),
        };
        ret.init(&Context::default());
        ret
    }
    /// Re-derive the rate dependent coefficients if the rate changed
    pub fn set_sample_rate(&mut self, context: &Context<T>) {
        if self.rate.changed([context.sample_rate]) {
            self.dc_out
                .set_butterworth_hp2(context.sample_rate, T::from_f32(DC_CUTOFF));
            self.limiter.set_sample_rate(context.sample_rate);
        }
    }
    /// Size the delay line for this rate and clear all state
    pub fn init(&mut self, context: &Context<T>) {
        let min_size = (context.sample_rate / T::from_u16(MIN_BUFFER_FREQ))
            .ceil()
            .to_index()
            .max(0) as usize
            + 2;
        self.buffer.reset(min_size);
        self.set_sample_rate(context);
        self.dc_out.clear();
        self.limiter.reset();
    }
    /// The capacity of the delay line
    pub fn buffer_capacity(&self) -> usize {
        self.buffer.capacity()
    }
}

impl<'a, T: Float> Device<T> for CombVoice<'a, T> {
    type Input = CombVoiceInput<T>;
    type Params = CombFilterParams<T>;
    type Output = T;
    fn next(&mut self, context: &Context<T>, input: CombVoiceInput<T>, params: CombFilterParams<T>) -> T {
        self.set_sample_rate(context);
        let p = params.clamped();
        let five = T::FIVE;

        let octaves = p.frequency + sanitize(input.voct) + sanitize(input.freq_cv) * p.freq_cv_atten;
        let freq = clamp(
            T::from_f64(FREQ_C4) * self.lookup.pow2(octaves),
            T::from_f32(MIN_FREQ),
            context.max_cutoff(),
        );
        let feedback = clamp(
            p.feedback + p.feedback_atten * sanitize(input.feedback_cv) / five,
            -T::from_f32(MAX_FEEDBACK),
            T::from_f32(MAX_FEEDBACK),
        );
        let comb = clamp(
            p.comb + p.comb_atten * sanitize(input.comb_cv) / five,
            -T::ONE,
            T::ONE,
        );
        let max_index = T::from_usize(self.buffer.capacity().saturating_sub(2).max(1));
        let index = clamp(context.sample_rate / freq, T::ZERO, max_index);

        let delayed = self.buffer.read_frac(index);
        let x = sanitize(input.audio) / five + delayed * comb * feedback;
        self.buffer.write(x);
        let out = x + delayed * comb;
        let out = self.dc_out.process(out);
        self.limiter.process(out) * five
    }
}

/// The host ports a [CombFilter] reads each step
pub struct CombFilterInputs<'p, P> {
    /// Pitch, 1V/octave
    pub voct: &'p P,
    /// Frequency CV
    pub freq_cv: &'p P,
    /// Comb depth CV
    pub comb_cv: &'p P,
    /// Feedback CV
    pub feedback_cv: &'p P,
    /// Audio to filter
    pub audio: &'p P,
}

/// A polyphonic comb filter: one [CombVoice] per channel
pub struct CombFilter<'a, T: Float> {
    context: Context<T>,
    voices: ArrayVec<CombVoice<'a, T>, MAX_CHANNELS>,
}

impl<'a, T: Float> CombFilter<'a, T> {
    /// Create a comb filter running at the default sample rate
    pub fn new(lookup: &'a Lookup<T>) -> Self {
        Self {
            context: Context::default(),
            voices: (0..MAX_CHANNELS).map(|_| CombVoice::new(lookup)).collect(),
        }
    }
    /// Change the sample rate.  Call [CombFilter::init] afterwards to
    /// resize the delay lines.  Invalid rates are ignored.
    pub fn set_sample_rate(&mut self, sample_rate: T) {
        match Context::maybe_create(sample_rate) {
            Some(context) => {
                log::debug!("comb filter sample rate set to {:?}", sample_rate);
                self.context = context;
                for voice in self.voices.iter_mut() {
                    voice.set_sample_rate(&context);
                }
            }
            None => log::warn!("ignoring invalid sample rate {:?}", sample_rate),
        }
    }
    /// The current processing context
    pub fn context(&self) -> &Context<T> {
        &self.context
    }
    /// Reallocate the delay lines and reset every channel
    pub fn init(&mut self) {
        let context = self.context;
        for voice in self.voices.iter_mut() {
            voice.init(&context);
        }
        log::info!(
            "initialized {} comb filter channels at {:?} Hz",
            self.voices.len(),
            context.sample_rate
        );
    }
    /// The voice for `channel`
    pub fn voice(&self, channel: usize) -> Option<&CombVoice<'a, T>> {
        self.voices.get(channel)
    }
    /// Process one sample on every active channel.  The channel count
    /// follows the audio input (at least 1).
    pub fn step<P: SignalPort<T>, O: SignalPort<T>>(
        &mut self,
        params: &CombFilterParams<T>,
        inputs: &CombFilterInputs<'_, P>,
        output: &mut O,
    ) {
        let channels = inputs.audio.channels().clamp(1, MAX_CHANNELS);
        let context = self.context;
        for (channel, voice) in self.voices.iter_mut().take(channels).enumerate() {
            let input = CombVoiceInput {
                voct: inputs.voct.poly_voltage(channel),
                freq_cv: inputs.freq_cv.poly_voltage(channel),
                comb_cv: inputs.comb_cv.poly_voltage(channel),
                feedback_cv: inputs.feedback_cv.poly_voltage(channel),
                audio: inputs.audio.poly_voltage(channel),
            };
            output.set_voltage(channel, voice.next(&context, input, *params));
        }
        output.set_channels(channels);
    }
}
