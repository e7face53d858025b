//! A Karplus-Strong plucked string.
//!
//! Each channel runs a [KsVoice]: an excitation signal is fed into a short
//! delay line whose length sets the pitch.  The delayed ("wet") signal is
//! averaged with the previous wet sample and fed back, which low-passes the
//! loop and makes the string decay.  A limiter in the loop keeps high
//! feedback from running away.  Up to seven detuned unison taps read the
//! same delay line at drifting phase offsets to thicken the sound.
//!
//! [KsDelay] is the polyphonic wrapper: it owns one voice per channel and
//! moves voltages between the voices and a host's [SignalPort]s.

use crate::biquad::BiQuad;
use crate::delay::CircularBuffer;
use crate::devices::Device;
use crate::dynamics::{voltage_saturate, Compressor, CompressorParams};
use crate::lookup::Lookup;
use crate::port::SignalPort;
use crate::random::{channel_seed, RandomSource, SeededSource, RANDOM_SEED};
use crate::slew::SlewLimiter;
use crate::util::{clamp, sanitize, Memo};
use crate::{Context, Float, FREQ_C4, MAX_CHANNELS};
use arrayvec::ArrayVec;
use oorandom::Rand32;
use serde::{Deserialize, Serialize};

/// The maximum number of unison taps
pub const MAX_UNISON: usize = 7;

/// Unison detune ratios, centre voice first, from the supersaw detuning
/// table published by Adam Szabo ("How to emulate the super saw")
pub const UNISON_TUNINGS: [f64; MAX_UNISON] = [
    0.0,
    -0.01952356,
    0.01991221,
    -0.06288439,
    0.06216538,
    -0.11002313,
    0.10745242,
];

/// The lowest playable frequency, in Hz.  Delay lines are sized for it.
pub const MIN_FREQ: u16 = 20;
/// Pitch glide rate, in Hz per second
pub const GLIDE_RATE: f32 = 22050.0;
/// Highest feedback amount
pub const MAX_FEEDBACK: f32 = 0.5;

const DC_IN_CUTOFF: f32 = 5.5;
const DC_OUT_CUTOFF: f32 = 10.0;
const STRETCH_SCALE: f32 = 0.0003;

/// Level of the centre unison voice for a unison mix control in [0, 1]
pub fn unison_centre_level<T: Float>(mix: T) -> T {
    T::from_f64(-0.55366) * mix + T::from_f64(0.99785)
}

/// Level of each side unison voice for a unison mix control in [0, 1]
pub fn unison_side_level<T: Float>(mix: T) -> T {
    T::from_f64(-0.73764) * mix * mix + T::from_f64(1.2841) * mix + T::from_f64(0.044372)
}

/// The panel controls of the plucked string
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KsDelayParams<T> {
    /// Octave offset, -4 to 4
    pub octave: T,
    /// Tuning offset in semitones, -7 to 7
    pub tune: T,
    /// Feedback, 0 to 0.5.  Higher values sustain longer.
    pub feedback: T,
    /// Number of unison voices, 1 to 7
    pub unison: T,
    /// Unison detune amount, 0 to 1
    pub unison_spread: T,
    /// Balance of the side voices against the centre voice, 0 to 1
    pub unison_mix: T,
    /// String stretch, 0 to 1.  Shortens the decay of high notes.
    pub stretch: T,
    /// White noise added to the excitation, 0 to 1
    pub noise: T,
}

impl<T: Float> Default for KsDelayParams<T> {
    fn default() -> Self {
        Self {
            octave: T::ZERO,
            tune: T::ZERO,
            feedback: T::ONE_HALF,
            unison: T::ONE,
            unison_spread: T::ONE_HALF,
            unison_mix: T::ONE,
            stretch: T::ZERO,
            noise: T::ZERO,
        }
    }
}

impl<T: Float> KsDelayParams<T> {
    /// Every control at the bottom of its range
    pub fn minimum() -> Self {
        Self {
            octave: -T::from_u16(4),
            tune: -T::from_u16(7),
            feedback: T::ZERO,
            unison: T::ONE,
            unison_spread: T::ZERO,
            unison_mix: T::ZERO,
            stretch: T::ZERO,
            noise: T::ZERO,
        }
    }
    /// Every control at the top of its range
    pub fn maximum() -> Self {
        Self {
            octave: T::from_u16(4),
            tune: T::from_u16(7),
            feedback: T::from_f32(MAX_FEEDBACK),
            unison: T::from_usize(MAX_UNISON),
            unison_spread: T::ONE,
            unison_mix: T::ONE,
            stretch: T::ONE,
            noise: T::ONE,
        }
    }
    /// A copy with every control forced into its range
    pub fn clamped(&self) -> Self {
        let (lo, hi) = (Self::minimum(), Self::maximum());
        Self {
            octave: clamp(self.octave, lo.octave, hi.octave),
            tune: clamp(self.tune, lo.tune, hi.tune),
            feedback: clamp(self.feedback, lo.feedback, hi.feedback),
            unison: clamp(self.unison, lo.unison, hi.unison),
            unison_spread: clamp(self.unison_spread, lo.unison_spread, hi.unison_spread),
            unison_mix: clamp(self.unison_mix, lo.unison_mix, hi.unison_mix),
            stretch: clamp(self.stretch, lo.stretch, hi.stretch),
            noise: clamp(self.noise, lo.noise, hi.noise),
        }
    }
}

/// The per-channel voltages a [KsVoice] reads each sample.  Modulation
/// inputs are scaled by 1/10 (10V sweeps the full range of a control),
/// except `unison`, which adds voices at 1 per volt.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct KsVoiceInput<T: Float> {
    /// Pitch, 1V/octave around C4
    pub pitch: T,
    /// Excitation audio
    pub audio: T,
    /// Feedback modulation
    pub feedback: T,
    /// Unison voice count modulation
    pub unison: T,
    /// Unison spread modulation (rectified)
    pub unison_spread: T,
    /// Unison mix modulation (rectified)
    pub unison_mix: T,
    /// Stretch modulation
    pub stretch: T,
}

/// One channel of the plucked string
pub struct KsVoice<'a, T: Float, R: RandomSource> {
    lookup: &'a Lookup<T>,
    rng: R,
    buffer: CircularBuffer<T>,
    dc_in: BiQuad<T>,
    dc_out: BiQuad<T>,
    limiter: Compressor<T>,
    glide: SlewLimiter<T>,
    phases: [T; MAX_UNISON],
    last_wet: T,
    last_out: T,
    rate: Memo<T, 1>,
}

impl<'a, T: Float, R: RandomSource> KsVoice<'a, T, R> {
    /// Create a voice, initialized for the default context
    pub fn new(lookup: &'a Lookup<T>, rng: R) -> Self {
        let mut ret = Self {
            lookup,
            rng,
            buffer: CircularBuffer::new(1),
            dc_in: BiQuad::new(),
            dc_out: BiQuad::new(),
            limiter: Compressor::new(CompressorParams {
                attack: T::ZERO,
                release: T::from_f32(0.0025),
                threshold: -T::ONE_HALF,
                ..Default::default()
            }),
            glide: SlewLimiter::new(T::from_f32(GLIDE_RATE), T::from_f32(GLIDE_RATE)),
            phases: [T::ZERO; MAX_UNISON],
            last_wet: T::ZERO,
            last_out: T::ZERO,
            rate: Memo::new(),
        };
        ret.init(&Context::default());
        ret
    }
    /// Re-derive the rate dependent filter and limiter coefficients, if
    /// the rate changed.  This never reallocates the delay line.
    pub fn set_sample_rate(&mut self, context: &Context<T>) {
        let sr = context.sample_rate;
        if self.rate.changed([sr]) {
            self.dc_in.set_butterworth_hp2(sr, T::from_f32(DC_IN_CUTOFF));
            self.dc_out.set_butterworth_hp2(sr, T::from_f32(DC_OUT_CUTOFF));
            self.limiter.set_sample_rate(sr);
        }
    }
    /// Size the delay line for the lowest pitch at this rate and return
    /// every piece of state to its initial value.  Unison phases are
    /// randomized.
    pub fn init(&mut self, context: &Context<T>) {
        let min_size = (context.sample_rate / T::from_u16(MIN_FREQ)).ceil().to_index().max(0) as usize + 4;
        self.buffer.reset(min_size);
        self.set_sample_rate(context);
        self.dc_in.clear();
        self.dc_out.clear();
        self.limiter.reset();
        self.glide.reset(T::from_f64(FREQ_C4));
        for phase in self.phases.iter_mut() {
            *phase = T::from_f32(self.rng.next_unit());
        }
        self.last_wet = T::ZERO;
        self.last_out = T::ZERO;
    }
    /// The capacity of the delay line
    pub fn buffer_capacity(&self) -> usize {
        self.buffer.capacity()
    }
    /// The playback frequency after glide, in Hz
    pub fn frequency(&self) -> T {
        self.glide.value()
    }
    /// The most recent output sample
    pub fn last_out(&self) -> T {
        self.last_out
    }
    /// The current unison phases, each in [0, 1)
    pub fn phases(&self) -> &[T; MAX_UNISON] {
        &self.phases
    }
    #[inline]
    fn draw(&mut self) -> T {
        T::from_f32(self.rng.next_unit())
    }
}

impl<'a, T: Float, R: RandomSource> Device<T> for KsVoice<'a, T, R> {
    type Input = KsVoiceInput<T>;
    type Params = KsDelayParams<T>;
    type Output = T;
    fn next(&mut self, context: &Context<T>, input: KsVoiceInput<T>, params: KsDelayParams<T>) -> T {
        self.set_sample_rate(context);
        let p = params.clamped();
        let ten = T::TEN;

        let spread_cv = (sanitize(input.unison_spread) / ten).abs();
        let spread = self.lookup.unison_spread(clamp(p.unison_spread + spread_cv, T::ZERO, T::ONE));
        let mix = clamp(p.unison_mix + (sanitize(input.unison_mix) / ten).abs(), T::ZERO, T::ONE);
        let mut centre = unison_centre_level(mix);
        let side = unison_side_level(mix);

        let mut excitation = self.dc_in.process(sanitize(input.audio));
        if p.noise > T::ZERO {
            excitation = excitation + p.noise * (T::TWO * self.draw() - T::ONE);
        }
        let feedback = clamp(
            p.feedback + sanitize(input.feedback) / ten,
            T::ZERO,
            T::from_f32(MAX_FEEDBACK),
        );

        let twelve = T::from_u16(12);
        let target = clamp(
            T::from_f64(FREQ_C4) * self.lookup.pow2(sanitize(input.pitch) + p.octave + p.tune / twelve),
            T::from_u16(MIN_FREQ),
            context.max_cutoff(),
        );
        let freq = self.glide.process(context.sample_period(), target);

        // the feedback averaging adds half a sample of delay to the loop
        let max_index = T::from_usize(self.buffer.capacity().saturating_sub(2).max(1));
        let index = clamp(
            context.sample_rate / freq - T::from_f32(1.5),
            T::ONE_HALF,
            max_index,
        );
        let wet = self.buffer.read_frac(index);

        let stretch = clamp(p.stretch + sanitize(input.stretch) / ten, T::ZERO, T::ONE)
            * T::from_f32(STRETCH_SCALE)
            * freq
            * freq;
        let use_stretch = stretch > T::ZERO && T::ONE - T::ONE / stretch > self.draw();

        let dry = if use_stretch {
            excitation + wet
        } else {
            T::ONE_HALF * excitation + self.last_wet * feedback + T::ONE_HALF * wet
        };
        let dry = T::FIVE * self.limiter.process(dry / T::FIVE);
        self.buffer.write(dry);
        self.last_wet = wet;

        let voices = (p.unison + sanitize(input.unison))
            .to_index()
            .clamp(1, MAX_UNISON as isize) as usize;
        if voices == 1 {
            centre = T::ONE;
        }
        let mut mixed = T::ZERO;
        for (osc, phase) in self.phases.iter_mut().take(voices).enumerate() {
            let advanced = *phase + T::from_f64(UNISON_TUNINGS[osc]) * spread / index;
            *phase = advanced - advanced.floor();
            let offset = index - *phase * index;
            let level = if osc == 0 { centre } else { side };
            mixed = mixed + self.buffer.read_frac(offset) * level;
        }

        let out = voltage_saturate(self.dc_out.process(mixed));
        self.last_out = out;
        out
    }
}

/// The host ports a [KsDelay] reads each step
pub struct KsDelayInputs<'p, P> {
    /// Pitch, 1V/octave
    pub pitch: &'p P,
    /// Excitation audio
    pub audio: &'p P,
    /// Feedback modulation
    pub feedback: &'p P,
    /// Unison voice count modulation
    pub unison: &'p P,
    /// Unison spread modulation
    pub unison_spread: &'p P,
    /// Unison mix modulation
    pub unison_mix: &'p P,
    /// Stretch modulation
    pub stretch: &'p P,
}

impl<'p, P> KsDelayInputs<'p, P> {
    /// Only pitch and audio connected; every modulation input reads from
    /// `unpatched`
    pub fn new(pitch: &'p P, audio: &'p P, unpatched: &'p P) -> Self {
        Self {
            pitch,
            audio,
            feedback: unpatched,
            unison: unpatched,
            unison_spread: unpatched,
            unison_mix: unpatched,
            stretch: unpatched,
        }
    }
}

/// A polyphonic plucked string: one [KsVoice] per channel
pub struct KsDelay<'a, T: Float, R: RandomSource = Rand32> {
    context: Context<T>,
    voices: ArrayVec<KsVoice<'a, T, R>, MAX_CHANNELS>,
}

impl<'a, T: Float, R: SeededSource> KsDelay<'a, T, R> {
    /// Create a string seeded with the default seed
    pub fn new(lookup: &'a Lookup<T>) -> Self {
        Self::with_seed(lookup, RANDOM_SEED)
    }
    /// Create a string whose channels draw from independent streams derived
    /// from `seed`
    pub fn with_seed(lookup: &'a Lookup<T>, seed: u64) -> Self {
        Self::with_sources(lookup, |channel| R::with_seed(channel_seed(seed, channel)))
    }
}

impl<'a, T: Float, R: RandomSource> KsDelay<'a, T, R> {
    /// Create a string, calling `source` once per channel for its random
    /// source
    pub fn with_sources(lookup: &'a Lookup<T>, mut source: impl FnMut(usize) -> R) -> Self {
        Self {
            context: Context::default(),
            voices: (0..MAX_CHANNELS)
                .map(|channel| KsVoice::new(lookup, source(channel)))
                .collect(),
        }
    }
    /// Change the sample rate, re-deriving every rate dependent
    /// coefficient.  Call [KsDelay::init] afterwards to resize the delay
    /// lines.  Invalid rates are ignored.
    pub fn set_sample_rate(&mut self, sample_rate: T) {
        match Context::maybe_create(sample_rate) {
            Some(context) => {
                log::debug!("plucked string sample rate set to {:?}", sample_rate);
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
            "initialized {} plucked string channels at {:?} Hz",
            self.voices.len(),
            context.sample_rate
        );
    }
    /// The voice for `channel`
    pub fn voice(&self, channel: usize) -> Option<&KsVoice<'a, T, R>> {
        self.voices.get(channel)
    }
    /// Process one sample on every active channel.  The channel count is
    /// the larger of the pitch and audio channel counts (at least 1).
    pub fn step<P: SignalPort<T>, O: SignalPort<T>>(
        &mut self,
        params: &KsDelayParams<T>,
        inputs: &KsDelayInputs<'_, P>,
        output: &mut O,
    ) {
        let channels = inputs
            .audio
            .channels()
            .max(inputs.pitch.channels())
            .clamp(1, MAX_CHANNELS);
        let context = self.context;
        for (channel, voice) in self.voices.iter_mut().take(channels).enumerate() {
            let input = KsVoiceInput {
                pitch: inputs.pitch.poly_voltage(channel),
                audio: inputs.audio.poly_voltage(channel),
                feedback: inputs.feedback.poly_voltage(channel),
                unison: inputs.unison.poly_voltage(channel),
                unison_spread: inputs.unison_spread.poly_voltage(channel),
                unison_mix: inputs.unison_mix.poly_voltage(channel),
                stretch: inputs.stretch.poly_voltage(channel),
            };
            output.set_voltage(channel, voice.next(&context, input, *params));
        }
        output.set_channels(channels);
    }
}
