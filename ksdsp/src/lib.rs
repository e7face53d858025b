//! This crate contains the DSP primitives used to build synthesizer-style
//! modules: delay lines, lookup-table accelerated math, biquad filters, an
//! envelope-following compressor, table-driven waveshaping, and the
//! composites built on top of them (a Karplus-Strong plucked string voice
//! and a feedback comb filter).
//!
//! Everything here is designed to run inside an audio callback.  Storage
//! (tables, delay lines) is allocated once, when a primitive is constructed
//! or a composite is `init`ed, and the per-sample paths never allocate,
//! block, or return errors: out of range inputs are clamped and non-finite
//! samples are flushed to zero before they can reach a feedback path.
//!
//! All primitives are generic over the [Float] trait, which is implemented
//! for `f32` and `f64`.  Composites talk to the outside world through the
//! [port::SignalPort] trait, so the same code runs against a host's ports or
//! against the in-memory [port::PolyPort] in tests.
//!
//! Lookup tables are not global: build one [lookup::Lookup] at startup and
//! hand a reference to every composite that needs it.

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

#[cfg(not(any(feature = "std", feature = "libm")))]
compile_error!("ksdsp requires either the `std` or the `libm` feature for floating point math");

mod float_traits;
pub use float_traits::Float;

pub mod context;
pub mod devices;
pub mod util;

pub mod biquad;
pub mod delay;
pub mod dynamics;
pub mod lookup;
pub mod port;
pub mod random;
pub mod slew;
pub mod trigger;
pub mod waveshaper;

pub mod comb;
pub mod ksdelay;

/// The maximum number of polyphonic channels a port can carry
pub const MAX_CHANNELS: usize = 16;

/// The width of the vectorized (multi-lane) primitives
pub const LANES: usize = 4;

/// The frequency of middle C (C4), in Hz.  A pitch control voltage of 0V
/// corresponds to this frequency under the 1V/octave convention.
pub const FREQ_C4: f64 = 261.6256;

/// True if using libm for floating-point math, false if using the standard
/// library
pub const USE_LIBM: bool = cfg!(feature = "libm");

pub use comb::CombFilter;
pub use context::Context;
pub use devices::Device;
pub use ksdelay::KsDelay;
pub use lookup::Lookup;
pub use port::{PolyPort, SignalPort};
pub use random::RandomSource;
