use num_traits::Float as NumTraitsFloat;
use serde::{Deserialize, Serialize};

/// Types must implement this trait to instantiate any of the generic
/// primitives in this crate.  Implementations are provided for `f32` and
/// `f64`.
pub trait Float:
    NumTraitsFloat
    + From<u16>
    + From<f32>
    + Default
    + Copy
    + Send
    + Sync
    + core::fmt::Debug
    + Serialize
    + for<'a> Deserialize<'a>
{
    /// 0
    const ZERO: Self;
    /// 1
    const ONE: Self;
    /// 2
    const TWO: Self;
    /// 1/2
    const ONE_HALF: Self;
    /// 5, the nominal voltage of a full-scale audio signal
    const FIVE: Self;
    /// 10
    const TEN: Self;
    /// 20
    const TWENTY: Self;
    /// sqrt(2)
    const SQRT_2: Self;
    /// pi
    const PI: Self;
    /// 2*pi
    const TAU: Self;
    /// Creates a value of this type from a u16.  Functionality provided by
    /// the trait (uses the `From<u16>` implementation)
    fn from_u16(x: u16) -> Self {
        <Self as From<u16>>::from(x)
    }
    /// Creates a value of this type from a f32 (uses the `From<f32>`
    /// implementation)
    fn from_f32(x: f32) -> Self {
        <Self as From<f32>>::from(x)
    }
    /// Creates a value of this type from a f64, rounding if required
    fn from_f64(x: f64) -> Self;
    /// Creates a value of this type from an index or count
    fn from_usize(x: usize) -> Self;
    /// Convert to a f32
    fn as_f32(self) -> f32;
    /// Convert to a f64
    fn as_f64(self) -> f64;
    /// Truncate toward zero and convert to a signed index.  NaN and values
    /// that do not fit map to 0.
    fn to_index(self) -> isize {
        self.to_isize().unwrap_or(0)
    }
}

impl Float for f32 {
    const ZERO: f32 = 0.0f32;
    const ONE: f32 = 1.0f32;
    const TWO: f32 = 2.0f32;
    const ONE_HALF: f32 = 0.5f32;
    const FIVE: f32 = 5.0f32;
    const TEN: f32 = 10.0f32;
    const TWENTY: f32 = 20.0f32;
    const SQRT_2: f32 = core::f32::consts::SQRT_2;
    const PI: f32 = core::f32::consts::PI;
    const TAU: f32 = core::f32::consts::TAU;
    fn from_f64(x: f64) -> Self {
        x as f32
    }
    fn from_usize(x: usize) -> Self {
        x as f32
    }
    fn as_f32(self) -> f32 {
        self
    }
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Float for f64 {
    const ZERO: f64 = 0.0f64;
    const ONE: f64 = 1.0f64;
    const TWO: f64 = 2.0f64;
    const ONE_HALF: f64 = 0.5f64;
    const FIVE: f64 = 5.0f64;
    const TEN: f64 = 10.0f64;
    const TWENTY: f64 = 20.0f64;
    const SQRT_2: f64 = core::f64::consts::SQRT_2;
    const PI: f64 = core::f64::consts::PI;
    const TAU: f64 = core::f64::consts::TAU;
    fn from_f64(x: f64) -> Self {
        x
    }
    fn from_usize(x: usize) -> Self {
        x as f64
    }
    fn as_f32(self) -> f32 {
        self as f32
    }
    fn as_f64(self) -> f64 {
        self
    }
}
