//! Table-driven nonlinear waveshaping.
//!
//! Every curve is stored as a [SHAPE_LENGTH]-point table over
//! `[SHAPE_MIN, SHAPE_MAX]`.  With ±1.0 representing ±10V, the domain leaves
//! headroom for the ±12V a modular signal can swing to.

use crate::util::linear_interpolate;
use crate::{Float, LANES};
use alloc::vec::Vec;

/// Number of intervals in every shape table
pub const SHAPE_LENGTH: usize = 4096;
/// Lower edge of the shape domain
pub const SHAPE_MIN: f64 = -1.2;
/// Upper edge of the shape domain
pub const SHAPE_MAX: f64 = 1.2;

const SHAPE_MASK: usize = SHAPE_LENGTH - 1;

fn shape_interval<T: Float>() -> T {
    T::from_f64((SHAPE_MAX - SHAPE_MIN) / SHAPE_LENGTH as f64)
}

/// One transfer curve sampled over the shape domain
#[derive(Clone, Debug)]
pub struct ShapeTable<T: Float> {
    // one extra sample so the upper neighbour of any masked index exists
    samples: Vec<T>,
}

impl<T: Float> ShapeTable<T> {
    /// Sample `f` across the shape domain
    pub fn from_fn(f: impl Fn(T) -> T) -> Self {
        let min = T::from_f64(SHAPE_MIN);
        let interval = shape_interval::<T>();
        Self {
            samples: (0..=SHAPE_LENGTH)
                .map(|i| f(min + T::from_usize(i) * interval))
                .collect(),
        }
    }
    /// Build a curve from measured `(input, output)` points, sorted by
    /// input.  The curve is linear between points and flat beyond the
    /// first and last point.
    ///
    /// # Panics
    ///
    /// Panics if fewer than two points are given or the inputs are not
    /// strictly increasing.
    pub fn from_points(points: &[(T, T)]) -> Self {
        assert!(points.len() >= 2, "a measured curve needs at least two points");
        assert!(
            points.windows(2).all(|w| w[0].0 < w[1].0),
            "measured curve inputs must be strictly increasing"
        );
        Self::from_fn(|x| {
            let (first, last) = (points[0], points[points.len() - 1]);
            if x <= first.0 {
                return first.1;
            }
            if x >= last.0 {
                return last.1;
            }
            points
                .windows(2)
                .find(|w| x <= w[1].0)
                .map(|w| linear_interpolate(w[0].1, w[1].1, (x - w[0].0) / (w[1].0 - w[0].0)))
                .unwrap_or(last.1)
        })
    }
    /// Evaluate the curve.  `x` should lie within the shape domain: the
    /// index is masked rather than clamped, so values outside of it wrap
    /// to an arbitrary point of the table.
    #[inline]
    pub fn process(&self, x: T) -> T {
        let pos = (x - T::from_f64(SHAPE_MIN)) / shape_interval::<T>();
        let whole = pos.floor();
        let index = (whole.to_index() as usize) & SHAPE_MASK;
        linear_interpolate(self.samples[index], self.samples[index + 1], pos - whole)
    }
    /// Evaluate the curve with `x` held to the shape domain.  The upper
    /// edge reads the last sample exactly.
    #[inline]
    pub fn process_clamped(&self, x: T) -> T {
        let x = x.max(T::from_f64(SHAPE_MIN)).min(T::from_f64(SHAPE_MAX));
        let pos = (x - T::from_f64(SHAPE_MIN)) / shape_interval::<T>();
        let index = pos.floor().to_index().clamp(0, SHAPE_MASK as isize) as usize;
        let frac = (pos - T::from_usize(index)).max(T::ZERO).min(T::ONE);
        linear_interpolate(self.samples[index], self.samples[index + 1], frac)
    }
}

#[derive(Clone, Debug)]
struct Shape<T: Float> {
    table: ShapeTable<T>,
    name: &'static str,
}

/// A catalogue of named curves, selected by index
#[derive(Clone, Debug, Default)]
pub struct WaveShapers<T: Float> {
    shapes: Vec<Shape<T>>,
}

impl<T: Float> WaveShapers<T> {
    /// An empty catalogue
    pub fn new() -> Self {
        Self { shapes: Vec::new() }
    }
    /// Append a curve, returning its index
    pub fn add_shape(&mut self, table: ShapeTable<T>, name: &'static str) -> usize {
        log::debug!("registering waveshaper curve {} as {}", name, self.shapes.len());
        self.shapes.push(Shape { table, name });
        self.shapes.len() - 1
    }
    /// The number of curves
    pub fn len(&self) -> usize {
        self.shapes.len()
    }
    /// True if no curves have been added
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
    /// The name of the curve at `index`
    pub fn name(&self, index: usize) -> Option<&'static str> {
        self.shapes.get(index).map(|s| s.name)
    }
    #[inline]
    fn shape(&self, index: usize) -> Option<&Shape<T>> {
        self.shapes.get(index).or(self.shapes.last())
    }
    /// Shape `x` with the curve at `index`.  The input is clamped to the
    /// shape domain and indices past the end select the last curve.  An
    /// empty catalogue passes the input through.
    #[inline]
    pub fn process(&self, x: T, index: usize) -> T {
        match self.shape(index) {
            Some(shape) => shape.table.process_clamped(x),
            None => x,
        }
    }
    /// Shape four lanes with the curve at `index`.  Index 0 passes the
    /// input through untouched.
    pub fn process_x4(&self, x: [T; LANES], index: usize) -> [T; LANES] {
        if index == 0 {
            return x;
        }
        match self.shape(index) {
            Some(shape) => x.map(|x| shape.table.process_clamped(x)),
            None => x,
        }
    }
}

/// The built in curves of [Nld], in catalogue order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum NldCurve {
    /// y = x
    #[default]
    Linear,
    /// y = tanh(x)
    Tanh,
    /// y = tanh(2x) / tanh(2)
    Tanh2,
    /// y = 1.5x(1 - x²/3), a cubic soft clipper
    Cosine,
    /// Gentle arctangent
    Atan2,
    /// Medium arctangent
    Atan5,
    /// Hard arctangent
    Atan10,
}

impl NldCurve {
    /// Every built in curve, in catalogue order
    pub const ALL: [NldCurve; 7] = [
        NldCurve::Linear,
        NldCurve::Tanh,
        NldCurve::Tanh2,
        NldCurve::Cosine,
        NldCurve::Atan2,
        NldCurve::Atan5,
        NldCurve::Atan10,
    ];
    /// The catalogue index of this curve
    pub const fn index(self) -> usize {
        self as usize
    }
    const fn name(self) -> &'static str {
        match self {
            NldCurve::Linear => "linear",
            NldCurve::Tanh => "tanh",
            NldCurve::Tanh2 => "tanh2",
            NldCurve::Cosine => "cos",
            NldCurve::Atan2 => "atan2",
            NldCurve::Atan5 => "atan5",
            NldCurve::Atan10 => "atan10",
        }
    }
    fn eval<T: Float>(self, x: T) -> T {
        let atan = |k: u16| {
            let k = T::from_u16(k);
            (k * x).atan() / (k * T::from_f64(SHAPE_MAX)).atan()
        };
        match self {
            NldCurve::Linear => x,
            NldCurve::Tanh => x.tanh(),
            NldCurve::Tanh2 => (T::TWO * x).tanh() / T::TWO.tanh(),
            NldCurve::Cosine => {
                let three = T::from_u16(3);
                T::from_f32(1.5) * x * (T::ONE - x * x / three)
            }
            NldCurve::Atan2 => atan(2),
            NldCurve::Atan5 => atan(5),
            NldCurve::Atan10 => atan(10),
        }
    }
}

/// A nonlinear distortion stage: the built in [NldCurve]s plus any
/// measured curves added at runtime
#[derive(Clone, Debug)]
pub struct Nld<T: Float> {
    shapers: WaveShapers<T>,
}

impl<T: Float> Nld<T> {
    /// Build every built in curve
    pub fn new() -> Self {
        let mut shapers = WaveShapers::new();
        for curve in NldCurve::ALL {
            shapers.add_shape(ShapeTable::from_fn(|x| curve.eval(x)), curve.name());
        }
        Self { shapers }
    }
    /// Add a measured transfer curve (see [ShapeTable::from_points]),
    /// returning its index
    pub fn add_measured(&mut self, points: &[(T, T)], name: &'static str) -> usize {
        self.shapers.add_shape(ShapeTable::from_points(points), name)
    }
    /// The curve catalogue
    pub fn shapers(&self) -> &WaveShapers<T> {
        &self.shapers
    }
    /// Shape one sample with a built in curve
    #[inline]
    pub fn process(&self, x: T, curve: NldCurve) -> T {
        self.shapers.process(x, curve.index())
    }
    /// Shape one sample with any curve in the catalogue
    #[inline]
    pub fn process_index(&self, x: T, index: usize) -> T {
        self.shapers.process(x, index)
    }
    /// Shape four lanes with any curve in the catalogue
    pub fn process_x4(&self, x: [T; LANES], index: usize) -> [T; LANES] {
        self.shapers.process_x4(x, index)
    }
}

impl<T: Float> Default for Nld<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> impl Iterator<Item = f32> {
        (0..24000).map(|i| -1.2 + i as f32 * 0.0001)
    }

    #[test]
    fn tanh_curve_error() {
        let nld = Nld::<f32>::new();
        for x in domain() {
            assert!((nld.process(x, NldCurve::Tanh) - x.tanh()).abs() < 0.001);
            assert!((nld.process(x, NldCurve::Linear) - x).abs() < 1e-4);
        }
    }

    #[test]
    fn saturating_curves_are_bounded() {
        let nld = Nld::<f32>::new();
        for curve in [NldCurve::Cosine, NldCurve::Atan2, NldCurve::Atan5, NldCurve::Atan10] {
            for x in domain() {
                let y = nld.process(x, curve);
                assert!((-1.0001..=1.0001).contains(&y), "{:?}({}) = {}", curve, x, y);
            }
        }
    }

    #[test]
    fn arctangent_hardness_increases() {
        let nld = Nld::<f32>::new();
        let a = nld.process(0.2, NldCurve::Atan2);
        let b = nld.process(0.2, NldCurve::Atan5);
        let c = nld.process(0.2, NldCurve::Atan10);
        assert!(a < b && b < c);
    }

    #[test]
    fn catalogue_names_and_indices() {
        let mut nld = Nld::<f32>::new();
        assert_eq!(nld.shapers().len(), NldCurve::ALL.len());
        assert_eq!(nld.shapers().name(NldCurve::Tanh2.index()), Some("tanh2"));
        let diode = nld.add_measured(&[(-0.5, -0.1), (0.0, 0.0), (0.5, 0.7)], "diode");
        assert_eq!(diode, 7);
        assert_eq!(nld.shapers().name(diode), Some("diode"));
        assert!((nld.process_index(0.25, diode) - 0.35).abs() < 1e-3);
        assert!((nld.process_index(-1.0, diode) + 0.1).abs() < 1e-6);
        // indices past the end select the last curve
        assert_eq!(nld.process_index(0.25, 100), nld.process_index(0.25, diode));
        assert_eq!(nld.shapers().name(100), None);
    }

    #[test]
    fn inputs_are_clamped_to_the_domain() {
        let nld = Nld::<f32>::new();
        let edge = nld.process(1.2, NldCurve::Tanh);
        assert_eq!(nld.process(50.0, NldCurve::Tanh), edge);
        assert!((edge - 1.2f32.tanh()).abs() < 0.001);
        assert!(nld.process(f32::NEG_INFINITY, NldCurve::Tanh) < -0.83);
    }

    #[test]
    fn upper_edge_reads_the_last_sample() {
        let nld = Nld::<f64>::new();
        for x in [1.1995, 1.1998, 1.2] {
            assert!((nld.process(x, NldCurve::Linear) - x).abs() < 1e-9);
        }
        assert!((nld.process(1.2, NldCurve::Tanh) - 1.2f64.tanh()).abs() < 1e-9);
        assert!((nld.process(-1.2, NldCurve::Tanh) + 1.2f64.tanh()).abs() < 1e-9);
        let shaped = nld.process_x4([1.2, 1.1999, -1.2, 9.0], NldCurve::Linear.index());
        assert!((shaped[0] - 1.2).abs() < 1e-9);
        assert!((shaped[1] - 1.1999).abs() < 1e-9);
        assert!((shaped[3] - 1.2).abs() < 1e-9);
    }

    #[test]
    fn vector_path() {
        let nld = Nld::<f32>::new();
        let x = [-3.0, -0.5, 0.25, 1.1];
        assert_eq!(nld.process_x4(x, 0), x);
        let shaped = nld.process_x4(x, NldCurve::Tanh.index());
        for (y, x) in shaped.iter().zip(x) {
            assert_eq!(*y, nld.process(x, NldCurve::Tanh));
        }
        assert_eq!(WaveShapers::<f32>::new().process(0.3, 2), 0.3);
    }
}
