//! Delay lines.
//!
//! [CircularBuffer] is a power-of-two ring buffer addressed relative to its
//! write head, so wraparound is a mask instead of a branch.  [WaveGuide]
//! chains two of them into a bidirectional line with a [Node] transform at
//! each end.

use crate::util::{linear_interpolate, sanitize};
use crate::Float;
use alloc::vec;
use alloc::vec::Vec;

/// Capacity used when no explicit size is requested
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// A fixed capacity ring buffer.  All offsets and delays count samples back
/// from the most recent write; a delay of 0 is the last written sample.
///
/// Non-finite values are stored as 0.
#[derive(Clone, Debug)]
pub struct CircularBuffer<T: Float> {
    buffer: Vec<T>,
    write_index: usize,
    wrap_mask: usize,
}

impl<T: Float> CircularBuffer<T> {
    /// Create a cleared buffer with a capacity of at least `min_size`
    pub fn new(min_size: usize) -> Self {
        let mut ret = Self {
            buffer: Vec::new(),
            write_index: 0,
            wrap_mask: 0,
        };
        ret.reset(min_size);
        ret
    }
    /// Reallocate to the next power of two at or above `min_size` and clear
    /// the contents.  This allocates, so keep it out of the audio path.
    pub fn reset(&mut self, min_size: usize) {
        let len = min_size.max(1).next_power_of_two();
        if len != self.buffer.len() {
            log::debug!("resizing delay line to {} samples", len);
            self.buffer = vec![T::ZERO; len];
        } else {
            self.clear();
        }
        self.write_index = 0;
        self.wrap_mask = len - 1;
    }
    /// Zero the contents without changing the capacity
    pub fn clear(&mut self) {
        self.buffer.fill(T::ZERO);
    }
    /// The number of samples the buffer can hold (always a power of two)
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
    #[inline]
    fn position(&self, delay: usize) -> usize {
        self.write_index.wrapping_sub(delay) & self.wrap_mask
    }
    /// Advance the write head and store `value` there
    #[inline]
    pub fn write(&mut self, value: T) {
        self.write_index = (self.write_index + 1) & self.wrap_mask;
        self.buffer[self.write_index] = sanitize(value);
    }
    /// Overwrite the sample `offset` samples behind the write head, without
    /// moving the head
    #[inline]
    pub fn write_at(&mut self, offset: usize, value: T) {
        let pos = self.position(offset);
        self.buffer[pos] = sanitize(value);
    }
    /// Accumulate `value` into the sample `offset` samples behind the write
    /// head, without moving the head
    #[inline]
    pub fn add_at(&mut self, offset: usize, value: T) {
        let pos = self.position(offset);
        self.buffer[pos] = sanitize(self.buffer[pos] + value);
    }
    /// The sample written `delay` writes ago.  Delays at or beyond the
    /// capacity wrap.
    #[inline]
    pub fn read(&self, delay: usize) -> T {
        self.buffer[self.position(delay)]
    }
    /// Read a fractional delay, linearly interpolating between the two
    /// neighbouring samples.  Negative delays read as 0 samples of delay.
    #[inline]
    pub fn read_frac(&self, delay: T) -> T {
        let delay = delay.max(T::ZERO);
        let whole = delay.floor();
        let index = whole.to_index() as usize;
        linear_interpolate(self.read(index), self.read(index + 1), delay - whole)
    }
}

impl<T: Float> Default for CircularBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

/// A transform applied to the signal as it reflects off one end of a
/// [WaveGuide]
pub trait Node<T: Float> {
    /// Process one sample arriving at this end of the waveguide
    fn step(&mut self, x: T) -> T;
}

/// A lossless, non-inverting termination
#[derive(Clone, Copy, Debug, Default)]
pub struct PassThrough;

impl<T: Float> Node<T> for PassThrough {
    #[inline]
    fn step(&mut self, x: T) -> T {
        x
    }
}

/// A termination that scales the reflected signal by a fixed gain (use a
/// negative gain for an inverting reflection)
#[derive(Clone, Copy, Debug)]
pub struct Attenuator<T: Float> {
    /// The reflection gain
    pub gain: T,
}

impl<T: Float> Node<T> for Attenuator<T> {
    #[inline]
    fn step(&mut self, x: T) -> T {
        x * self.gain
    }
}

/// Default length of a waveguide, in samples per direction
pub const DEFAULT_WAVEGUIDE_LENGTH: usize = 500;

/// A bidirectional delay line.  Samples travel forward along one buffer
/// and back along the other, passing through a [Node] at each end.
#[derive(Clone, Debug)]
pub struct WaveGuide<T: Float, A: Node<T> = PassThrough, B: Node<T> = PassThrough> {
    forward: CircularBuffer<T>,
    backward: CircularBuffer<T>,
    forward_end: A,
    backward_end: B,
    length: usize,
}

impl<T: Float> WaveGuide<T> {
    /// A waveguide with lossless terminations and the default sizes
    pub fn new() -> Self {
        Self::with_nodes(PassThrough, PassThrough)
    }
}

impl<T: Float> Default for WaveGuide<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float, A: Node<T>, B: Node<T>> WaveGuide<T, A, B> {
    /// A waveguide with the given terminations and the default sizes.
    /// `forward_end` processes samples leaving the forward buffer and
    /// `backward_end` those leaving the backward buffer.
    pub fn with_nodes(forward_end: A, backward_end: B) -> Self {
        Self {
            forward: CircularBuffer::default(),
            backward: CircularBuffer::default(),
            forward_end,
            backward_end,
            length: DEFAULT_WAVEGUIDE_LENGTH,
        }
    }
    /// Reallocate both directions to at least `size` samples, clearing
    /// them.  The length is shortened if it no longer fits.
    pub fn set_buffer_size(&mut self, size: usize) {
        self.forward.reset(size);
        self.backward.reset(size);
        self.length = self.length.min(self.forward.capacity() - 1);
    }
    /// The capacity of each direction
    pub fn buffer_size(&self) -> usize {
        self.forward.capacity()
    }
    /// Set the length of the waveguide, in samples per direction.  Lengths
    /// that do not fit within the buffers are ignored.
    pub fn set_length(&mut self, length: usize) {
        if length < self.buffer_size() {
            self.length = length;
        } else {
            log::warn!(
                "ignoring waveguide length {} (buffer size {})",
                length,
                self.buffer_size()
            );
        }
    }
    /// The length of the waveguide, in samples per direction
    pub fn length(&self) -> usize {
        self.length
    }
    /// The termination at the end of the forward buffer
    pub fn forward_end(&mut self) -> &mut A {
        &mut self.forward_end
    }
    /// The termination at the end of the backward buffer
    pub fn backward_end(&mut self) -> &mut B {
        &mut self.backward_end
    }
    /// Move every sample one step along the waveguide, reflecting the
    /// samples that reach either end through that end's node
    pub fn step(&mut self) {
        let x = self.backward.read(self.length);
        self.backward.write_at(self.length, T::ZERO);
        let x = self.backward_end.step(x);
        self.forward.write(x);

        let x = self.forward.read(self.length);
        self.forward.write_at(self.length, T::ZERO);
        let x = self.forward_end.step(x);
        self.backward.write(x);
    }
    #[inline]
    fn taps(&self, frac: T) -> (usize, usize) {
        let frac = frac.max(T::ZERO).min(T::ONE);
        let length = T::from_usize(self.length);
        let forward = (length * frac).to_index() as usize;
        let backward = (length * (T::ONE - frac)).to_index() as usize;
        (forward, backward)
    }
    /// Inject `value` at `frac` (0 to 1) of the way along the waveguide,
    /// split evenly between both directions
    pub fn add(&mut self, frac: T, value: T) {
        let (forward, backward) = self.taps(frac);
        let half = value * T::ONE_HALF;
        self.forward.add_at(forward, half);
        self.backward.add_at(backward, half);
    }
    /// Read the sum of both directions at `frac` (0 to 1) of the way along
    /// the waveguide
    pub fn read(&self, frac: T) -> T {
        let (forward, backward) = self.taps(frac);
        self.forward.read(forward) + self.backward.read(backward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_is_next_power_of_two() {
        for (requested, expected) in [(0, 1), (6, 8), (500, 512), (4000, 4096), (4096, 4096), (8000, 8192)] {
            let buffer = CircularBuffer::<f32>::new(requested);
            assert_eq!(buffer.capacity(), expected);
            assert!(buffer.capacity().is_power_of_two());
            assert!(buffer.capacity() >= requested);
        }
    }

    #[test]
    fn fresh_buffer_reads_back_written_sample() {
        let mut buffer = CircularBuffer::<f32>::new(4096);
        assert_eq!(buffer.capacity(), 4096);
        buffer.write(1.0);
        assert_eq!(buffer.read(0), 1.0);
        assert_eq!(buffer.read(1), 0.0);
    }

    #[test]
    fn reads_return_writes_in_reverse_order() {
        let mut buffer = CircularBuffer::<f32>::new(8);
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        for v in values {
            buffer.write(v);
        }
        for (delay, v) in values.iter().rev().enumerate() {
            assert_eq!(buffer.read(delay), *v);
        }
    }

    #[test]
    fn reads_wrap_around_capacity() {
        let mut buffer = CircularBuffer::<f32>::new(4);
        for v in 0..10 {
            buffer.write(v as f32);
        }
        assert_eq!(buffer.read(0), 9.0);
        assert_eq!(buffer.read(3), 6.0);
        assert_eq!(buffer.read(4), 9.0);
    }

    #[test]
    fn fractional_read_interpolates() {
        let mut buffer = CircularBuffer::<f32>::new(8);
        buffer.write(1.0);
        buffer.write(0.5);
        assert_eq!(buffer.read_frac(0.5), 0.75);
        assert_eq!(buffer.read_frac(0.0), 0.5);
        assert_eq!(buffer.read_frac(1.0), 1.0);
        assert_eq!(buffer.read_frac(-2.0), 0.5);
    }

    #[test]
    fn non_finite_values_are_stored_as_zero() {
        let mut buffer = CircularBuffer::<f32>::new(8);
        buffer.write(f32::NAN);
        assert_eq!(buffer.read(0), 0.0);
        buffer.write(f32::INFINITY);
        assert_eq!(buffer.read(0), 0.0);
        buffer.write(1.0);
        buffer.write_at(0, f32::NEG_INFINITY);
        assert_eq!(buffer.read(0), 0.0);
        buffer.write(f32::MAX);
        buffer.add_at(0, f32::MAX);
        assert_eq!(buffer.read(0), 0.0);
    }

    #[test]
    fn offset_writes_do_not_move_the_head() {
        let mut buffer = CircularBuffer::<f64>::new(16);
        buffer.write(1.0);
        buffer.write(2.0);
        buffer.add_at(1, 0.5);
        buffer.write_at(0, 7.0);
        assert_eq!(buffer.read(0), 7.0);
        assert_eq!(buffer.read(1), 1.5);
        buffer.add_at(0, 1.0);
        assert_eq!(buffer.read(0), 8.0);
    }

    #[test]
    fn reset_clears_contents() {
        let mut buffer = CircularBuffer::<f32>::new(16);
        buffer.write(3.0);
        buffer.reset(16);
        assert_eq!(buffer.read(0), 0.0);
        buffer.reset(100);
        assert_eq!(buffer.capacity(), 128);
    }

    #[test]
    fn waveguide_defaults() {
        let mut wg = WaveGuide::<f32>::new();
        assert_eq!(wg.buffer_size(), DEFAULT_BUFFER_SIZE);
        assert_eq!(wg.length(), DEFAULT_WAVEGUIDE_LENGTH);
        wg.set_length(5000);
        assert_eq!(wg.length(), DEFAULT_WAVEGUIDE_LENGTH);
        wg.set_buffer_size(8000);
        assert_eq!(wg.buffer_size(), 8192);
        wg.set_length(5000);
        assert_eq!(wg.length(), 5000);
    }

    #[test]
    fn waveguide_injection_splits_between_directions() {
        let mut wg = WaveGuide::<f32>::new();
        wg.set_buffer_size(16);
        wg.set_length(8);
        wg.add(0.5, 3.0);
        assert_eq!(wg.read(0.5), 3.0);
        wg.step();
        assert_eq!(wg.read(0.625), 1.5);
        assert_eq!(wg.read(0.375), 1.5);
        assert_eq!(wg.read(0.5), 0.0);
        wg.step();
        assert_eq!(wg.read(0.75), 1.5);
        assert_eq!(wg.read(0.25), 1.5);
    }

    #[test]
    fn waveguide_terminations_absorb_energy() {
        let mut wg =
            WaveGuide::<f32, _, _>::with_nodes(Attenuator { gain: 0.0 }, Attenuator { gain: 0.0 });
        wg.set_buffer_size(16);
        wg.set_length(8);
        wg.add(0.5, 1.0);
        for _ in 0..20 {
            wg.step();
        }
        for frac in [0.25, 0.5, 0.75] {
            assert_eq!(wg.read(frac), 0.0);
        }
    }

    #[test]
    fn waveguide_without_loss_keeps_ringing() {
        let mut wg = WaveGuide::<f32>::new();
        wg.set_buffer_size(16);
        wg.set_length(8);
        wg.add(0.5, 1.0);
        let mut heard = 0;
        for _ in 0..200 {
            wg.step();
            if wg.read(0.25) != 0.0 {
                heard += 1;
            }
        }
        assert!(heard > 20);
    }
}
