//! The interface between the composites in this crate and the host's
//! ports.
//!
//! A port carries up to [MAX_CHANNELS] voltages.  A port with zero channels
//! is disconnected; a port with one channel is monophonic and is broadcast
//! to every channel by [SignalPort::poly_voltage].

use crate::{Float, MAX_CHANNELS};
use arrayvec::ArrayVec;

/// Per-channel voltage I/O
pub trait SignalPort<T: Float> {
    /// The number of active channels
    fn channels(&self) -> usize;
    /// The voltage on `channel`, or 0 if that channel is not active
    fn voltage(&self, channel: usize) -> T;
    /// Set the voltage on `channel`
    fn set_voltage(&mut self, channel: usize, value: T);
    /// Set the number of active channels (at most [MAX_CHANNELS])
    fn set_channels(&mut self, channels: usize);
    /// The voltage on `channel`, with a monophonic signal applying to every
    /// channel
    fn poly_voltage(&self, channel: usize) -> T {
        if self.channels() == 1 {
            self.voltage(0)
        } else {
            self.voltage(channel)
        }
    }
    /// True if anything is patched into this port
    fn is_connected(&self) -> bool {
        self.channels() > 0
    }
}

/// An in-memory port
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolyPort<T: Float> {
    voltages: ArrayVec<T, MAX_CHANNELS>,
}

impl<T: Float> PolyPort<T> {
    /// A disconnected port
    pub fn new() -> Self {
        Self {
            voltages: ArrayVec::new(),
        }
    }
    /// A monophonic port carrying `value`
    pub fn mono(value: T) -> Self {
        Self::poly(&[value])
    }
    /// A polyphonic port carrying `values`.  Values past [MAX_CHANNELS] are
    /// dropped.
    pub fn poly(values: &[T]) -> Self {
        Self {
            voltages: values.iter().copied().take(MAX_CHANNELS).collect(),
        }
    }
    /// The voltages on the active channels
    pub fn voltages(&self) -> &[T] {
        &self.voltages
    }
}

impl<T: Float> SignalPort<T> for PolyPort<T> {
    fn channels(&self) -> usize {
        self.voltages.len()
    }
    fn voltage(&self, channel: usize) -> T {
        self.voltages.get(channel).copied().unwrap_or(T::ZERO)
    }
    fn set_voltage(&mut self, channel: usize, value: T) {
        if channel >= MAX_CHANNELS {
            return;
        }
        while self.voltages.len() <= channel {
            self.voltages.push(T::ZERO);
        }
        self.voltages[channel] = value;
    }
    fn set_channels(&mut self, channels: usize) {
        let channels = channels.min(MAX_CHANNELS);
        self.voltages.truncate(channels);
        while self.voltages.len() < channels {
            self.voltages.push(T::ZERO);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_ports_broadcast() {
        let port = PolyPort::mono(2.5f32);
        assert!(port.is_connected());
        assert_eq!(port.poly_voltage(0), 2.5);
        assert_eq!(port.poly_voltage(7), 2.5);
        assert_eq!(port.voltage(7), 0.0);
    }

    #[test]
    fn poly_ports_do_not_broadcast() {
        let port = PolyPort::poly(&[1.0f32, 2.0]);
        assert_eq!(port.channels(), 2);
        assert_eq!(port.poly_voltage(1), 2.0);
        assert_eq!(port.poly_voltage(2), 0.0);
        assert!(!PolyPort::<f32>::new().is_connected());
    }

    #[test]
    fn channel_count_follows_writes() {
        let mut port = PolyPort::<f32>::new();
        port.set_voltage(2, 1.0);
        assert_eq!(port.voltages(), &[0.0, 0.0, 1.0]);
        port.set_channels(1);
        assert_eq!(port.voltages(), &[0.0]);
        port.set_channels(40);
        assert_eq!(port.channels(), MAX_CHANNELS);
        port.set_voltage(MAX_CHANNELS, 3.0);
        assert_eq!(port.channels(), MAX_CHANNELS);
        assert_eq!(PolyPort::poly(&[1.0f32; 20]).channels(), MAX_CHANNELS);
    }
}
