//! Trigger detection and sample-and-hold, in scalar and four-lane forms

use crate::{Float, LANES};

/// Fraction of the held value a drooping sample-and-hold loses per sample
pub const DROOP_PER_SAMPLE: f32 = 1e-7;

/// Detects rising edges with hysteresis.  The trigger starts out high, so
/// a signal must first fall to the off threshold before it can fire.
#[derive(Clone, Copy, Debug)]
pub struct SchmittTrigger<T: Float> {
    high: bool,
    on_threshold: T,
    off_threshold: T,
}

impl<T: Float> Default for SchmittTrigger<T> {
    fn default() -> Self {
        Self {
            high: true,
            on_threshold: T::ONE,
            off_threshold: T::ZERO,
        }
    }
}

impl<T: Float> SchmittTrigger<T> {
    /// Go high at or above `on`, low at or below `off`
    pub fn set_thresholds(&mut self, on: T, off: T) {
        self.on_threshold = on;
        self.off_threshold = off;
    }
    /// Return 1 if `x` caused a low to high transition, 0 otherwise
    #[inline]
    pub fn process(&mut self, x: T) -> T {
        let was_high = self.high;
        if self.high {
            if x <= self.off_threshold {
                self.high = false;
            }
        } else if x >= self.on_threshold {
            self.high = true;
        }
        if self.high && !was_high {
            T::ONE
        } else {
            T::ZERO
        }
    }
    /// The current state
    pub fn is_high(&self) -> bool {
        self.high
    }
    /// Return to the initial (high) state
    pub fn reset(&mut self) {
        self.high = true;
    }
}

/// Four independent [SchmittTrigger]s
#[derive(Clone, Copy, Debug, Default)]
pub struct SchmittTriggerX4<T: Float> {
    lanes: [SchmittTrigger<T>; LANES],
}

impl<T: Float> SchmittTriggerX4<T> {
    /// Process one sample on every lane
    #[inline]
    pub fn process(&mut self, x: [T; LANES]) -> [T; LANES] {
        let mut ret = x;
        for (lane, y) in self.lanes.iter_mut().zip(ret.iter_mut()) {
            *y = lane.process(*y);
        }
        ret
    }
    /// The state of every lane
    pub fn is_high(&self) -> [bool; LANES] {
        self.lanes.map(|lane| lane.is_high())
    }
    /// Return every lane to the initial state
    pub fn reset(&mut self) {
        self.lanes.iter_mut().for_each(SchmittTrigger::reset);
    }
}

/// Latches its input on each rising trigger edge.  The held value starts at
/// 0 and, with droop enabled, slowly leaks toward 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct SampleAndHold<T: Float> {
    trigger: SchmittTrigger<T>,
    value: T,
    droop: bool,
}

impl<T: Float> SampleAndHold<T> {
    /// Enable or disable droop
    pub fn set_droop(&mut self, droop: bool) {
        self.droop = droop;
    }
    /// Process one sample of `x` and the trigger signal, returning the held
    /// value
    #[inline]
    pub fn step(&mut self, x: T, trigger: T) -> T {
        if self.trigger.process(trigger) > T::ZERO {
            self.value = x;
        } else if self.droop {
            self.value = self.value * (T::ONE - T::from_f32(DROOP_PER_SAMPLE));
        }
        self.value
    }
}

/// Four independent [SampleAndHold]s
#[derive(Clone, Copy, Debug, Default)]
pub struct SampleAndHoldX4<T: Float> {
    lanes: [SampleAndHold<T>; LANES],
}

impl<T: Float> SampleAndHoldX4<T> {
    /// Enable or disable droop per lane
    pub fn set_droop(&mut self, droop: [bool; LANES]) {
        for (lane, droop) in self.lanes.iter_mut().zip(droop) {
            lane.set_droop(droop);
        }
    }
    /// Process one sample on every lane
    #[inline]
    pub fn step(&mut self, x: [T; LANES], trigger: [T; LANES]) -> [T; LANES] {
        let mut ret = x;
        for ((lane, y), t) in self.lanes.iter_mut().zip(ret.iter_mut()).zip(trigger) {
            *y = lane.step(*y, t);
        }
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schmitt_trigger_starts_high() {
        let mut st = SchmittTrigger::<f32>::default();
        assert!(st.is_high());
        assert_eq!(st.process(1.0), 0.0);
        assert!(st.is_high());
        assert_eq!(st.process(0.0), 0.0);
        assert!(!st.is_high());
        assert_eq!(st.process(0.5), 0.0);
        assert_eq!(st.process(1.0), 1.0);
        assert_eq!(st.process(1.0), 0.0);
        st.reset();
        assert!(st.is_high());
    }

    #[test]
    fn schmitt_trigger_lanes_are_independent() {
        let mut st = SchmittTriggerX4::<f32>::default();
        assert_eq!(st.is_high(), [true; 4]);
        let result = st.process([0.0, 1.0, 0.0, 1.0]);
        assert_eq!(st.is_high(), [false, true, false, true]);
        assert_eq!(result, [0.0; 4]);
        let result = st.process([1.0, 1.0, 0.0, 0.0]);
        assert_eq!(result, [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(st.is_high(), [true, true, false, false]);
    }

    #[test]
    fn sample_and_hold_latches_on_rising_edge() {
        let mut sh = SampleAndHold::<f32>::default();
        let data = -7.2;
        assert_eq!(sh.step(data, 0.0), 0.0);
        assert_eq!(sh.step(data, 1.0), data);
        assert_eq!(sh.step(0.0, 0.0), data);
        assert_eq!(sh.step(3.0, 1.0), 3.0);
    }

    #[test]
    fn sample_and_hold_lanes() {
        let mut sh = SampleAndHoldX4::<f32>::default();
        let data = [-7.2, 4.1, 0.0, 9.2];
        assert_eq!(sh.step(data, [0.0; 4]), [0.0; 4]);
        assert_eq!(sh.step(data, [1.0; 4]), data);
        assert_eq!(sh.step([0.0; 4], [0.0; 4]), data);
        assert_eq!(sh.step([5.0; 4], [0.0, 1.0, 0.0, 1.0]), [-7.2, 5.0, 0.0, 5.0]);
        assert_eq!(sh.step([6.0; 4], [1.0, 1.0, 0.0, 1.0]), [6.0, 5.0, 0.0, 5.0]);
    }

    #[test]
    fn droop_leaks_toward_zero() {
        let mut sh = SampleAndHoldX4::<f64>::default();
        sh.set_droop([true, true, true, false]);
        let data = [-7.2, 4.1, 0.0, 9.2];
        sh.step(data, [0.0; 4]);
        let mut result = sh.step(data, [1.0; 4]);
        for _ in 0..10000 {
            result = sh.step(data, [0.0; 4]);
        }
        assert!(result[0] > -7.2 && (result[0] + 7.2).abs() < 0.01);
        assert!(result[1] < 4.1 && (result[1] - 4.1).abs() < 0.01);
        assert_eq!(result[2], 0.0);
        assert_eq!(result[3], 9.2);
    }
}
