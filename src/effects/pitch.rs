use super::delay::DelayLine;
use super::{check_range, Processor};
use crate::error::EffectError;

/// Length of the sweeping read window, in seconds.
const WINDOW_SECS: f32 = 0.05;

/// Delay-line pitch shifter.
///
/// Two read taps sweep through a short window at a rate set by the pitch
/// ratio, half a window apart, each faded in and out with a triangular
/// envelope so one tap is always at full level while the other wraps around.
/// Duration is preserved.
pub struct PitchShifter {
    line: DelayLine,
    window: f32,
    /// Position of the first tap within the window, in `[0, 1)`.
    phase: f32,
    step: f32,
}

impl PitchShifter {
    pub fn new(semitones: f32, sample_rate: f32) -> Result<Self, EffectError> {
        check_range("pitch_shift", "semitones", semitones, -24.0..=24.0)?;

        let ratio = 2f32.powf(semitones / 12.0);
        // even, so the taps sit exactly half a window apart
        let window = ((sample_rate * WINDOW_SECS / 2.0).round() * 2.0).max(4.0);
        Ok(Self {
            line: DelayLine::new(window as usize + 1),
            window,
            phase: 0.0,
            step: (1.0 - ratio) / window,
        })
    }
}

impl Processor for PitchShifter {
    fn process(&mut self, input: f32) -> f32 {
        self.line.push(input);

        let mut out = 0.0;
        for offset in [0.0, 0.5] {
            let p = (self.phase + offset).fract();
            let gain = 1.0 - (2.0 * p - 1.0).abs();
            out += gain * self.line.read(p * self.window);
        }

        self.phase = (self.phase + self.step).rem_euclid(1.0);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::test_signals::sine;
    use crate::effects::EffectSpec;

    fn zero_crossing_hz(samples: &[f32], sample_rate: f32) -> f32 {
        let crossings = samples
            .windows(2)
            .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
            .count();
        crossings as f32 / 2.0 / (samples.len() as f32 / sample_rate)
    }

    #[test]
    fn shifts_down_by_one_and_a_half_semitones() {
        let mut buffer = sine(440.0, 0.5, 8_000, 1.0);
        EffectSpec::PitchShift { semitones: -1.5 }
            .apply(&mut buffer)
            .unwrap();

        assert_eq!(buffer.frames(), 8_000);
        let out = buffer.samples.row(0).to_vec();
        let hz = zero_crossing_hz(&out[800..], 8_000.0);
        let expected = 440.0 * 2f32.powf(-1.5 / 12.0);
        assert!((hz - expected).abs() < 10.0, "measured {hz} Hz, expected {expected}");
    }

    #[test]
    fn zero_semitones_is_a_short_delay() {
        let mut shifter = PitchShifter::new(0.0, 8_000.0).unwrap();
        let out: Vec<f32> = (0..1_000).map(|n| shifter.process(n as f32)).collect();
        // taps fixed at 0 and half a window: weights 0 and 1
        assert_eq!(out[999], 999.0 - 200.0);
    }

    #[test]
    fn rejects_extreme_shift() {
        assert!(PitchShifter::new(-48.0, 24_000.0).is_err());
    }
}
