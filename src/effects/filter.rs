use std::f64::consts::{FRAC_1_SQRT_2, PI};

use super::{check_range, Processor};
use crate::error::EffectError;

/// Transposed direct-form II biquad.
#[derive(Debug, Clone, Copy)]
pub struct Biquad {
    // feed-forward
    b0: f64,
    b1: f64,
    b2: f64,
    // feed-back (a0 normalized to 1.0)
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl Biquad {
    /// Butterworth (Q = 1/√2) high-pass, 12 dB/octave.
    pub fn high_pass(cutoff_hz: f32, sample_rate: f32) -> Result<Self, EffectError> {
        // strictly below Nyquist
        check_range("high_pass", "cutoff_hz", cutoff_hz, 1.0..=sample_rate * 0.4999)?;

        let fs = sample_rate as f64;
        let w0 = 2.0 * PI * cutoff_hz as f64 / fs;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * FRAC_1_SQRT_2);
        let a0 = 1.0 + alpha;

        Ok(Self {
            b0: (1.0 + cos) / 2.0 / a0,
            b1: -(1.0 + cos) / a0,
            b2: (1.0 + cos) / 2.0 / a0,
            a1: -2.0 * cos / a0,
            a2: (1.0 - alpha) / a0,
            z1: 0.0,
            z2: 0.0,
        })
    }
}

impl Processor for Biquad {
    #[inline(always)]
    fn process(&mut self, input: f32) -> f32 {
        let x = input as f64;
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::test_signals::{rms, sine};
    use crate::effects::EffectSpec;

    #[test]
    fn removes_dc_offset() {
        let mut filter = Biquad::high_pass(100.0, 8_000.0).unwrap();
        let out: Vec<f32> = (0..8_000).map(|_| filter.process(0.5)).collect();
        assert!(out[7_999].abs() < 1e-3, "residual {}", out[7_999]);
    }

    #[test]
    fn attenuates_rumble_and_passes_voice_band() {
        let spec = EffectSpec::HighPass { cutoff_hz: 100.0 };

        let mut rumble = sine(25.0, 0.5, 16_000, 1.0);
        spec.apply(&mut rumble).unwrap();
        let tail = rumble.samples.row(0).to_vec();
        assert!(rms(&tail[8_000..]) < 0.5 * 0.707 * 0.1);

        let mut voice = sine(1_000.0, 0.5, 16_000, 1.0);
        spec.apply(&mut voice).unwrap();
        let tail = voice.samples.row(0).to_vec();
        assert!((rms(&tail[8_000..]) - 0.5 * 0.707).abs() < 0.01);
    }
}
