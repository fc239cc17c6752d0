use super::{check_range, Processor};
use crate::error::EffectError;

fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Feed-forward peak compressor with separate attack and release ballistics.
pub struct Compressor {
    threshold: f32,
    /// `1/ratio - 1`, the exponent applied to the over-threshold envelope.
    slope: f32,
    attack: f32,
    release: f32,
    envelope: f32,
}

impl Compressor {
    pub fn new(
        threshold_db: f32,
        ratio: f32,
        attack_ms: f32,
        release_ms: f32,
        sample_rate: f32,
    ) -> Result<Self, EffectError> {
        check_range("compressor", "threshold_db", threshold_db, -100.0..=0.0)?;
        check_range("compressor", "ratio", ratio, 1.0..=100.0)?;
        check_range("compressor", "attack_ms", attack_ms, 0.01..=1_000.0)?;
        check_range("compressor", "release_ms", release_ms, 0.01..=5_000.0)?;

        let coeff = |ms: f32| (-1.0 / (ms / 1000.0 * sample_rate)).exp();
        Ok(Self {
            threshold: db_to_linear(threshold_db),
            slope: 1.0 / ratio - 1.0,
            attack: coeff(attack_ms),
            release: coeff(release_ms),
            envelope: 0.0,
        })
    }
}

impl Processor for Compressor {
    fn process(&mut self, input: f32) -> f32 {
        let level = input.abs();
        let coeff = if level > self.envelope {
            self.attack
        } else {
            self.release
        };
        self.envelope = coeff * self.envelope + (1.0 - coeff) * level;

        if self.envelope > self.threshold {
            input * (self.envelope / self.threshold).powf(self.slope)
        } else {
            input
        }
    }
}

/// Fixed gain in decibels.
pub struct Gain {
    factor: f32,
}

impl Gain {
    pub fn new(gain_db: f32) -> Result<Self, EffectError> {
        check_range("gain", "gain_db", gain_db, -96.0..=48.0)?;
        Ok(Self {
            factor: db_to_linear(gain_db),
        })
    }
}

impl Processor for Gain {
    fn process(&mut self, input: f32) -> f32 {
        input * self.factor
    }
}
