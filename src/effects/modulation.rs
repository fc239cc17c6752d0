//! LFO-driven effects: phaser and chorus.

use std::f32::consts::TAU;

use super::delay::DelayLine;
use super::{check_range, Processor};
use crate::error::EffectError;

/// All-pass stages in the phaser network.
const PHASER_STAGES: usize = 6;

/// Sine LFO in `[-1, 1]`.
struct Lfo {
    phase: f32,
    increment: f32,
}

impl Lfo {
    fn new(rate_hz: f32, sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            increment: rate_hz / sample_rate,
        }
    }

    fn next(&mut self) -> f32 {
        let value = (TAU * self.phase).sin();
        self.phase = (self.phase + self.increment).fract();
        value
    }
}

/// First-order all-pass section.
#[derive(Default, Clone, Copy)]
struct AllPass {
    x1: f32,
    y1: f32,
}

impl AllPass {
    fn process(&mut self, x: f32, a: f32) -> f32 {
        let y = a * x + self.x1 - a * self.y1;
        self.x1 = x;
        self.y1 = y;
        y
    }
}

/// Sweeping all-pass network with feedback, mixed with the dry signal.
///
/// The LFO moves the all-pass break frequency up to two octaves either side of
/// `centre_frequency_hz` at full depth.
pub struct Phaser {
    lfo: Lfo,
    stages: [AllPass; PHASER_STAGES],
    depth: f32,
    centre: f32,
    feedback: f32,
    mix: f32,
    sample_rate: f32,
    last: f32,
}

impl Phaser {
    pub fn new(
        rate_hz: f32,
        depth: f32,
        centre_frequency_hz: f32,
        feedback: f32,
        mix: f32,
        sample_rate: f32,
    ) -> Result<Self, EffectError> {
        check_range("phaser", "rate_hz", rate_hz, 0.0..=100.0)?;
        check_range("phaser", "depth", depth, 0.0..=1.0)?;
        check_range("phaser", "centre_frequency_hz", centre_frequency_hz, 20.0..=sample_rate * 0.45)?;
        check_range("phaser", "feedback", feedback, -0.99..=0.99)?;
        check_range("phaser", "mix", mix, 0.0..=1.0)?;

        Ok(Self {
            lfo: Lfo::new(rate_hz, sample_rate),
            stages: [AllPass::default(); PHASER_STAGES],
            depth,
            centre: centre_frequency_hz,
            feedback,
            mix,
            sample_rate,
            last: 0.0,
        })
    }
}

impl Processor for Phaser {
    fn process(&mut self, input: f32) -> f32 {
        let cutoff = (self.centre * 2f32.powf(2.0 * self.depth * self.lfo.next()))
            .clamp(20.0, self.sample_rate * 0.45);
        let t = (std::f32::consts::PI * cutoff / self.sample_rate).tan();
        let a = (t - 1.0) / (t + 1.0);

        let mut wet = input + self.feedback * self.last;
        for stage in &mut self.stages {
            wet = stage.process(wet, a);
        }
        self.last = wet;

        (1.0 - self.mix) * input + self.mix * wet
    }
}

/// Short modulated delay mixed with the dry signal.
pub struct Chorus {
    lfo: Lfo,
    line: DelayLine,
    centre: f32,
    depth: f32,
    feedback: f32,
    mix: f32,
}

impl Chorus {
    pub fn new(
        rate_hz: f32,
        depth: f32,
        centre_delay_ms: f32,
        feedback: f32,
        mix: f32,
        sample_rate: f32,
    ) -> Result<Self, EffectError> {
        check_range("chorus", "rate_hz", rate_hz, 0.0..=100.0)?;
        check_range("chorus", "depth", depth, 0.0..=1.0)?;
        check_range("chorus", "centre_delay_ms", centre_delay_ms, 0.1..=100.0)?;
        check_range("chorus", "feedback", feedback, -0.99..=0.99)?;
        check_range("chorus", "mix", mix, 0.0..=1.0)?;

        let centre = centre_delay_ms / 1000.0 * sample_rate;
        let max_delay = (centre * (1.0 + depth)).ceil() as usize + 1;
        Ok(Self {
            lfo: Lfo::new(rate_hz, sample_rate),
            line: DelayLine::new(max_delay),
            centre,
            depth,
            feedback,
            mix,
        })
    }
}

impl Processor for Chorus {
    fn process(&mut self, input: f32) -> f32 {
        let delay = self.centre * (1.0 + self.depth * self.lfo.next());
        let wet = self.line.read(delay);
        self.line.push(input + self.feedback * wet);
        (1.0 - self.mix) * input + self.mix * wet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::test_signals::{impulse, rms, sine};
    use crate::effects::EffectSpec;

    #[test]
    fn dry_phaser_is_identity() {
        let mut phaser = Phaser::new(2.0, 0.4, 1300.0, 0.3, 0.0, 24_000.0).unwrap();
        for x in [0.5f32, -0.25, 0.0, 1.0] {
            assert_eq!(phaser.process(x), x);
        }
    }

    #[test]
    fn phaser_keeps_level_and_changes_signal() {
        let original = sine(1_300.0, 0.5, 24_000, 1.0);
        let mut buffer = original.clone();
        EffectSpec::Phaser {
            rate_hz: 2.0,
            depth: 0.4,
            centre_frequency_hz: 1300.0,
            feedback: 0.3,
            mix: 0.4,
        }
        .apply(&mut buffer)
        .unwrap();

        assert_ne!(buffer, original);
        assert!(buffer.peak() < 1.0);
        assert!(rms(&buffer.samples.row(0).to_vec()) > 0.05);
    }

    #[test]
    fn chorus_echoes_impulse_near_centre_delay() {
        let mut chorus = Chorus::new(5.0, 0.1, 5.0, 0.0, 0.3, 8_000.0).unwrap();
        let mut buffer = impulse(8_000, 200);
        for s in buffer.samples.iter_mut() {
            *s = chorus.process(*s);
        }
        let out = buffer.samples.row(0).to_vec();
        assert_eq!(out[0], 0.7);

        // 5 ms at 8 kHz = 40 samples, modulated by at most 10%
        let echo: f32 = out[30..=50].iter().sum();
        assert!((echo - 0.3).abs() < 0.01, "echo energy {echo}");
        assert!(out[51..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn rejects_out_of_range_mix() {
        assert!(Chorus::new(5.0, 0.1, 5.0, 0.0, 1.5, 8_000.0).is_err());
        assert!(Phaser::new(2.0, 0.4, 1300.0, 1.0, 0.4, 8_000.0).is_err());
    }
}
