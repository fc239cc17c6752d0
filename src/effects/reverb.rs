//! Schroeder/Moorer room reverb (Freeverb topology).

use super::{check_range, Processor};
use crate::error::EffectError;

/// Comb lengths in samples at 44.1 kHz.
const COMB_TUNINGS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
/// All-pass lengths in samples at 44.1 kHz.
const ALLPASS_TUNINGS: [usize; 4] = [556, 441, 341, 225];
/// Extra samples added per channel so channels decorrelate.
const STEREO_SPREAD: usize = 23;

const INPUT_GAIN: f32 = 0.015;
const ROOM_SCALE: f32 = 0.28;
const ROOM_OFFSET: f32 = 0.7;
const DAMP_SCALE: f32 = 0.4;
const WET_SCALE: f32 = 3.0;
const DRY_SCALE: f32 = 2.0;

struct Comb {
    buf: Vec<f32>,
    idx: usize,
    store: f32,
}

impl Comb {
    fn new(len: usize) -> Self {
        Self {
            buf: vec![0.0; len.max(1)],
            idx: 0,
            store: 0.0,
        }
    }

    fn process(&mut self, input: f32, feedback: f32, damp: f32) -> f32 {
        let out = self.buf[self.idx];
        self.store = out * (1.0 - damp) + self.store * damp;
        self.buf[self.idx] = input + self.store * feedback;
        self.idx = (self.idx + 1) % self.buf.len();
        out
    }
}

struct AllPass {
    buf: Vec<f32>,
    idx: usize,
}

impl AllPass {
    fn new(len: usize) -> Self {
        Self {
            buf: vec![0.0; len.max(1)],
            idx: 0,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buf[self.idx];
        self.buf[self.idx] = input + delayed * 0.5;
        self.idx = (self.idx + 1) % self.buf.len();
        delayed - input
    }
}

pub struct Reverb {
    combs: Vec<Comb>,
    allpasses: Vec<AllPass>,
    feedback: f32,
    damp: f32,
    wet: f32,
    dry: f32,
}

impl Reverb {
    pub fn new(
        room_size: f32,
        damping: f32,
        wet_level: f32,
        dry_level: f32,
        sample_rate: f32,
        channel: usize,
    ) -> Result<Self, EffectError> {
        check_range("reverb", "room_size", room_size, 0.0..=1.0)?;
        check_range("reverb", "damping", damping, 0.0..=1.0)?;
        check_range("reverb", "wet_level", wet_level, 0.0..=1.0)?;
        check_range("reverb", "dry_level", dry_level, 0.0..=1.0)?;

        let scale = sample_rate / 44_100.0;
        let spread = if channel % 2 == 1 { STEREO_SPREAD } else { 0 };
        let tuned = |len: usize| ((len + spread) as f32 * scale).round() as usize;

        Ok(Self {
            combs: COMB_TUNINGS.iter().map(|&l| Comb::new(tuned(l))).collect(),
            allpasses: ALLPASS_TUNINGS.iter().map(|&l| AllPass::new(tuned(l))).collect(),
            feedback: room_size * ROOM_SCALE + ROOM_OFFSET,
            damp: damping * DAMP_SCALE,
            wet: wet_level * WET_SCALE,
            dry: dry_level * DRY_SCALE,
        })
    }
}

impl Processor for Reverb {
    fn process(&mut self, input: f32) -> f32 {
        let x = input * INPUT_GAIN;
        let mut out = 0.0;
        for comb in &mut self.combs {
            out += comb.process(x, self.feedback, self.damp);
        }
        for allpass in &mut self.allpasses {
            out = allpass.process(out);
        }
        out * self.wet + input * self.dry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::test_signals::{impulse, rms};
    use crate::effects::EffectSpec;

    #[test]
    fn impulse_leaves_a_decaying_tail() {
        let mut buffer = impulse(24_000, 24_000);
        EffectSpec::Reverb {
            room_size: 0.5,
            damping: 0.5,
            wet_level: 0.3,
            dry_level: 0.7,
        }
        .apply(&mut buffer)
        .unwrap();

        let out = buffer.samples.row(0).to_vec();
        assert!((out[0] - 1.4).abs() < 1e-6);
        let early = rms(&out[1_000..6_000]);
        let late = rms(&out[18_000..23_000]);
        assert!(early > 0.0);
        assert!(late < early, "tail should decay: {early} -> {late}");
    }

    #[test]
    fn dry_only_scales_input() {
        let mut reverb = Reverb::new(0.5, 0.5, 0.0, 0.5, 24_000.0, 0).unwrap();
        for x in [0.25f32, -0.5, 0.1] {
            assert_eq!(reverb.process(x), x);
        }
    }
}
