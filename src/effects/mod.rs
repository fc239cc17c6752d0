//! The voice-signature effect chain.
//!
//! A chain is an [`EffectPreset`]: a named, versioned, ordered list of
//! [`EffectSpec`] descriptors. Stage order matters; each stage consumes the
//! previous stage's output. Every stage is rebuilt per channel per call, so
//! nothing carries over between items.

mod bitcrush;
mod delay;
mod dynamics;
mod filter;
mod modulation;
mod pitch;
mod reverb;

use serde::{Deserialize, Serialize};

use crate::audio::AudioBuffer;
use crate::error::EffectError;

pub use bitcrush::Bitcrush;
pub use dynamics::{Compressor, Gain};
pub use filter::Biquad;
pub use modulation::{Chorus, Phaser};
pub use pitch::PitchShifter;
pub use reverb::Reverb;

/// A sample-by-sample audio processor for one channel.
pub trait Processor {
    fn process(&mut self, input: f32) -> f32;
}

/// One stage of a chain: the effect kind and its fixed parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectSpec {
    HighPass {
        cutoff_hz: f32,
    },
    PitchShift {
        semitones: f32,
    },
    Bitcrush {
        bit_depth: u32,
    },
    Phaser {
        rate_hz: f32,
        depth: f32,
        centre_frequency_hz: f32,
        feedback: f32,
        mix: f32,
    },
    Chorus {
        rate_hz: f32,
        depth: f32,
        centre_delay_ms: f32,
        feedback: f32,
        mix: f32,
    },
    Reverb {
        room_size: f32,
        damping: f32,
        wet_level: f32,
        dry_level: f32,
    },
    Compressor {
        threshold_db: f32,
        ratio: f32,
        attack_ms: f32,
        release_ms: f32,
    },
    Gain {
        gain_db: f32,
    },
}

impl EffectSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            EffectSpec::HighPass { .. } => "high_pass",
            EffectSpec::PitchShift { .. } => "pitch_shift",
            EffectSpec::Bitcrush { .. } => "bitcrush",
            EffectSpec::Phaser { .. } => "phaser",
            EffectSpec::Chorus { .. } => "chorus",
            EffectSpec::Reverb { .. } => "reverb",
            EffectSpec::Compressor { .. } => "compressor",
            EffectSpec::Gain { .. } => "gain",
        }
    }

    /// Build a fresh processor for `channel` at `sample_rate`, validating parameters.
    pub fn processor(
        &self,
        sample_rate: u32,
        channel: usize,
    ) -> Result<Box<dyn Processor>, EffectError> {
        if sample_rate == 0 {
            return Err(EffectError::ZeroSampleRate);
        }
        let fs = sample_rate as f32;
        let processor: Box<dyn Processor> = match *self {
            EffectSpec::HighPass { cutoff_hz } => Box::new(Biquad::high_pass(cutoff_hz, fs)?),
            EffectSpec::PitchShift { semitones } => Box::new(PitchShifter::new(semitones, fs)?),
            EffectSpec::Bitcrush { bit_depth } => Box::new(Bitcrush::new(bit_depth)?),
            EffectSpec::Phaser {
                rate_hz,
                depth,
                centre_frequency_hz,
                feedback,
                mix,
            } => Box::new(Phaser::new(
                rate_hz,
                depth,
                centre_frequency_hz,
                feedback,
                mix,
                fs,
            )?),
            EffectSpec::Chorus {
                rate_hz,
                depth,
                centre_delay_ms,
                feedback,
                mix,
            } => Box::new(Chorus::new(
                rate_hz,
                depth,
                centre_delay_ms,
                feedback,
                mix,
                fs,
            )?),
            EffectSpec::Reverb {
                room_size,
                damping,
                wet_level,
                dry_level,
            } => Box::new(Reverb::new(
                room_size, damping, wet_level, dry_level, fs, channel,
            )?),
            EffectSpec::Compressor {
                threshold_db,
                ratio,
                attack_ms,
                release_ms,
            } => Box::new(Compressor::new(
                threshold_db,
                ratio,
                attack_ms,
                release_ms,
                fs,
            )?),
            EffectSpec::Gain { gain_db } => Box::new(Gain::new(gain_db)?),
        };
        Ok(processor)
    }

    /// Run this stage over every channel of `buffer` in place.
    pub fn apply(&self, buffer: &mut AudioBuffer) -> Result<(), EffectError> {
        let sample_rate = buffer.sample_rate;
        let processors = (0..buffer.channels())
            .map(|ch| self.processor(sample_rate, ch))
            .collect::<Result<Vec<_>, _>>()?;

        for (mut row, mut processor) in buffer.samples.rows_mut().into_iter().zip(processors) {
            row.map_inplace(|s| *s = processor.process(*s));
        }

        if buffer.samples.iter().any(|s| !s.is_finite()) {
            return Err(EffectError::NonFinite(self.kind()));
        }
        Ok(())
    }
}

/// A frozen, named effect chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectPreset {
    pub name: String,
    pub version: u32,
    pub stages: Vec<EffectSpec>,
}

impl EffectPreset {
    /// Names accepted by [`EffectPreset::by_name`].
    pub const NAMES: [&'static str; 2] = ["robotic", "robotic-lite"];

    /// The full "sci-fi AI" voice: clean, detune, crush, sweep, widen,
    /// add space, then glue and trim the level.
    pub fn robotic() -> Self {
        Self {
            name: "robotic".to_string(),
            version: 1,
            stages: vec![
                EffectSpec::HighPass { cutoff_hz: 100.0 },
                EffectSpec::PitchShift { semitones: -1.5 },
                EffectSpec::Bitcrush { bit_depth: 8 },
                Self::phaser(),
                Self::chorus(),
                Self::reverb(),
                EffectSpec::Compressor {
                    threshold_db: -15.0,
                    ratio: 4.0,
                    attack_ms: 1.0,
                    release_ms: 100.0,
                },
                EffectSpec::Gain { gain_db: 3.0 },
            ],
        }
    }

    /// Phaser, chorus and reverb only.
    pub fn robotic_lite() -> Self {
        Self {
            name: "robotic-lite".to_string(),
            version: 1,
            stages: vec![Self::phaser(), Self::chorus(), Self::reverb()],
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "robotic" => Some(Self::robotic()),
            "robotic-lite" => Some(Self::robotic_lite()),
            _ => None,
        }
    }

    fn phaser() -> EffectSpec {
        EffectSpec::Phaser {
            rate_hz: 2.0,
            depth: 0.4,
            centre_frequency_hz: 1300.0,
            feedback: 0.3,
            mix: 0.4,
        }
    }

    fn chorus() -> EffectSpec {
        EffectSpec::Chorus {
            rate_hz: 5.0,
            depth: 0.1,
            centre_delay_ms: 5.0,
            feedback: 0.0,
            mix: 0.3,
        }
    }

    fn reverb() -> EffectSpec {
        EffectSpec::Reverb {
            room_size: 0.5,
            damping: 0.5,
            wet_level: 0.3,
            dry_level: 0.7,
        }
    }

    /// Run every stage in order over `buffer`.
    pub fn apply(&self, buffer: &mut AudioBuffer) -> Result<(), EffectError> {
        for stage in &self.stages {
            log::trace!("Applying {} to {} frames", stage.kind(), buffer.frames());
            stage.apply(buffer)?;
        }
        Ok(())
    }
}

fn check_range(
    effect: &'static str,
    name: &str,
    value: f32,
    range: std::ops::RangeInclusive<f32>,
) -> Result<(), EffectError> {
    if value.is_finite() && range.contains(&value) {
        Ok(())
    } else {
        Err(EffectError::InvalidParameter {
            effect,
            reason: format!(
                "{name} = {value} outside {}..={}",
                range.start(),
                range.end()
            ),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_signals::sine;
    use super::*;

    #[test]
    fn robotic_stages_run_in_fixed_order() {
        let kinds: Vec<_> = EffectPreset::robotic()
            .stages
            .iter()
            .map(EffectSpec::kind)
            .collect();
        assert_eq!(
            kinds,
            [
                "high_pass",
                "pitch_shift",
                "bitcrush",
                "phaser",
                "chorus",
                "reverb",
                "compressor",
                "gain"
            ]
        );
    }

    #[test]
    fn lite_preset_is_modulation_and_space_only() {
        let lite = EffectPreset::robotic_lite();
        let full = EffectPreset::robotic();
        assert_eq!(lite.stages, full.stages[3..6].to_vec());
        for name in EffectPreset::NAMES {
            assert_eq!(EffectPreset::by_name(name).unwrap().name, name);
        }
        assert!(EffectPreset::by_name("loud").is_none());
    }

    #[test]
    fn chain_is_deterministic_and_keeps_shape() {
        let preset = EffectPreset::robotic();
        let mut a = sine(220.0, 0.5, 24_000, 0.5);
        let mut b = a.clone();
        preset.apply(&mut a).unwrap();
        preset.apply(&mut b).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.frames(), 12_000);
        assert!(a.peak() > 0.0);
    }

    #[test]
    fn stereo_channels_are_processed_independently() {
        let mono = sine(330.0, 0.4, 16_000, 0.25);
        let mut stereo = AudioBuffer::new(
            ndarray::concatenate![ndarray::Axis(0), mono.samples, mono.samples],
            16_000,
        );
        EffectPreset::robotic_lite().apply(&mut stereo).unwrap();
        assert_eq!(stereo.channels(), 2);
        // The reverb spreads its tunings per channel.
        assert_ne!(stereo.samples.row(0), stereo.samples.row(1));
    }

    #[test]
    fn zero_sample_rate_is_rejected() {
        let mut buffer = sine(100.0, 0.5, 8_000, 0.1);
        buffer.sample_rate = 0;
        assert!(matches!(
            EffectPreset::robotic().apply(&mut buffer),
            Err(EffectError::ZeroSampleRate)
        ));
    }

    #[test]
    fn cutoff_above_nyquist_is_rejected() {
        let mut buffer = sine(10.0, 0.5, 150, 1.0);
        let err = EffectSpec::HighPass { cutoff_hz: 100.0 }
            .apply(&mut buffer)
            .unwrap_err();
        assert!(matches!(err, EffectError::InvalidParameter { effect: "high_pass", .. }));
    }

    #[test]
    fn non_finite_output_is_an_error() {
        let mut buffer = sine(100.0, 0.5, 8_000, 0.1);
        buffer.samples[[0, 10]] = f32::NAN;
        assert!(matches!(
            EffectSpec::Gain { gain_db: 0.0 }.apply(&mut buffer),
            Err(EffectError::NonFinite("gain"))
        ));
    }

    #[test]
    fn presets_serialize_as_kind_tagged_stages() {
        let json = serde_json::to_value(EffectPreset::robotic_lite()).unwrap();
        assert_eq!(json["stages"][0]["kind"], "phaser");
        assert_eq!(json["stages"][2]["wet_level"], 0.3f32 as f64);
        let back: EffectPreset = serde_json::from_value(json).unwrap();
        assert_eq!(back, EffectPreset::robotic_lite());
    }
}
