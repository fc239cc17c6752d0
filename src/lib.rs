//! # workout-voices
//!
//! Batch generator for the spoken assets of a workout application: activity
//! names, coaching sentences and the numbers 0 to 50, all rendered in the same
//! robotic voice.
//!
//! ## Pipeline
//!
//! 1. [`corpus`] turns workout definitions and the sentence list into
//!    [`corpus::SpeakableItem`]s with deterministic destination paths.
//! 2. A [`SynthesisEngine`] (Kokoro, behind the `kokoro` feature) speaks the text.
//! 3. [`audio`] reshapes the raw output into a channel-major buffer and pads
//!    trailing silence.
//! 4. [`effects`] runs a named, frozen effect preset over the buffer.
//! 5. [`output`] writes an intermediate WAV and transcodes it to AAC with ffmpeg.
//!
//! [`pipeline::Pipeline`] drives the stages per item, skipping items whose
//! final file already exists and containing failures to the item that raised them.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use workout_voices::{engines::kokoro::KokoroEngine, SynthesisEngine};
//! use workout_voices::{config::PipelineConfigBuilder, corpus, output::FfmpegTranscoder, pipeline::Pipeline};
//!
//! let mut engine = KokoroEngine::new();
//! engine.load_model(&PathBuf::from("."))?;
//!
//! let config = PipelineConfigBuilder::default()
//!     .output_dir(PathBuf::from("static/audio/voice/heart"))
//!     .build()?;
//! let items = corpus::extract(&corpus::CorpusSources::new("src/lib/data"), &config)?;
//! let transcoder = FfmpegTranscoder::default();
//! let summary = Pipeline::new(&mut engine, &transcoder, &config).run(&items)?;
//! println!("{summary}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audio;
pub mod config;
pub mod corpus;
pub mod effects;
pub mod engines;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod synthesis;

use std::path::Path;

use ndarray::{Array1, ArrayD};

/// The result of a synthesis (text-to-speech) operation.
///
/// `samples` is whatever shape the engine produced: a 1-D mono signal or a
/// 2-D array in either orientation. [`audio::normalize`] turns it into a
/// channel-major [`audio::AudioBuffer`].
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    /// Raw audio samples as f32 values
    pub samples: ArrayD<f32>,
    /// Sample rate of the audio (24000 for Kokoro)
    pub sample_rate: u32,
}

impl SynthesisResult {
    /// Wrap a mono signal.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: Array1::from_vec(samples).into_dyn(),
            sample_rate,
        }
    }

    /// Number of frames, taking the longer axis of a 2-D result as time.
    pub fn frames(&self) -> usize {
        self.samples.shape().iter().copied().max().unwrap_or(0)
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// Voice selection for one synthesis call.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceParams {
    /// Voice name (e.g. `"af_heart"`, `"bf_emma"`).
    pub voice: String,
    /// Speech speed multiplier. Range: 0.5–2.0.
    pub speed: f32,
    /// espeak-ng language tag. `None` infers it from the voice prefix.
    pub lang: Option<String>,
    /// Override the style vector index. `None` = auto (uses phoneme token count).
    pub style_index: Option<usize>,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            voice: "af_heart".to_string(),
            speed: 0.8,
            lang: Some("en-us".to_string()),
            style_index: None,
        }
    }
}

impl VoiceParams {
    /// The voice name without its two-letter language prefix (`af_heart` -> `heart`).
    ///
    /// Used as the per-voice output directory name.
    pub fn short_name(&self) -> &str {
        match self.voice.split_once('_') {
            Some((prefix, name)) if prefix.len() == 2 && !name.is_empty() => name,
            _ => &self.voice,
        }
    }
}

/// Common interface for text-to-speech synthesis engines.
///
/// The pipeline borrows an engine mutably for the whole run; it is loaded once
/// up front and never reloaded between items.
pub trait SynthesisEngine {
    /// Parameters for configuring model loading (threads, etc.)
    type ModelParams: Default;

    /// Load a model from the specified path using default parameters.
    fn load_model(&mut self, model_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        self.load_model_with_params(model_path, Self::ModelParams::default())
    }

    /// Load a model from the specified path with custom parameters.
    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Unload the currently loaded model and free associated resources.
    fn unload_model(&mut self);

    /// Synthesize speech from the given text.
    fn synthesize(
        &mut self,
        text: &str,
        params: &VoiceParams,
    ) -> Result<SynthesisResult, Box<dyn std::error::Error>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_strips_language_prefix() {
        let params = VoiceParams::default();
        assert_eq!(params.short_name(), "heart");

        let custom = VoiceParams {
            voice: "robot".to_string(),
            ..Default::default()
        };
        assert_eq!(custom.short_name(), "robot");
    }

    #[test]
    fn duration_uses_longest_axis() {
        let result = SynthesisResult::mono(vec![0.0; 12_000], 24_000);
        assert_eq!(result.frames(), 12_000);
        assert!((result.duration_secs() - 0.5).abs() < 1e-9);
    }
}
