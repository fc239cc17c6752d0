//! Run configuration shared by the extractor and the orchestrator.

use std::path::{Path, PathBuf};

use derive_builder::Builder;

use crate::effects::EffectPreset;
use crate::VoiceParams;

/// Trailing silence appended to every item, in seconds.
pub const DEFAULT_SILENCE_SECS: f32 = 0.5;

/// Extension of the final, compressed container.
pub const DEFAULT_EXTENSION: &str = "m4a";

/// Settings for one generation run.
///
/// Built once at startup and shared read-only by every item:
///
/// ```
/// use workout_voices::config::PipelineConfigBuilder;
///
/// let config = PipelineConfigBuilder::default()
///     .output_dir("static/audio/voice/heart")
///     .build()
///     .unwrap();
/// assert_eq!(config.extension, "m4a");
/// assert_eq!(config.preset.name, "robotic");
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct PipelineConfig {
    /// Directory the voice assets are written to (one per voice identity).
    pub output_dir: PathBuf,
    /// Final container extension, without the dot.
    #[builder(default = "DEFAULT_EXTENSION.to_string()")]
    pub extension: String,
    /// Voice, speed and language handed to the synthesis engine.
    #[builder(default)]
    pub voice: VoiceParams,
    #[builder(default = "DEFAULT_SILENCE_SECS")]
    pub silence_secs: f32,
    /// Frozen effect chain applied to every item.
    #[builder(default = "EffectPreset::robotic()")]
    pub preset: EffectPreset,
    /// List the work items without synthesizing anything.
    #[builder(default)]
    pub dry_run: bool,
}

impl PipelineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ext) = &self.extension {
            if ext.is_empty() || ext.starts_with('.') {
                return Err(format!("extension must be non-empty and without a dot, got {ext:?}"));
            }
            if ext.eq_ignore_ascii_case("wav") {
                return Err("extension must differ from the intermediate wav container".to_string());
            }
        }
        if let Some(secs) = self.silence_secs {
            if !secs.is_finite() || secs < 0.0 {
                return Err(format!("silence_secs must be a non-negative number, got {secs}"));
            }
        }
        if let Some(voice) = &self.voice {
            if !(0.5..=2.0).contains(&voice.speed) {
                return Err(format!("speed must be within 0.5..=2.0, got {}", voice.speed));
            }
        }
        Ok(())
    }
}

impl PipelineConfig {
    /// Final destination for an asset whose normalized name is `file_stem`.
    pub fn destination(&self, file_stem: &str) -> PathBuf {
        self.output_dir.join(format!("{file_stem}.{}", self.extension))
    }

    /// Output directory of the original project layout:
    /// `<root>/static/audio/voice/<voice short name>`.
    pub fn default_output_dir(project_root: &Path, voice: &VoiceParams) -> PathBuf {
        project_root
            .join("static")
            .join("audio")
            .join("voice")
            .join(voice.short_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_appends_extension() {
        let config = PipelineConfigBuilder::default()
            .output_dir("out")
            .build()
            .unwrap();
        assert_eq!(config.destination("jumping-jacks"), PathBuf::from("out/jumping-jacks.m4a"));
        assert_eq!(config.silence_secs, DEFAULT_SILENCE_SECS);
        assert!(!config.dry_run);
    }

    #[test]
    fn rejects_dotted_or_wav_extension() {
        assert!(PipelineConfigBuilder::default()
            .output_dir("out")
            .extension(".m4a")
            .build()
            .is_err());
        assert!(PipelineConfigBuilder::default()
            .output_dir("out")
            .extension("WAV")
            .build()
            .is_err());
    }

    #[test]
    fn rejects_negative_silence() {
        let err = PipelineConfigBuilder::default()
            .output_dir("out")
            .silence_secs(-1.0f32)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("silence_secs"));
    }

    #[test]
    fn output_dir_uses_voice_short_name() {
        let dir = PipelineConfig::default_output_dir(Path::new("/proj"), &VoiceParams::default());
        assert_eq!(dir, PathBuf::from("/proj/static/audio/voice/heart"));
    }

    #[test]
    fn missing_output_dir_fails() {
        assert!(PipelineConfigBuilder::default().build().is_err());
    }
}
