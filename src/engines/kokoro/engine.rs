use std::path::Path;

use crate::{SynthesisEngine, SynthesisResult, VoiceParams};

use super::model::{KokoroError, KokoroModel, ModelAssets, SAMPLE_RATE};
use super::phonemizer::{voice_lang, EspeakConfig};

/// Parameters for configuring Kokoro model loading.
#[derive(Debug, Clone, Default)]
pub struct KokoroModelParams {
    /// Number of CPU threads to use for inference.
    /// `None` uses the ORT default (typically all available cores).
    pub num_threads: Option<usize>,
}

/// Kokoro text-to-speech engine.
///
/// Loaded once per run and then lent to the pipeline; the ONNX session is
/// never rebuilt between items.
pub struct KokoroEngine {
    model: Option<KokoroModel>,
    espeak: EspeakConfig,
}

impl Default for KokoroEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl KokoroEngine {
    /// Create a new engine that uses `espeak-ng` from PATH.
    pub fn new() -> Self {
        Self::with_espeak(EspeakConfig::default())
    }

    /// Create a new engine with an explicit espeak-ng binary and data path.
    pub fn with_espeak(espeak: EspeakConfig) -> Self {
        Self {
            model: None,
            espeak,
        }
    }

    /// List all available voice names (requires model to be loaded).
    pub fn list_voices(&self) -> Vec<&str> {
        self.model
            .as_ref()
            .map(|m| m.list_voices())
            .unwrap_or_default()
    }

    /// Fail early if `voice` is not in the loaded voice archive.
    pub fn ensure_voice(&self, voice: &str) -> Result<(), KokoroError> {
        let model = self.model.as_ref().ok_or(KokoroError::ModelNotLoaded)?;
        if model.list_voices().contains(&voice) {
            Ok(())
        } else {
            Err(KokoroError::VoiceNotFound(voice.to_string()))
        }
    }
}

impl SynthesisEngine for KokoroEngine {
    type ModelParams = KokoroModelParams;

    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let assets = ModelAssets::locate(model_path)?;
        let model = KokoroModel::load(&assets, params.num_threads)?;
        self.model = Some(model);
        Ok(())
    }

    fn unload_model(&mut self) {
        self.model = None;
    }

    fn synthesize(
        &mut self,
        text: &str,
        params: &VoiceParams,
    ) -> Result<SynthesisResult, Box<dyn std::error::Error>> {
        let model = self.model.as_mut().ok_or(KokoroError::ModelNotLoaded)?;

        let lang = params
            .lang
            .as_deref()
            .unwrap_or_else(|| voice_lang(&params.voice));
        let samples = model.synthesize_text(
            text,
            &params.voice,
            params.speed,
            lang,
            params.style_index,
            &self.espeak,
        )?;

        Ok(SynthesisResult::mono(samples, SAMPLE_RATE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unloaded_engine_has_no_voices() {
        let mut engine = KokoroEngine::new();
        assert!(engine.list_voices().is_empty());
        assert!(matches!(
            engine.ensure_voice("af_heart"),
            Err(KokoroError::ModelNotLoaded)
        ));
        assert!(engine.synthesize("Plank.", &VoiceParams::default()).is_err());
    }

    #[test]
    fn missing_model_dir_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = KokoroEngine::new();
        let params = KokoroModelParams { num_threads: Some(1) };
        assert!(engine.load_model_with_params(dir.path(), params).is_err());
        assert!(engine.list_voices().is_empty());
    }
}
