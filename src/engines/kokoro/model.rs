use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView2};
use ort::execution_providers::CPUExecutionProvider;
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

use super::phonemizer::{phonemize, EspeakConfig};
use super::voices::VoiceStore;

/// Preferred weights file name inside the model directory.
pub const MODEL_FILE: &str = "kokoro-v1.0.onnx";

/// Voice archive file name inside the model directory.
pub const VOICES_FILE: &str = "voices-v1.0.bin";

/// Maximum number of phoneme tokens per chunk (before padding).
pub const MAX_PHONEME_LEN: usize = 510;

/// Style vector dimension for Kokoro.
pub const STYLE_DIM: usize = 256;

/// Output sample rate from the Kokoro model.
pub const SAMPLE_RATE: u32 = 24000;

/// Crossfade (in samples) used when concatenating chunk audio.
const CHUNK_CROSSFADE_SAMPLES: usize = 240; // 10ms @ 24kHz

/// Vocabulary ids of `; : , . ! ?`, the preferred chunk boundaries.
const PUNCT_IDS: [i64; 6] = [1, 2, 3, 4, 5, 6];

#[derive(thiserror::Error, Debug)]
pub enum KokoroError {
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("Required model file missing: {0}")]
    MissingAsset(PathBuf),
    #[error(
        "espeak-ng not found. Install: Linux: `sudo apt-get install espeak-ng`, \
         macOS: `brew install espeak-ng`"
    )]
    EspeakNotFound,
    #[error("Phonemization failed: {0}")]
    PhonemizerFailed(String),
    #[error("Voice '{0}' not found. Use --list-voices to see available voices.")]
    VoiceNotFound(String),
    #[error("Model not loaded. Call load_model() first.")]
    ModelNotLoaded,
    #[error("Invalid config.json: {0}")]
    Config(String),
    #[error("Failed to parse voice file: {0}")]
    VoiceParse(String),
    #[error("Model produced no output tensor")]
    NoOutput,
}

/// The files a run needs before it may start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAssets {
    pub onnx: PathBuf,
    pub voices: PathBuf,
    pub config: Option<PathBuf>,
}

impl ModelAssets {
    /// Find the weights and voice archive in `model_dir`.
    ///
    /// Prefers [`MODEL_FILE`], then the first `.onnx` file in name order.
    pub fn locate(model_dir: &Path) -> Result<Self, KokoroError> {
        let voices = model_dir.join(VOICES_FILE);
        if !voices.is_file() {
            return Err(KokoroError::MissingAsset(voices));
        }

        let preferred = model_dir.join(MODEL_FILE);
        let onnx = if preferred.is_file() {
            preferred
        } else {
            let mut candidates: Vec<PathBuf> = std::fs::read_dir(model_dir)
                .map_err(|_| KokoroError::MissingAsset(preferred.clone()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("onnx"))
                .collect();
            candidates.sort();
            let fallback = candidates
                .into_iter()
                .next()
                .ok_or(KokoroError::MissingAsset(preferred))?;
            log::warn!("{MODEL_FILE} not found, using {}", fallback.display());
            fallback
        };

        let config = Some(model_dir.join("config.json")).filter(|p| p.is_file());
        Ok(Self {
            onnx,
            voices,
            config,
        })
    }
}

/// Loaded Kokoro ONNX session plus voices and vocabulary.
pub struct KokoroModel {
    session: Session,
    voice_store: VoiceStore,
    vocab: HashMap<char, i64>,
    /// "input_ids" or "tokens", depending on the export
    tokens_input_name: String,
    /// True if the speed input expects int32, false for float32
    speed_is_int32: bool,
}

impl KokoroModel {
    pub fn load(
        assets: &ModelAssets,
        num_threads: Option<usize>,
    ) -> Result<Self, KokoroError> {
        log::info!("Loading Kokoro model from {}", assets.onnx.display());
        let session = init_session(&assets.onnx, num_threads)?;

        let tokens_input_name = detect_tokens_input(&session);
        let speed_is_int32 = detect_speed_type(&session);
        log::debug!("tokens_input='{tokens_input_name}', speed_is_int32={speed_is_int32}");

        let voice_store = VoiceStore::load(&assets.voices)?;
        let vocab = match &assets.config {
            Some(path) => super::vocab::load_vocab(path)?,
            None => super::vocab::default_vocab(),
        };

        Ok(Self {
            session,
            voice_store,
            vocab,
            tokens_input_name,
            speed_is_int32,
        })
    }

    /// Synthesize mono audio for `text`.
    pub fn synthesize_text(
        &mut self,
        text: &str,
        voice_name: &str,
        speed: f32,
        lang: &str,
        style_idx_override: Option<usize>,
        espeak: &EspeakConfig,
    ) -> Result<Vec<f32>, KokoroError> {
        let ids = phonemize(text, lang, &self.vocab, espeak)?;
        if ids.is_empty() {
            log::warn!("No phoneme tokens produced for text: {text:?}");
            return Ok(Vec::new());
        }

        // One style vector for the whole text so chunks share prosody.
        let style = self
            .voice_store
            .get_style(voice_name, style_idx_override.unwrap_or(ids.len()))?;

        let mut combined = Vec::with_capacity(ids.len() * 300);
        for chunk in split_chunks(&ids) {
            let audio = self.run_chunk(chunk, &style, speed)?;
            append_with_crossfade(&mut combined, &audio, CHUNK_CROSSFADE_SAMPLES);
        }
        Ok(combined)
    }

    fn run_chunk(
        &mut self,
        tokens: &[i64],
        style: &[f32; STYLE_DIM],
        speed: f32,
    ) -> Result<Vec<f32>, KokoroError> {
        // [[0, t1..tN, 0]]
        let mut padded = Vec::with_capacity(tokens.len() + 2);
        padded.push(0);
        padded.extend_from_slice(tokens);
        padded.push(0);
        let tokens_arr = Array2::from_shape_vec((1, padded.len()), padded)?;
        let style_view = ArrayView2::from_shape((1, STYLE_DIM), style.as_slice())?;

        let output = if self.speed_is_int32 {
            let speed_arr = ndarray::arr1(&[speed.round() as i32]);
            self.session.run(inputs![
                self.tokens_input_name.as_str() => TensorRef::from_array_view(tokens_arr.view())?,
                "style" => TensorRef::from_array_view(style_view)?,
                "speed" => TensorRef::from_array_view(speed_arr.view())?,
            ])?
        } else {
            let speed_arr = ndarray::arr1(&[speed]);
            self.session.run(inputs![
                self.tokens_input_name.as_str() => TensorRef::from_array_view(tokens_arr.view())?,
                "style" => TensorRef::from_array_view(style_view)?,
                "speed" => TensorRef::from_array_view(speed_arr.view())?,
            ])?
        };

        let (_, waveform) = output.iter().next().ok_or(KokoroError::NoOutput)?;
        let waveform = waveform.try_extract_array::<f32>()?;
        Ok(waveform.iter().copied().collect())
    }

    pub fn list_voices(&self) -> Vec<&str> {
        self.voice_store.list_voices()
    }
}

fn init_session(onnx_path: &Path, num_threads: Option<usize>) -> Result<Session, KokoroError> {
    let providers = vec![CPUExecutionProvider::default().build()];

    let mut builder = Session::builder()?
        .with_execution_providers(providers)?
        .with_optimization_level(GraphOptimizationLevel::Level3)?;

    if let Some(threads) = num_threads {
        builder = builder.with_intra_threads(threads)?;
    }

    Ok(builder.commit_from_file(onnx_path)?)
}

fn detect_tokens_input(session: &Session) -> String {
    session
        .inputs()
        .iter()
        .map(|input| input.name())
        .find(|name| *name == "input_ids" || *name == "tokens")
        .unwrap_or("input_ids")
        .to_string()
}

fn detect_speed_type(session: &Session) -> bool {
    session
        .inputs()
        .iter()
        .find(|input| input.name() == "speed")
        .map(|input| format!("{:?}", input.dtype()).to_lowercase().contains("int32"))
        // kokoro-v1.0 exports take float32 speed
        .unwrap_or(false)
}

/// Split token ids into chunks of at most `MAX_PHONEME_LEN`, cutting after
/// the last punctuation mark where possible.
fn split_chunks(ids: &[i64]) -> Vec<&[i64]> {
    let mut chunks = Vec::new();
    let mut rest = ids;

    while rest.len() > MAX_PHONEME_LEN {
        let window = &rest[..MAX_PHONEME_LEN];
        let cut = window
            .iter()
            .rposition(|id| PUNCT_IDS.contains(id))
            .map(|i| i + 1)
            .unwrap_or(MAX_PHONEME_LEN);
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }
    if !rest.is_empty() {
        chunks.push(rest);
    }
    chunks
}

fn append_with_crossfade(dst: &mut Vec<f32>, src: &[f32], crossfade_samples: usize) {
    let overlap = crossfade_samples.min(dst.len()).min(src.len());
    let start = dst.len() - overlap;
    for (i, (d, &s)) in dst[start..].iter_mut().zip(&src[..overlap]).enumerate() {
        let t = (i + 1) as f32 / (overlap as f32 + 1.0);
        *d = *d * (1.0 - t) + s * t;
    }
    dst.extend_from_slice(&src[overlap..]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_sequences_stay_whole() {
        let ids = vec![43i64; 20];
        assert_eq!(split_chunks(&ids), vec![&ids[..]]);
        assert!(split_chunks(&[]).is_empty());
    }

    #[test]
    fn long_sequences_split_after_punctuation() {
        let mut ids = vec![43i64; 700];
        ids[300] = 4; // '.'
        let chunks = split_chunks(&ids);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 301);
        assert_eq!(chunks[1].len(), 399);

        let plain = vec![43i64; 1_100];
        let lens: Vec<_> = split_chunks(&plain).iter().map(|c| c.len()).collect();
        assert_eq!(lens, [510, 510, 80]);
    }

    #[test]
    fn crossfade_blends_overlap() {
        let mut dst = vec![1.0f32; 4];
        append_with_crossfade(&mut dst, &[0.0, 0.0, 5.0], 2);
        assert_eq!(dst.len(), 5);
        assert!((dst[2] - 2.0 / 3.0).abs() < 1e-6);
        assert!((dst[3] - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(dst[4], 5.0);

        let mut empty = Vec::new();
        append_with_crossfade(&mut empty, &[0.5, 0.25], 240);
        assert_eq!(empty, vec![0.5, 0.25]);
    }

    #[test]
    fn missing_voices_archive_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MODEL_FILE), b"onnx").unwrap();
        let err = ModelAssets::locate(dir.path()).unwrap_err();
        assert!(matches!(err, KokoroError::MissingAsset(p) if p.ends_with(VOICES_FILE)));
    }

    #[test]
    fn missing_weights_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(VOICES_FILE), b"npz").unwrap();
        let err = ModelAssets::locate(dir.path()).unwrap_err();
        assert!(matches!(err, KokoroError::MissingAsset(p) if p.ends_with(MODEL_FILE)));
    }

    #[test]
    fn any_onnx_file_is_a_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(VOICES_FILE), b"npz").unwrap();
        std::fs::write(dir.path().join("kokoro-quant.onnx"), b"onnx").unwrap();
        let assets = ModelAssets::locate(dir.path()).unwrap();
        assert!(assets.onnx.ends_with("kokoro-quant.onnx"));
        assert_eq!(assets.config, None);
    }
}
