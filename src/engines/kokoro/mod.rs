//! Kokoro-82M text-to-speech engine.
//!
//! Runs the Kokoro ONNX graph through ONNX Runtime and phonemizes with the
//! `espeak-ng` binary.
//!
//! # Required files
//!
//! Both must sit in the model directory before a run starts; a missing file
//! aborts the run before any item is processed.
//!
//! ```text
//! <model dir>/
//! ├── kokoro-v1.0.onnx   # model weights (any other *.onnx is used as a fallback)
//! ├── voices-v1.0.bin    # voice style vectors (.npz archive)
//! └── config.json        # optional vocabulary override
//! ```
//!
//! Download links:
//! - <https://github.com/thewh1teagle/kokoro-onnx/releases/tag/model-files-v1.0>
//!
//! # Voices
//!
//! Voice names are `{language prefix}_{name}`, e.g. `af_heart` (American
//! English, female). The prefix picks the espeak-ng language unless a
//! language tag is passed explicitly in [`crate::VoiceParams::lang`].
//!
//! ```rust,no_run
//! use std::path::Path;
//! use workout_voices::{engines::kokoro::KokoroEngine, SynthesisEngine, VoiceParams};
//!
//! let mut engine = KokoroEngine::new();
//! engine.load_model(Path::new("."))?;
//! let result = engine.synthesize("Jumping jacks.", &VoiceParams::default())?;
//! println!("{:.2}s at {} Hz", result.duration_secs(), result.sample_rate);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod engine;
pub mod model;
pub mod phonemizer;
pub mod vocab;
pub mod voices;

pub use engine::{KokoroEngine, KokoroModelParams};
pub use model::{KokoroError, ModelAssets};
pub use phonemizer::EspeakConfig;
