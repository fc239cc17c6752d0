use std::path::PathBuf;

/// Fatal errors raised while building the work list.
#[derive(thiserror::Error, Debug)]
pub enum CorpusError {
    #[error("Workout directory not found at {0}")]
    MissingWorkoutDir(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error("Expected 1-D or 2-D samples, got {0} dimensions")]
    Dimensions(usize),
    #[error("Synthesis produced no audio")]
    Empty,
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

#[derive(thiserror::Error, Debug)]
pub enum EffectError {
    #[error("Sample rate must be positive")]
    ZeroSampleRate,
    #[error("{effect}: invalid parameter: {reason}")]
    InvalidParameter {
        effect: &'static str,
        reason: String,
    },
    #[error("{0} produced non-finite samples")]
    NonFinite(&'static str),
}

#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),
    #[error("Transcoder `{0}` not found on PATH")]
    TranscoderNotFound(String),
    #[error("Transcoder exited with code {code:?}: {stderr}")]
    TranscoderFailed { code: Option<i32>, stderr: String },
    #[error("Destination {0} has no file name")]
    InvalidDestination(PathBuf),
}

impl OutputError {
    /// Whether retrying the transcode could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, OutputError::TranscoderFailed { .. } | OutputError::Io(_))
    }
}

/// Fatal errors raised by the orchestrator itself, before any item runs.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
