//! Writing finished audio: intermediate WAV, then ffmpeg to AAC.
//!
//! The final file only ever appears by rename after a successful encode, so
//! its existence means the asset is complete. When the encode fails the
//! intermediate WAV stays next to the destination for inspection.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::audio::AudioBuffer;
use crate::error::OutputError;

/// Converts a lossless intermediate file into the final container.
pub trait Transcoder {
    fn transcode(&self, input: &Path, output: &Path) -> Result<(), OutputError>;
}

/// Invokes the `ffmpeg` binary: AAC at a fixed bitrate with the `moov` atom
/// moved to the front for progressive playback.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    pub program: PathBuf,
    pub bitrate_kbps: u32,
    /// Extra attempts after the first failure.
    pub retries: u32,
    /// Delay before the first retry; doubled for each subsequent one.
    pub retry_delay: Duration,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            bitrate_kbps: 128,
            retries: 2,
            retry_delay: Duration::from_millis(250),
        }
    }
}

impl FfmpegTranscoder {
    pub fn args(&self, input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            input.to_string_lossy().into_owned(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            format!("{}k", self.bitrate_kbps),
            "-movflags".into(),
            "+faststart".into(),
            output.to_string_lossy().into_owned(),
        ]
    }

    fn run_once(&self, input: &Path, output: &Path) -> Result<(), OutputError> {
        let result = Command::new(&self.program)
            .args(self.args(input, output))
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OutputError::TranscoderNotFound(self.program.display().to_string())
                } else {
                    OutputError::Io(e)
                }
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(OutputError::TranscoderFailed {
                code: result.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, input: &Path, output: &Path) -> Result<(), OutputError> {
        retry_transient(self.retries, self.retry_delay, |attempt| {
            if attempt > 0 {
                log::warn!(
                    "Retrying transcode of {} ({attempt}/{})",
                    input.display(),
                    self.retries
                );
            }
            self.run_once(input, output)
        })
    }
}

/// Call `attempt` until it succeeds, fails with a non-transient error, or
/// `retries` extra attempts are used up. The delay doubles after each retry.
fn retry_transient<F>(retries: u32, mut delay: Duration, mut attempt: F) -> Result<(), OutputError>
where
    F: FnMut(u32) -> Result<(), OutputError>,
{
    let mut n = 0;
    loop {
        match attempt(n) {
            Ok(()) => return Ok(()),
            Err(e) if e.is_transient() && n < retries => {
                log::debug!("Attempt {} failed ({e}), sleeping {delay:?}", n + 1);
                std::thread::sleep(delay);
                delay *= 2;
                n += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Sibling path holding the lossless intermediate: same stem, `.wav`.
pub fn intermediate_path(destination: &Path) -> PathBuf {
    destination.with_extension("wav")
}

/// Sibling path the encoder writes to before the final rename.
///
/// Keeps the destination extension so the encoder picks the right muxer.
pub fn partial_path(destination: &Path) -> Result<PathBuf, OutputError> {
    let name = destination
        .file_name()
        .ok_or_else(|| OutputError::InvalidDestination(destination.to_path_buf()))?;
    Ok(destination.with_file_name(format!(".partial-{}", name.to_string_lossy())))
}

/// Write `buffer` to `destination` through the intermediate WAV.
///
/// On success the intermediate is removed. On transcode failure it is kept,
/// and `destination` is left untouched.
pub fn write_asset<T: Transcoder + ?Sized>(
    buffer: &AudioBuffer,
    destination: &Path,
    transcoder: &T,
) -> Result<(), OutputError> {
    let wav = intermediate_path(destination);
    let partial = partial_path(destination)?;

    buffer.write_wav(&wav)?;
    log::debug!(
        "Wrote {} ({} ch, {} Hz, {:.2}s)",
        wav.display(),
        buffer.channels(),
        buffer.sample_rate,
        buffer.duration_secs()
    );

    if let Err(e) = transcoder.transcode(&wav, &partial) {
        if partial.exists() {
            let _ = std::fs::remove_file(&partial);
        }
        log::warn!("Keeping intermediate {} after failed transcode", wav.display());
        return Err(e);
    }

    std::fs::rename(&partial, destination)?;
    // the asset is complete once renamed; a stale WAV is only clutter
    if let Err(e) = std::fs::remove_file(&wav) {
        log::warn!("Could not remove intermediate {}: {e}", wav.display());
    }
    Ok(())
}
