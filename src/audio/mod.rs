//! Channel-major audio buffers and the normalization step between synthesis
//! and the effect chain.

use std::path::Path;

use ndarray::{concatenate, Array2, ArrayD, Axis, Ix1, Ix2};

use crate::error::AudioError;

/// Multi-channel float audio laid out `[channels, frames]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Array2<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Array2<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn channels(&self) -> usize {
        self.samples.nrows()
    }

    pub fn frames(&self) -> usize {
        self.samples.ncols()
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value across all channels.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Write the audio to a 32-bit float WAV file, interleaving channels.
    pub fn write_wav(&self, path: &Path) -> Result<(), hound::Error> {
        let spec = hound::WavSpec {
            channels: self.channels() as u16,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for frame in self.samples.columns() {
            for &sample in frame {
                writer.write_sample(sample)?;
            }
        }
        writer.finalize()?;
        Ok(())
    }
}

/// Coerce raw engine output into a channel-major buffer.
///
/// 1-D input becomes a single channel. 2-D input whose first axis is longer
/// than its second is taken as frame-major and transposed, since channel
/// counts are always far smaller than frame counts.
pub fn normalize(samples: ArrayD<f32>, sample_rate: u32) -> Result<AudioBuffer, AudioError> {
    let samples = match samples.ndim() {
        1 => {
            let mono = samples.into_dimensionality::<Ix1>()?;
            mono.insert_axis(Axis(0))
        }
        2 => {
            let grid = samples.into_dimensionality::<Ix2>()?;
            if grid.nrows() > grid.ncols() {
                grid.reversed_axes().as_standard_layout().into_owned()
            } else {
                grid
            }
        }
        n => return Err(AudioError::Dimensions(n)),
    };

    if samples.is_empty() {
        return Err(AudioError::Empty);
    }
    Ok(AudioBuffer::new(samples, sample_rate))
}

/// Number of frames in `seconds` of audio at `sample_rate`.
pub fn silence_frames(sample_rate: u32, seconds: f32) -> usize {
    (sample_rate as f64 * seconds as f64).round() as usize
}

/// Append `seconds` of silence to every channel.
pub fn pad_silence(buffer: AudioBuffer, seconds: f32) -> Result<AudioBuffer, AudioError> {
    let pad = silence_frames(buffer.sample_rate, seconds);
    if pad == 0 {
        return Ok(buffer);
    }
    let silence = Array2::<f32>::zeros((buffer.channels(), pad));
    let samples = concatenate(Axis(1), &[buffer.samples.view(), silence.view()])?;
    Ok(AudioBuffer::new(samples, buffer.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    #[test]
    fn mono_becomes_single_channel_row() {
        let raw = Array1::from_vec(vec![0.1f32, 0.2, 0.3]).into_dyn();
        let buffer = normalize(raw, 24_000).unwrap();
        assert_eq!(buffer.samples.shape(), &[1, 3]);
        assert_eq!(buffer.samples[[0, 2]], 0.3);
    }

    #[test]
    fn frame_major_input_is_transposed() {
        // 4 frames x 2 channels
        let raw = array![[1.0f32, -1.0], [2.0, -2.0], [3.0, -3.0], [4.0, -4.0]].into_dyn();
        let buffer = normalize(raw, 8_000).unwrap();
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.frames(), 4);
        assert_eq!(buffer.samples.row(1).to_vec(), vec![-1.0, -2.0, -3.0, -4.0]);
    }

    #[test]
    fn channel_major_input_is_kept() {
        let raw = array![[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn();
        let buffer = normalize(raw.clone(), 8_000).unwrap();
        assert_eq!(buffer.samples.into_dyn(), raw);
    }

    #[test]
    fn rejects_bad_shapes() {
        let cube = ArrayD::<f32>::zeros(vec![2, 2, 2]);
        assert!(matches!(normalize(cube, 8_000), Err(AudioError::Dimensions(3))));
        let empty = ArrayD::<f32>::zeros(vec![0]);
        assert!(matches!(normalize(empty, 8_000), Err(AudioError::Empty)));
    }

    #[test]
    fn padding_adds_half_second_per_channel() {
        for (channels, rate) in [(1, 24_000), (2, 44_100), (3, 22_050)] {
            let buffer = AudioBuffer::new(Array2::from_elem((channels, 1000), 0.5), rate);
            let padded = pad_silence(buffer, 0.5).unwrap();
            assert_eq!(padded.channels(), channels);
            assert_eq!(padded.frames(), 1000 + silence_frames(rate, 0.5));
            assert!(padded.samples.slice(ndarray::s![.., 1000..]).iter().all(|&s| s == 0.0));
        }
        assert_eq!(silence_frames(22_050, 0.5), 11_025);
    }

    #[test]
    fn writes_interleaved_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let buffer = AudioBuffer::new(array![[0.1f32, 0.2], [-0.1, -0.2]], 16_000);
        buffer.write_wav(&path).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 16_000);
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0.1, -0.1, 0.2, -0.2]);
    }
}
