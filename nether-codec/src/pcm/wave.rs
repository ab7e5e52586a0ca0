//! Sound payloads and playback rendering

use crate::pcm::{Interpolation, SampleFormat, normalize, pad_to_chunk, resample};
use crate::{AudioConfig, CodecError, RESAMPLE_FORMAT, Result};

/// Raw PCM pulled out of an archive, with the format it was stored in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wave {
    data: Vec<u8>,
    format: SampleFormat,
    sample_rate: u32,
    channels: u16,
}

/// PCM ready to hand to a playback sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmBuffer {
    pub data: Vec<u8>,
    pub format: SampleFormat,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmBuffer {
    /// Number of frames (one sample per channel)
    pub fn frames(&self) -> usize {
        self.data.len() / (self.format.width() * self.channels.max(1) as usize)
    }

    /// Size in bytes of `frames` frames in this buffer's format
    pub fn frame_bytes(&self, frames: usize) -> usize {
        frames * self.format.width() * self.channels.max(1) as usize
    }
}

impl Wave {
    /// Wrap interleaved PCM bytes
    pub fn new(
        data: impl Into<Vec<u8>>,
        format: SampleFormat,
        sample_rate: u32,
        channels: u16,
    ) -> Self {
        Self {
            data: data.into(),
            format,
            sample_rate,
            channels,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Prepare this sound for playback
    ///
    /// `None` passes the original bytes through at the original format and
    /// rate. `Linear` and `Step` resample every channel to
    /// `config.target_rate` as 16-bit PCM. In every case the result is padded
    /// with silence to a multiple of `config.playback_buffer` frames.
    ///
    /// # Errors
    /// - [`CodecError::Unsupported`] for [`Interpolation::Cubic`]
    /// - [`CodecError::InvalidSampleRate`] for a zero source or target rate
    pub fn render(&self, mode: Interpolation, config: &AudioConfig) -> Result<PcmBuffer> {
        let mut buffer = match mode {
            Interpolation::None => PcmBuffer {
                data: self.data.clone(),
                format: self.format,
                sample_rate: self.sample_rate,
                channels: self.channels,
            },
            Interpolation::Linear | Interpolation::Step => PcmBuffer {
                data: self.resample_channels(mode, config.target_rate)?,
                format: RESAMPLE_FORMAT,
                sample_rate: config.target_rate,
                channels: self.channels,
            },
            Interpolation::Cubic => return Err(CodecError::Unsupported(mode)),
        };

        pad_to_chunk(
            &mut buffer.data,
            buffer.format,
            buffer.channels,
            config.playback_buffer,
        );
        tracing::debug!(
            ?mode,
            frames = buffer.frames(),
            rate = buffer.sample_rate,
            "rendered wave for playback"
        );
        Ok(buffer)
    }

    /// Resample each channel separately and re-interleave
    fn resample_channels(&self, mode: Interpolation, target_rate: u32) -> Result<Vec<u8>> {
        let channels = self.channels.max(1) as usize;
        let normalized = normalize(&self.data, self.format);

        let mut planes = Vec::with_capacity(channels);
        for channel in 0..channels {
            let mut samples: Vec<f64> = normalized
                .iter()
                .skip(channel)
                .step_by(channels)
                .copied()
                .collect();
            // Guard sample so the last real sample still gets an output span
            samples.push(0.0);
            planes.push(resample(&samples, self.sample_rate, target_rate, mode)?);
        }

        if channels == 1 {
            return Ok(planes.pop().unwrap_or_default());
        }

        let width = RESAMPLE_FORMAT.width();
        let frames = planes.iter().map(|p| p.len() / width).min().unwrap_or(0);
        let mut out = Vec::with_capacity(frames * width * channels);
        for frame in 0..frames {
            for plane in &planes {
                out.extend_from_slice(&plane[frame * width..(frame + 1) * width]);
            }
        }
        Ok(out)
    }
}
