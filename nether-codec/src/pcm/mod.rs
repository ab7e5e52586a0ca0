//! PCM normalization and resampling
//!
//! Sound payloads come out of archives as raw PCM in a handful of legacy
//! formats. They are normalized to floats in `[-1, 1)` and then resampled to a
//! fixed 16-bit little-endian output so every sound plays at one device rate.
//!
//! # Interpolation
//!
//! | Mode | Behaviour |
//! |------|-----------|
//! | `None` | no rate change |
//! | `Linear` | blend of the two neighbouring source samples |
//! | `Step` | zero-order hold on the preceding source sample |
//! | `Cubic` | declared only; always [`CodecError::Unsupported`] |

mod wave;


use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::{CodecError, Result};

pub use wave::{PcmBuffer, Wave};

/// Raw sample encodings found in sound payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleFormat {
    /// Unsigned 8-bit, centered at 128
    U8,
    /// Signed 8-bit
    I8,
    /// Signed 16-bit little-endian
    I16Le,
    /// Signed 32-bit little-endian
    I32Le,
}

impl SampleFormat {
    /// Bytes per sample
    pub fn width(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::I16Le => 2,
            Self::I32Le => 4,
        }
    }

    /// Bits per sample
    pub fn bits(self) -> u16 {
        self.width() as u16 * 8
    }

    /// Encoded value of a silent sample
    pub fn silence(self) -> &'static [u8] {
        match self {
            Self::U8 => &[0x80],
            Self::I8 => &[0x00],
            Self::I16Le => &[0x00, 0x00],
            Self::I32Le => &[0x00, 0x00, 0x00, 0x00],
        }
    }

    /// Full-scale magnitude used when normalizing
    fn full_scale(self) -> f64 {
        match self {
            Self::U8 | Self::I8 => 128.0,
            Self::I16Le => 32768.0,
            Self::I32Le => 2147483648.0,
        }
    }
}

/// Interpolation used when changing sample rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Leave the rate alone and let the output device deal with it
    None,
    /// Sharp linear interpolation, like early DSPs
    #[default]
    Linear,
    /// Step (sample-and-hold) interpolation
    Step,
    /// Cubic spline; reserved, not implemented
    Cubic,
}

/// Convert raw samples to floats in `[-1, 1)`
///
/// Trailing bytes that do not form a whole sample are ignored.
pub fn normalize(samples: &[u8], format: SampleFormat) -> Vec<f64> {
    let scale = format.full_scale();
    let chunks = samples.chunks_exact(format.width());
    match format {
        SampleFormat::U8 => chunks.map(|b| (b[0] as f64 - 128.0) / scale).collect(),
        SampleFormat::I8 => chunks.map(|b| b[0] as i8 as f64 / scale).collect(),
        SampleFormat::I16Le => chunks
            .map(|b| LittleEndian::read_i16(b) as f64 / scale)
            .collect(),
        SampleFormat::I32Le => chunks
            .map(|b| LittleEndian::read_i32(b) as f64 / scale)
            .collect(),
    }
}

/// Number of output samples produced when resampling `source_len` samples
pub fn resampled_len(source_len: usize, source_rate: u32, target_rate: u32) -> usize {
    let span = source_len.saturating_sub(1) as u64;
    (target_rate as u64 * span / source_rate as u64) as usize
}

/// Resample normalized samples to signed 16-bit little-endian PCM
///
/// `Linear` and `Step` produce [`resampled_len`] samples; `None` quantizes
/// the input without changing its rate. The result is not padded, see
/// [`pad_to_chunk`].
///
/// # Errors
/// - [`CodecError::InvalidSampleRate`] if either rate is zero
/// - [`CodecError::Unsupported`] for [`Interpolation::Cubic`]
pub fn resample(
    normalized: &[f64],
    source_rate: u32,
    target_rate: u32,
    mode: Interpolation,
) -> Result<Vec<u8>> {
    if source_rate == 0 {
        return Err(CodecError::InvalidSampleRate(source_rate));
    }
    if target_rate == 0 {
        return Err(CodecError::InvalidSampleRate(target_rate));
    }

    let samples: Vec<f64> = match mode {
        Interpolation::None => normalized.to_vec(),
        Interpolation::Linear => {
            let len = resampled_len(normalized.len(), source_rate, target_rate);
            let (src, dst) = (source_rate as u64, target_rate as u64);
            (0..len as u64)
                .map(|i| {
                    let idx = (src * i / dst) as usize;
                    let frac = (src * i % dst) as f64 / dst as f64;
                    let a = normalized[idx];
                    let b = normalized[idx + 1];
                    a + frac * (b - a)
                })
                .collect()
        }
        Interpolation::Step => {
            let len = resampled_len(normalized.len(), source_rate, target_rate);
            let (src, dst) = (source_rate as u64, target_rate as u64);
            (0..len as u64)
                .map(|i| normalized[(src * i / dst) as usize])
                .collect()
        }
        Interpolation::Cubic => return Err(CodecError::Unsupported(mode)),
    };

    let mut out = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        out.extend_from_slice(&quantize_i16(sample).to_le_bytes());
    }
    Ok(out)
}

/// Pad PCM bytes with silence up to a whole number of playback chunks
///
/// `chunk_frames` is measured in frames (one sample per channel). A partial
/// trailing frame is dropped first.
pub fn pad_to_chunk(
    data: &mut Vec<u8>,
    format: SampleFormat,
    channels: u16,
    chunk_frames: usize,
) {
    let frame_size = format.width() * channels.max(1) as usize;
    let frames = data.len() / frame_size;
    data.truncate(frames * frame_size);

    if chunk_frames == 0 {
        return;
    }
    let remainder = frames % chunk_frames;
    if remainder != 0 {
        let missing = (chunk_frames - remainder) * channels.max(1) as usize;
        data.reserve(missing * format.width());
        for _ in 0..missing {
            data.extend_from_slice(format.silence());
        }
    }
}

/// Scale to 16-bit, truncating toward zero and saturating at the rails
fn quantize_i16(sample: f64) -> i16 {
    (32768.0 * sample) as i16
}
