//! Error types for the codec transforms

use thiserror::Error;

use crate::pcm::Interpolation;

/// Errors raised by the decode transforms
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// An RLE control byte promises more payload than the input holds
    #[error("truncated RLE stream at offset {offset:#x} (need {need} bytes, have {have})")]
    Truncated {
        offset: usize,
        need: usize,
        have: usize,
    },

    /// A bit-plane scan would run off the end of the source buffer
    #[error("bit-plane scan for frame {frame} needs {need} bytes from offset {offset:#x}, buffer holds {have}")]
    PlaneOverrun {
        frame: usize,
        offset: usize,
        need: usize,
        have: usize,
    },

    /// Bits per pixel outside 1..=8
    #[error("unsupported bit depth: {0} (expected 1-8)")]
    InvalidBitDepth(u8),

    /// A sample rate of zero was supplied
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    /// Interpolation mode is declared but has no algorithm
    #[error("interpolation mode {0:?} is not supported")]
    Unsupported(Interpolation),

    /// Configuration could not be parsed
    #[error("invalid audio config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;
