//! Nether-Codec: decode-side codec transforms for legacy multimedia archives
//!
//! These are the pure transforms that turn payload bytes pulled out of a RIFX
//! archive (see `nether-rifx`) into pixel and PCM buffers. Every transform is a
//! function of its input slice only: nothing here touches the container,
//! caches anything, or mutates its input.
//!
//! # Transforms
//!
//! | Module | Input | Output |
//! |--------|-------|--------|
//! | [`rle`] | PackBits-style bitmap stream | raw bytes |
//! | [`planar`] | bit-plane bitmap bytes | one palette index per pixel |
//! | [`pcm`] | raw PCM samples | normalized floats / resampled 16-bit PCM |
//!
//! [`palette`] holds the Director system palette as a one-time lookup table and
//! [`playback`] is the seam where rendered PCM is handed to an output device.
//!
//! # Usage
//!
//! ```
//! use nether_codec::{rle, planar::{PlanarLayout, unpack}};
//!
//! // 0xFE repeats the next byte three times
//! let raw = rle::decompress(&[0xFE, 0xFF]).unwrap();
//! assert_eq!(raw, vec![0xFF; 3]);
//!
//! let pixels = unpack(&raw, &PlanarLayout::single(8, 1, 1)).unwrap();
//! assert_eq!(pixels, vec![1; 8]);
//! ```

mod config;
mod error;

pub mod palette;
pub mod pcm;
pub mod planar;
pub mod playback;
pub mod rle;

pub use config::AudioConfig;
pub use error::{CodecError, Result};
pub use palette::{DIRECTOR_PALETTE, Palette, Rgba};
pub use pcm::{Interpolation, PcmBuffer, SampleFormat, Wave, normalize, resample};
pub use planar::{PlanarLayout, unpack};
pub use playback::{PlaybackOutcome, PlaybackSink, WavSink, play};

// =============================================================================
// Constants
// =============================================================================

/// Playback chunk size in samples; rendered PCM is padded to a multiple of this
pub const PLAYBACK_BUFFER: usize = 4096;

/// Output rate used when resampling for playback
pub const RESAMPLE_RATE: u32 = 44100;

/// Output sample format used when resampling for playback
pub const RESAMPLE_FORMAT: SampleFormat = SampleFormat::I16Le;
