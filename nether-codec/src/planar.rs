//! Bit-plane image unpacking
//!
//! Planar images store each bit of the pixel index in its own single-bit
//! bitmap. Plane `b` of a frame is a `width * height` bit scan (MSB first);
//! every set bit adds `1 << b` to the matching output pixel.
//!
//! The bit cursor runs straight through a frame: planes are packed back to back
//! without byte alignment between them, and rows are not padded.

use crate::{CodecError, Result};

/// Geometry of a planar image strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanarLayout {
    pub width: usize,
    pub height: usize,
    /// Bits per pixel (number of planes), 1..=8
    pub bits_per_pixel: u8,
    /// Byte offset of the first frame
    pub frame_offset: usize,
    /// Distance in bytes between the starts of consecutive frames
    pub frame_stride: usize,
    pub frame_count: usize,
}

impl PlanarLayout {
    /// Layout for a single frame starting at byte 0
    pub fn single(width: usize, height: usize, bits_per_pixel: u8) -> Self {
        Self {
            width,
            height,
            bits_per_pixel,
            frame_offset: 0,
            frame_stride: 0,
            frame_count: 1,
        }
    }

    /// Pixels in one frame; `None` if that overflows `usize`
    pub fn frame_pixels(&self) -> Option<usize> {
        self.width.checked_mul(self.height)
    }

    /// Bytes consumed by one frame's plane scan (rounded up to whole bytes)
    pub fn frame_bytes(&self) -> Option<usize> {
        let bits = self.frame_pixels()?.checked_mul(self.bits_per_pixel as usize)?;
        Some(bits.div_ceil(8))
    }

    /// Byte offset of frame `frame`
    pub fn frame_start(&self, frame: usize) -> Option<usize> {
        frame
            .checked_mul(self.frame_stride)?
            .checked_add(self.frame_offset)
    }
}

/// MSB-first bit cursor over a byte slice
struct BitCursor<'a> {
    data: &'a [u8],
    index: usize,
    pos: u8,
}

impl<'a> BitCursor<'a> {
    fn new(data: &'a [u8], index: usize) -> Self {
        Self { data, index, pos: 0 }
    }

    /// Caller guarantees the scan stays in bounds
    fn next_bit(&mut self) -> u8 {
        let bit = (self.data[self.index] >> (7 - self.pos)) & 1;
        self.pos += 1;
        if self.pos == 8 {
            self.pos = 0;
            self.index += 1;
        }
        bit
    }
}

/// Unpack planar pixel data into one index per pixel
///
/// Output length is `width * height * frame_count`, row-major within a frame
/// and frame-major overall.
///
/// # Errors
/// - [`CodecError::InvalidBitDepth`] for a bit depth outside 1..=8
/// - [`CodecError::PlaneOverrun`] if any frame's scan runs past `buffer`
pub fn unpack(buffer: &[u8], layout: &PlanarLayout) -> Result<Vec<u8>> {
    if !(1..=8).contains(&layout.bits_per_pixel) {
        return Err(CodecError::InvalidBitDepth(layout.bits_per_pixel));
    }

    let overrun = |frame: usize, offset: usize, need: usize| CodecError::PlaneOverrun {
        frame,
        offset,
        need,
        have: buffer.len(),
    };
    let too_large = || overrun(0, layout.frame_offset, usize::MAX);

    let frame_pixels = layout.frame_pixels().ok_or_else(too_large)?;
    let need = layout.frame_bytes().ok_or_else(too_large)?;
    if frame_pixels == 0 || layout.frame_count == 0 {
        return Ok(Vec::new());
    }
    let total = frame_pixels
        .checked_mul(layout.frame_count)
        .ok_or_else(too_large)?;

    let start_of = |frame: usize| -> Result<usize> {
        let start = layout.frame_start(frame);
        match start {
            Some(start) if start.checked_add(need).is_some_and(|end| end <= buffer.len()) => {
                Ok(start)
            }
            _ => Err(overrun(frame, start.unwrap_or(usize::MAX), need)),
        }
    };
    // Frame starts never decrease, so the first and last frames bound the rest
    start_of(0)?;
    start_of(layout.frame_count - 1)?;

    let mut pixels = vec![0u8; total];
    for (frame, out) in pixels.chunks_exact_mut(frame_pixels).enumerate() {
        let mut cursor = BitCursor::new(buffer, start_of(frame)?);
        for plane in 0..layout.bits_per_pixel {
            for pixel in out.iter_mut() {
                *pixel |= cursor.next_bit() << plane;
            }
        }
    }

    Ok(pixels)
}
