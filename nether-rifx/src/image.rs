//! Bitmap cast pixels
//!
//! A 1-bit bitmap cast stores its pixels in a separate `BITD` chunk as an
//! RLE stream of rows `pitch` bytes wide. Decoding runs the stream through
//! [`rle::decompress`], unpacks the single bit-plane and crops each row to the
//! cast's rectangle.

use nether_codec::planar::{PlanarLayout, unpack};
use nether_codec::{Palette, Rgba, rle};
use tracing::debug;

use crate::chunks::BitmapCast;
use crate::error::Result;

/// Flat palette-indexed image, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl IndexedImage {
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }

    /// Look every pixel up in `palette`; indices it lacks become transparent
    pub fn to_rgba(&self, palette: &Palette) -> Vec<Rgba> {
        const CLEAR: Rgba = Rgba {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        };
        self.pixels
            .iter()
            .map(|&index| palette.get(index).unwrap_or(CLEAR))
            .collect()
    }
}

impl BitmapCast {
    /// Decode this cast's 1-bit pixels from its `BITD` payload
    pub fn decode_monochrome(&self, bitd: &[u8]) -> Result<IndexedImage> {
        let raw = rle::decompress(bitd)?;

        let stride = self.pitch as usize * 8;
        let height = self.initial_rect.height() as usize;
        let width = (self.initial_rect.width() as usize).min(stride);

        let rows = unpack(&raw, &PlanarLayout::single(stride, height, 1))?;
        let pixels = if width == stride {
            rows
        } else {
            rows.chunks(stride.max(1))
                .flat_map(|row| row[..width].iter().copied())
                .collect()
        };

        debug!(width, height, pitch = self.pitch, "decoded monochrome bitmap");
        Ok(IndexedImage {
            width,
            height,
            pixels,
        })
    }
}
