//! Fixed-width integer and bit-field reads
//!
//! These are the primitive reads every schema field bottoms out in. They only
//! ever borrow the source buffer, and a read that would run past its end is
//! an error rather than a short value.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RifxError};

/// Storage width of an integer field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    U8,
    U16,
    U32,
}

impl Width {
    pub fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// Byte order of a multi-byte field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    /// RIFX containers and everything inside them
    #[default]
    Big,
    /// Projector headers and XFIR-style files
    Little,
}

/// Borrow `len` bytes at `offset`, or fail with [`RifxError::UnexpectedEof`]
pub fn bytes_at(buffer: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let have = buffer.len().saturating_sub(offset);
    if offset > buffer.len() || len > have {
        return Err(RifxError::UnexpectedEof {
            offset,
            need: len,
            have,
        });
    }
    Ok(&buffer[offset..offset + len])
}

/// Read an unsigned integer
pub fn decode(buffer: &[u8], offset: usize, width: Width, endian: Endian) -> Result<u64> {
    let bytes = bytes_at(buffer, offset, width.bytes())?;
    let value = match (width, endian) {
        (Width::U8, _) => bytes[0] as u64,
        (Width::U16, Endian::Big) => BigEndian::read_u16(bytes) as u64,
        (Width::U16, Endian::Little) => LittleEndian::read_u16(bytes) as u64,
        (Width::U32, Endian::Big) => BigEndian::read_u32(bytes) as u64,
        (Width::U32, Endian::Little) => LittleEndian::read_u32(bytes) as u64,
    };
    Ok(value)
}

/// Read a two's-complement integer, sign-extended
pub fn decode_signed(buffer: &[u8], offset: usize, width: Width, endian: Endian) -> Result<i64> {
    let raw = decode(buffer, offset, width, endian)?;
    let value = match width {
        Width::U8 => raw as u8 as i8 as i64,
        Width::U16 => raw as u16 as i16 as i64,
        Width::U32 => raw as u32 as i32 as i64,
    };
    Ok(value)
}

/// Read a bit-packed field
///
/// `width` bytes are read big-endian from `byte_offset`, masked with
/// `bit_mask`, and shifted down so the mask's lowest set bit lands at bit 0.
/// `decode_bits(&[0xAB], 0, 0xF0, Width::U8)` is `0xA`.
pub fn decode_bits(buffer: &[u8], byte_offset: usize, bit_mask: u32, width: Width) -> Result<u64> {
    let raw = decode(buffer, byte_offset, width, Endian::Big)?;
    if bit_mask == 0 {
        return Ok(0);
    }
    let mask = bit_mask as u64;
    Ok((raw & mask) >> mask.trailing_zeros())
}
