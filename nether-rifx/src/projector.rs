//! `PJ93` projector header
//!
//! Projectors are executables with the movie appended. The little-endian
//! header at the start of the appended data points at the embedded RIFX.

use std::sync::LazyLock;

use crate::error::Result;
use crate::field::{Endian, Width};
use crate::schema::{Field, Kind, Len, Schema, Value};

pub const PROJECTOR_MAGIC: &[u8; 4] = b"PJ93";

static PROJECTOR_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("PJ93")
        .endian(Endian::Little)
        .field(
            Field::new("magic", 0x00, Kind::Bytes(Len::Fixed(4)))
                .constant(Value::Bytes(PROJECTOR_MAGIC.to_vec())),
        )
        .uint("rifx_offset", 0x04, Width::U32)
        .uint("fontmap_offset", 0x08, Width::U32)
        .uint("resfork1_offset", 0x0C, Width::U32)
        .uint("resfork2_offset", 0x10, Width::U32)
        .uint("graphics_dll_offset", 0x14, Width::U32)
        .uint("sound_dll_offset", 0x18, Width::U32)
        .uint("rifx_offset_dup", 0x1C, Width::U32)
        .build()
        .expect("PJ93 layout is valid")
});

/// Decoded projector header; all offsets are absolute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectorHeader {
    pub rifx_offset: u32,
    pub fontmap_offset: u32,
    pub resfork1_offset: u32,
    pub resfork2_offset: u32,
    pub graphics_dll_offset: u32,
    pub sound_dll_offset: u32,
    pub rifx_offset_dup: u32,
}

impl ProjectorHeader {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let record = PROJECTOR_SCHEMA.decode(bytes, 0)?;
        Ok(Self {
            rifx_offset: record.get_u32("rifx_offset")?,
            fontmap_offset: record.get_u32("fontmap_offset")?,
            resfork1_offset: record.get_u32("resfork1_offset")?,
            resfork2_offset: record.get_u32("resfork2_offset")?,
            graphics_dll_offset: record.get_u32("graphics_dll_offset")?,
            sound_dll_offset: record.get_u32("sound_dll_offset")?,
            rifx_offset_dup: record.get_u32("rifx_offset_dup")?,
        })
    }
}
