//! `KEY*` chunk: associates resource chunks with their owning cast

use std::sync::LazyLock;

use crate::error::Result;
use crate::field::Width;
use crate::schema::{Count, Field, Kind, Record, Schema};
use crate::tag::Tag;

pub const KEY_HEADER_LEN: usize = 0x0C;
pub const KEY_ENTRY_LEN: usize = 0x0C;

static ENTRY_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("key_entry")
        .uint("section_index", 0x00, Width::U32)
        .uint("cast_index", 0x04, Width::U32)
        .uint("chunk_id", 0x08, Width::U32)
        .build()
        .expect("key entry layout is valid")
});

static KEY_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("KEY*")
        .uint("unknown1", 0x00, Width::U16)
        .uint("unknown2", 0x02, Width::U16)
        .uint("unknown3", 0x04, Width::U32)
        .uint("entry_count", 0x08, Width::U32)
        .field(Field::new(
            "entries",
            KEY_HEADER_LEN,
            Kind::Records {
                schema: &ENTRY_SCHEMA,
                count: Count::Ref("entry_count"),
            },
        ))
        .trailing("trailing")
        .build()
        .expect("KEY* layout is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEntry {
    /// Index id of the resource chunk
    pub section_index: u32,
    /// Index id of the owning `CASt` chunk
    pub cast_index: u32,
    /// Tag of the resource chunk
    pub chunk_id: Tag,
}

impl KeyEntry {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            section_index: record.get_u32("section_index")?,
            cast_index: record.get_u32("cast_index")?,
            chunk_id: Tag::from_u32(record.get_u32("chunk_id")?),
        })
    }
}

/// Decoded `KEY*` chunk
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyTable {
    pub unknown1: u16,
    pub unknown2: u16,
    pub unknown3: u32,
    pub entries: Vec<KeyEntry>,
    /// Whatever follows the entry table
    pub trailing: Vec<u8>,
}

impl KeyTable {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let record = KEY_SCHEMA.decode(payload, 0)?;
        let entries = record
            .records("entries")?
            .iter()
            .map(KeyEntry::from_record)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            unknown1: record.get_u16("unknown1")?,
            unknown2: record.get_u16("unknown2")?,
            unknown3: record.get_u32("unknown3")?,
            entries,
            trailing: record.bytes("trailing")?.to_vec(),
        })
    }
}
