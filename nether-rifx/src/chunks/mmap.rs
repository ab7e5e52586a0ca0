//! `mmap` chunk: the container's chunk index

use std::sync::LazyLock;

use tracing::{debug, warn};

use crate::error::{Corruption, Result};
use crate::field::{self, Endian, Width};
use crate::schema::{Count, Field, Kind, Len, Record, Schema, Value};
use crate::tag::Tag;

/// Size of the fixed header in front of the entry table
pub const MMAP_HEADER_LEN: usize = 0x18;

/// Size of one index entry
pub const MMAP_ENTRY_LEN: usize = 0x14;

/// Fill pattern of index slots past `entries_used`
pub const UNUSED_SENTINEL: [u8; MMAP_ENTRY_LEN] = [0xAA; MMAP_ENTRY_LEN];

static ENTRY_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("mmap_entry")
        .uint("tag", 0x00, Width::U32)
        .uint("length", 0x04, Width::U32)
        .uint("offset", 0x08, Width::U32)
        .uint("flags", 0x0C, Width::U16)
        .uint("unknown", 0x0E, Width::U16)
        .uint("memsize", 0x10, Width::U32)
        .build()
        .expect("mmap entry layout is valid")
});

static MMAP_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("mmap")
        .uint("header_size", 0x00, Width::U16)
        .uint("entry_size", 0x02, Width::U16)
        .uint("entries_max", 0x04, Width::U32)
        .uint("entries_used", 0x08, Width::U32)
        .field(
            Field::new("marker", 0x0C, Kind::Bytes(Len::Fixed(8)))
                .constant(Value::Bytes(vec![0xFF; 8])),
        )
        .uint("free_head", 0x14, Width::U32)
        .field(Field::new(
            "entries",
            MMAP_HEADER_LEN,
            Kind::Records {
                schema: &ENTRY_SCHEMA,
                count: Count::Ref("entries_used"),
            },
        ))
        .build()
        .expect("mmap layout is valid")
});

/// One live index slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapEntry {
    pub tag: Tag,
    /// Payload length as recorded in the index
    pub length: u32,
    /// Absolute offset of the chunk header
    pub offset: u32,
    pub flags: u16,
    pub unknown: u16,
    pub memsize: u32,
}

impl MapEntry {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            tag: Tag::from_u32(record.get_u32("tag")?),
            length: record.get_u32("length")?,
            offset: record.get_u32("offset")?,
            flags: record.get_u16("flags")?,
            unknown: record.get_u16("unknown")?,
            memsize: record.get_u32("memsize")?,
        })
    }
}

/// An index slot, live or not
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot<'a> {
    Live(&'a MapEntry),
    /// Raw slot bytes, normally [`UNUSED_SENTINEL`]
    Unused(&'a [u8]),
}

/// Decoded `mmap` chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryMap {
    pub header_size: u16,
    pub entry_size: u16,
    pub entries_max: u32,
    pub entries_used: u32,
    pub free_head: u32,
    /// Slots `[0, entries_used)`
    pub entries: Vec<MapEntry>,
    /// Bytes of slots `[entries_used, entries_max)`, kept verbatim
    unused: Vec<u8>,
}

impl MemoryMap {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        // The slot counts are checked before the entry table is walked
        let entries_max = field::decode(payload, 0x04, Width::U32, Endian::Big)? as u32;
        let entries_used = field::decode(payload, 0x08, Width::U32, Endian::Big)? as u32;
        if entries_used > entries_max {
            return Err(Corruption::IndexOverflow {
                used: entries_used,
                max: entries_max,
            }
            .into());
        }

        let record = MMAP_SCHEMA.decode(payload, 0)?;
        let entries = record
            .records("entries")?
            .iter()
            .map(MapEntry::from_record)
            .collect::<Result<Vec<_>>>()?;

        let entry_size = record.get_u16("entry_size")?;
        if entry_size as usize != MMAP_ENTRY_LEN {
            warn!(entry_size, "mmap declares a non-standard entry size");
        }

        let unused_start =
            (MMAP_HEADER_LEN + entries_used as usize * MMAP_ENTRY_LEN).min(payload.len());
        let unused_len = (entries_max - entries_used) as usize * MMAP_ENTRY_LEN;
        let unused_end = unused_start.saturating_add(unused_len).min(payload.len());
        let unused = payload[unused_start..unused_end].to_vec();

        let stray = unused
            .chunks_exact(MMAP_ENTRY_LEN)
            .filter(|raw| *raw != UNUSED_SENTINEL)
            .count();
        if stray > 0 {
            debug!(stray, "unused mmap slots without the sentinel fill");
        }

        Ok(Self {
            header_size: record.get_u16("header_size")?,
            entry_size,
            entries_max,
            entries_used,
            free_head: record.get_u32("free_head")?,
            entries,
            unused,
        })
    }

    pub fn entry(&self, id: u32) -> Option<&MapEntry> {
        self.entries.get(id as usize)
    }

    /// Slot `id`, or `None` past `entries_max`
    ///
    /// Unused slots are whole [`MMAP_ENTRY_LEN`] byte runs. A slot the chunk
    /// ends before is `None` too.
    pub fn slot(&self, id: u32) -> Option<Slot<'_>> {
        if id < self.entries_used {
            return self.entries.get(id as usize).map(Slot::Live);
        }
        if id >= self.entries_max {
            return None;
        }
        let start = ((id - self.entries_used) as usize).checked_mul(MMAP_ENTRY_LEN)?;
        let end = start.checked_add(MMAP_ENTRY_LEN)?;
        self.unused.get(start..end).map(Slot::Unused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RifxError;

    fn map_bytes(max: u32, used: u32, entries: &[(Tag, u32, u32)]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(MMAP_HEADER_LEN as u16).to_be_bytes());
        out.extend_from_slice(&(MMAP_ENTRY_LEN as u16).to_be_bytes());
        out.extend_from_slice(&max.to_be_bytes());
        out.extend_from_slice(&used.to_be_bytes());
        out.extend_from_slice(&[0xFF; 8]);
        out.extend_from_slice(&0xFFFF_FFFFu32.to_be_bytes());
        for &(tag, length, offset) in entries {
            out.extend_from_slice(tag.as_bytes());
            out.extend_from_slice(&length.to_be_bytes());
            out.extend_from_slice(&offset.to_be_bytes());
            out.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0]);
        }
        for _ in used..max {
            out.extend_from_slice(&UNUSED_SENTINEL);
        }
        out
    }

    #[test]
    fn test_decode_live_and_unused() {
        let bytes = map_bytes(3, 2, &[(Tag::MMAP, 0x48, 0x0C), (Tag::CAST, 0x20, 0x5C)]);
        let map = MemoryMap::decode(&bytes).unwrap();

        assert_eq!(map.entries.len(), 2);
        assert_eq!(map.entries[1].tag, Tag::CAST);
        assert_eq!(map.entries[1].offset, 0x5C);
        assert_eq!(map.free_head, 0xFFFF_FFFF);

        assert_eq!(map.slot(0), Some(Slot::Live(&map.entries[0])));
        assert_eq!(map.slot(2), Some(Slot::Unused(&UNUSED_SENTINEL[..])));
        assert_eq!(map.slot(3), None);
        assert!(map.entry(2).is_none());
    }

    #[test]
    fn test_slots_past_chunk_end() {
        // Room for one of the three unused slots, plus half of the next
        let mut bytes = map_bytes(4, 1, &[(Tag::MMAP, 0, 0)]);
        bytes.truncate(MMAP_HEADER_LEN + 2 * MMAP_ENTRY_LEN + MMAP_ENTRY_LEN / 2);
        let map = MemoryMap::decode(&bytes).unwrap();

        assert_eq!(map.slot(1), Some(Slot::Unused(&UNUSED_SENTINEL[..])));
        assert_eq!(map.slot(2), None);
        assert_eq!(map.slot(3), None);
        assert_eq!(map.slot(4), None);
    }

    #[test]
    fn test_used_beyond_max() {
        let bytes = map_bytes(1, 2, &[(Tag::MMAP, 0, 0), (Tag::CAST, 0, 0)]);
        assert_eq!(
            MemoryMap::decode(&bytes),
            Err(RifxError::ContainerCorrupt(Corruption::IndexOverflow { used: 2, max: 1 }))
        );
    }

    #[test]
    fn test_bad_marker() {
        let mut bytes = map_bytes(1, 1, &[(Tag::MMAP, 0, 0)]);
        bytes[0x0C] = 0x00;
        assert!(matches!(
            MemoryMap::decode(&bytes),
            Err(RifxError::FormatViolation { field: "marker", .. })
        ));
    }
}
