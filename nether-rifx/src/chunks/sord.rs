//! `Sord` chunk: score order

use std::sync::LazyLock;

use crate::error::Result;
use crate::field::Width;
use crate::schema::{Count, Field, Kind, Len, Schema};

static SORD_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("Sord")
        .bytes("unknown1", 0x00, Len::Fixed(0x0C))
        .uint("count", 0x0C, Width::U32)
        .uint("unknown2", 0x10, Width::U16)
        .uint("unknown3", 0x12, Width::U16)
        .field(Field::new(
            "index",
            0x14,
            Kind::UIntList {
                width: Width::U16,
                endian: None,
                count: Count::Ref("count"),
            },
        ))
        .build()
        .expect("Sord layout is valid")
});

/// Decoded `Sord` chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreOrder {
    pub unknown1: Vec<u8>,
    pub unknown2: u16,
    pub unknown3: u16,
    /// Cast indices in score order
    pub index: Vec<u16>,
}

impl ScoreOrder {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let record = SORD_SCHEMA.decode(payload, 0)?;
        Ok(Self {
            unknown1: record.bytes("unknown1")?.to_vec(),
            unknown2: record.get_u16("unknown2")?,
            unknown3: record.get_u16("unknown3")?,
            index: record.list("index")?.iter().map(|&i| i as u16).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode() {
        let mut bytes = vec![0u8; 12];
        bytes.extend_from_slice(&3u32.to_be_bytes());
        bytes.extend_from_slice(&[0x00, 0x14, 0x00, 0x02]);
        bytes.extend_from_slice(&[0x00, 0x01, 0x00, 0x03, 0x01, 0x00]);

        let sord = ScoreOrder::decode(&bytes).unwrap();
        assert_eq!(sord.index, vec![1, 3, 0x100]);
        assert_eq!(sord.unknown2, 0x14);
        assert_eq!(sord.unknown3, 2);
    }

    #[test]
    fn test_short_index() {
        let mut bytes = vec![0u8; 12];
        bytes.extend_from_slice(&2u32.to_be_bytes());
        bytes.extend_from_slice(&[0, 0, 0, 0, 0x00, 0x01]);
        assert!(ScoreOrder::decode(&bytes).is_err());
    }
}
