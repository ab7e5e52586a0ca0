//! `CASt` chunk: cast members and discriminant dispatch
//!
//! The header's one-byte type selects the detail layout from a [`CastMap`],
//! which the `CASt` schema consults as its variant table. Types without a
//! layout keep their detail bytes untouched.

use std::sync::LazyLock;

use hashbrown::HashMap;
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::field::Width;
use crate::schema::{Len, Record, Schema, Value, Variants};

/// Offset of the type-specific detail within a `CASt` payload
pub const CAST_DETAIL_OFFSET: usize = 0x07;

/// Cast member types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CastType {
    Null = 0x00,
    Bitmap = 0x01,
    FilmLoop = 0x02,
    Text = 0x03,
    Palette = 0x04,
    Picture = 0x05,
    Sound = 0x06,
    Button = 0x07,
    Shape = 0x08,
    Movie = 0x09,
    DigitalVideo = 0x0A,
    LingoScript = 0x0B,
    Rte = 0x0C,
}

impl CastType {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0x00 => Self::Null,
            0x01 => Self::Bitmap,
            0x02 => Self::FilmLoop,
            0x03 => Self::Text,
            0x04 => Self::Palette,
            0x05 => Self::Picture,
            0x06 => Self::Sound,
            0x07 => Self::Button,
            0x08 => Self::Shape,
            0x09 => Self::Movie,
            0x0A => Self::DigitalVideo,
            0x0B => Self::LingoScript,
            0x0C => Self::Rte,
            _ => return None,
        })
    }
}

static RECT_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("rect")
        .uint("top", 0x00, Width::U16)
        .uint("left", 0x02, Width::U16)
        .uint("bottom", 0x04, Width::U16)
        .uint("right", 0x06, Width::U16)
        .build()
        .expect("rect layout is valid")
});

static BITMAP_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("bitmap_cast")
        .uint("unknown1", 0x00, Width::U8)
        .bits("flags", 0x01, 0xF0, Width::U8)
        .bits("pitch", 0x01, 0x0FFF, Width::U16)
        .record("initial_rect", 0x03, &RECT_SCHEMA)
        .record("bounding_rect", 0x0B, &RECT_SCHEMA)
        .uint("reg_x", 0x13, Width::U16)
        .uint("reg_y", 0x15, Width::U16)
        .trailing("trailing")
        .build()
        .expect("bitmap cast layout is valid")
});

static CAST_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("CASt")
        .uint("size1", 0x00, Width::U16)
        .uint("size2", 0x02, Width::U32)
        .uint("cast_type", 0x06, Width::U8)
        .variant("detail", CAST_DETAIL_OFFSET, "cast_type", Len::ToEnd)
        .build()
        .expect("CASt layout is valid")
});

static DIRECTOR_V4: LazyLock<CastMap> = LazyLock::new(CastMap::director_v4);

/// Rectangle in stage coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub top: u16,
    pub left: u16,
    pub bottom: u16,
    pub right: u16,
}

impl Rect {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            top: record.get_u16("top")?,
            left: record.get_u16("left")?,
            bottom: record.get_u16("bottom")?,
            right: record.get_u16("right")?,
        })
    }

    pub fn width(&self) -> u16 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u16 {
        self.bottom.saturating_sub(self.top)
    }
}

/// Bitmap cast member detail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapCast {
    pub unknown1: u8,
    /// High nibble of the pitch word
    pub flags: u8,
    /// Bytes per row of the 1-bit image
    pub pitch: u16,
    pub initial_rect: Rect,
    pub bounding_rect: Rect,
    pub reg_x: u16,
    pub reg_y: u16,
    pub trailing: Vec<u8>,
}

impl BitmapCast {
    /// Decode a bitmap detail on its own, outside a `CASt` payload
    pub fn decode(detail: &[u8]) -> Result<Self> {
        Self::from_record(&BITMAP_SCHEMA.decode(detail, 0)?)
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            unknown1: record.get_u8("unknown1")?,
            flags: record.get_u8("flags")?,
            pitch: record.get_u16("pitch")?,
            initial_rect: Rect::from_record(record.record("initial_rect")?)?,
            bounding_rect: Rect::from_record(record.record("bounding_rect")?)?,
            reg_x: record.get_u16("reg_x")?,
            reg_y: record.get_u16("reg_y")?,
            trailing: record.bytes("trailing")?.to_vec(),
        })
    }
}

/// Type-specific part of a cast member
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CastDetail {
    Bitmap(BitmapCast),
    /// No decoder for this discriminant; raw detail bytes
    Unknown(Vec<u8>),
}

/// Decoded `CASt` chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastRecord {
    pub size1: u16,
    pub size2: u32,
    /// Raw type byte
    pub discriminant: u8,
    /// `None` for discriminants outside the known set
    pub cast_type: Option<CastType>,
    pub detail: CastDetail,
}

impl CastRecord {
    pub fn bitmap(&self) -> Option<&BitmapCast> {
        match &self.detail {
            CastDetail::Bitmap(bitmap) => Some(bitmap),
            CastDetail::Unknown(_) => None,
        }
    }
}

/// Builds the typed detail from a record decoded with its layout
pub type CastBuilder = fn(&Record) -> Result<CastDetail>;

#[derive(Debug, Clone, Copy)]
struct CastLayout {
    schema: &'static Schema,
    build: CastBuilder,
}

/// Discriminant to detail layout mapping for one format version
#[derive(Debug, Clone, Default)]
pub struct CastMap {
    layouts: HashMap<u8, CastLayout>,
}

impl CastMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layouts for Director v4 movies
    pub fn director_v4() -> Self {
        let mut map = Self::new();
        map.register(CastType::Bitmap as u8, &BITMAP_SCHEMA, |body| {
            BitmapCast::from_record(body).map(CastDetail::Bitmap)
        });
        map
    }

    /// Lay out `discriminant` details with `schema` and type them with `build`
    pub fn register(&mut self, discriminant: u8, schema: &'static Schema, build: CastBuilder) {
        self.layouts.insert(discriminant, CastLayout { schema, build });
    }

    pub fn contains(&self, discriminant: u8) -> bool {
        self.layouts.contains_key(&discriminant)
    }

    /// Decode a whole `CASt` payload
    pub fn decode(&self, payload: &[u8]) -> Result<CastRecord> {
        let record = CAST_SCHEMA.decode_variants(payload, 0, self)?;
        let discriminant = record.get_u8("cast_type")?;

        let detail = match (record.get("detail"), self.layouts.get(&discriminant)) {
            (Some(Value::Record(body)), Some(layout)) => (layout.build)(body)?,
            (Some(Value::Bytes(raw)), _) => {
                debug!(discriminant, len = raw.len(), "no layout for cast type");
                CastDetail::Unknown(raw.clone())
            }
            _ => {
                return Err(SchemaError::TypeMismatch {
                    record: "CASt",
                    field: "detail",
                    expected: "a cast detail",
                }
                .into());
            }
        };

        Ok(CastRecord {
            size1: record.get_u16("size1")?,
            size2: record.get_u32("size2")?,
            discriminant,
            cast_type: CastType::from_u8(discriminant),
            detail,
        })
    }
}

impl Variants for CastMap {
    fn schema(&self, key: u64) -> Option<&'static Schema> {
        let discriminant = u8::try_from(key).ok()?;
        self.layouts.get(&discriminant).map(|layout| layout.schema)
    }
}

/// Decode a `CASt` payload with the Director v4 cast map
pub fn decode_cast(payload: &[u8]) -> Result<CastRecord> {
    DIRECTOR_V4.decode(payload)
}
