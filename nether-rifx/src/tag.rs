//! Four-character chunk tags

use std::fmt;

/// A 4-byte chunk tag such as `RIFX`, `mmap` or `CASt`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    pub const RIFX: Tag = Tag(*b"RIFX");
    pub const MMAP: Tag = Tag(*b"mmap");
    pub const KEY: Tag = Tag(*b"KEY*");
    pub const SORD: Tag = Tag(*b"Sord");
    pub const CAST: Tag = Tag(*b"CASt");
    pub const BITD: Tag = Tag(*b"BITD");
    pub const FREE: Tag = Tag(*b"free");
    pub const JUNK: Tag = Tag(*b"junk");

    /// Tag stored as a big-endian integer (as index tables do)
    pub fn from_u32(value: u32) -> Self {
        Self(value.to_be_bytes())
    }

    pub fn to_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Index slots with these tags hold no chunk
    pub fn is_vacant(self) -> bool {
        self == Self::FREE || self == Self::JUNK
    }
}

impl From<&[u8; 4]> for Tag {
    fn from(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self)
    }
}
