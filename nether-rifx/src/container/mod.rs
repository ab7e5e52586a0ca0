//! Tagged, length-prefixed chunk streams
//!
//! A RIFX stream is a run of chunks, each an 8-byte header (4-byte tag,
//! big-endian u32 length) followed by `length` payload bytes and a pad byte
//! when the length is odd. [`walk`] iterates the headers of such a stream;
//! [`ChunkMap`] turns a header into a typed [`Chunk`]; [`Resolver`] ties the
//! two together with the `mmap` index for random access.

use std::ops::Range;

use tracing::{trace, warn};

use crate::chunks::{CastRecord, KeyTable, MemoryMap, ScoreOrder};
use crate::error::{Corruption, Result};
use crate::field::{self, Endian, Width};
use crate::tag::Tag;

mod map;
mod resolver;

pub use map::{ChunkDecoder, ChunkMap, Frame};
pub use resolver::Resolver;

/// Tag plus length
pub const CHUNK_HEADER_LEN: usize = 8;

/// Location of one chunk in the source buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub tag: Tag,
    /// Absolute offset of the header
    pub offset: usize,
    /// Payload length
    pub length: usize,
}

impl ChunkHeader {
    pub fn payload_range(&self) -> Range<usize> {
        let start = self.offset + CHUNK_HEADER_LEN;
        start..start + self.length
    }

    /// Offset of whatever follows this chunk, pad byte included
    pub fn next_offset(&self) -> usize {
        self.payload_range().end + (self.length & 1)
    }
}

/// Read the chunk header at `offset`
///
/// The declared length must fit in `bytes`; a chunk that claims more than
/// what remains is corrupt.
pub fn read_header(bytes: &[u8], offset: usize) -> Result<ChunkHeader> {
    if bytes.len().saturating_sub(offset) < CHUNK_HEADER_LEN {
        return Err(Corruption::TruncatedHeader { offset }.into());
    }

    let tag = Tag::from_u32(field::decode(bytes, offset, Width::U32, Endian::Big)? as u32);
    let length = field::decode(bytes, offset + 4, Width::U32, Endian::Big)? as usize;
    let available = bytes.len() - offset - CHUNK_HEADER_LEN;
    if length > available {
        return Err(Corruption::ChunkOverrun {
            tag,
            offset,
            declared: length,
            available,
        }
        .into());
    }

    Ok(ChunkHeader {
        tag,
        offset,
        length,
    })
}

/// Iterator over the chunk headers of a stream
///
/// Stops after the first error.
pub struct Walk<'a> {
    bytes: &'a [u8],
    pos: usize,
    failed: bool,
}

impl Iterator for Walk<'_> {
    type Item = Result<ChunkHeader>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.bytes.len() {
            return None;
        }

        match read_header(self.bytes, self.pos) {
            Ok(header) => {
                trace!(
                    tag = %header.tag,
                    offset = header.offset,
                    length = header.length,
                    "chunk"
                );
                // A missing pad byte at the very end is tolerated
                self.pos = header.next_offset().min(self.bytes.len());
                Some(Ok(header))
            }
            Err(e) => {
                warn!(offset = self.pos, error = %e, "chunk stream ends in a corrupt header");
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Walk the chunks in `range` of `bytes`
///
/// Header offsets stay absolute within `bytes`, and no chunk may extend past
/// `range.end`.
pub fn walk(bytes: &[u8], range: Range<usize>) -> Walk<'_> {
    let end = range.end.min(bytes.len());
    Walk {
        bytes: &bytes[..end],
        pos: range.start.min(end),
        failed: false,
    }
}

/// Nested container: form type plus its own chunk stream
///
/// Each child decodes on its own; a failed child does not affect its siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RifxContainer {
    pub form: Tag,
    pub chunks: Vec<Result<Chunk>>,
}

/// Typed chunk contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkBody {
    MemoryMap(MemoryMap),
    KeyTable(KeyTable),
    ScoreOrder(ScoreOrder),
    Cast(CastRecord),
    Container(RifxContainer),
    /// Free or junk index slot; nothing was read
    Vacant,
    /// No decoder for this tag; see [`Chunk::payload`]
    Opaque,
}

/// A decoded chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub tag: Tag,
    /// Absolute offset of the chunk header
    pub offset: usize,
    pub length: usize,
    pub payload: Vec<u8>,
    pub body: ChunkBody,
}

impl Chunk {
    pub fn cast(&self) -> Option<&CastRecord> {
        match &self.body {
            ChunkBody::Cast(cast) => Some(cast),
            _ => None,
        }
    }

    pub fn container(&self) -> Option<&RifxContainer> {
        match &self.body {
            ChunkBody::Container(container) => Some(container),
            _ => None,
        }
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self.body, ChunkBody::Opaque)
    }
}
