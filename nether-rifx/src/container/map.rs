//! Per-version tag to decoder mapping

use hashbrown::HashMap;
use tracing::{debug, trace};

use super::{Chunk, ChunkBody, ChunkHeader, RifxContainer, walk};
use crate::chunks::{KeyTable, MemoryMap, ScoreOrder, decode_cast};
use crate::error::{Corruption, Result};
use crate::field::bytes_at;
use crate::tag::Tag;

/// A chunk being decoded
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// The whole source buffer; header offsets index into it
    pub bytes: &'a [u8],
    pub header: ChunkHeader,
    /// Number of enclosing nested containers
    pub depth: usize,
    pub max_nesting: usize,
}

impl<'a> Frame<'a> {
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[self.header.payload_range()]
    }
}

pub type ChunkDecoder = fn(&ChunkMap, &Frame<'_>) -> Result<ChunkBody>;

/// Decoders for the chunk tags of one container version
///
/// Tags without a decoder come back as [`ChunkBody::Opaque`].
#[derive(Debug, Clone, Default)]
pub struct ChunkMap {
    decoders: HashMap<Tag, ChunkDecoder>,
}

impl ChunkMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// `mmap`, `KEY*`, `Sord`, `CASt` and nested `RIFX`
    pub fn director_v4() -> Self {
        let mut map = Self::new();
        map.register(Tag::MMAP, |_, frame| {
            MemoryMap::decode(frame.payload()).map(ChunkBody::MemoryMap)
        });
        map.register(Tag::KEY, |_, frame| {
            KeyTable::decode(frame.payload()).map(ChunkBody::KeyTable)
        });
        map.register(Tag::SORD, |_, frame| {
            ScoreOrder::decode(frame.payload()).map(ChunkBody::ScoreOrder)
        });
        map.register(Tag::CAST, |_, frame| {
            decode_cast(frame.payload()).map(ChunkBody::Cast)
        });
        map.register(Tag::RIFX, decode_container);
        map
    }

    pub fn register(&mut self, tag: Tag, decoder: ChunkDecoder) {
        self.decoders.insert(tag, decoder);
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.decoders.contains_key(&tag)
    }

    /// Decode the chunk described by `frame`
    pub fn decode(&self, frame: &Frame<'_>) -> Result<Chunk> {
        let header = frame.header;
        let body = match self.decoders.get(&header.tag) {
            Some(decoder) => decoder(self, frame)?,
            None => {
                debug!(tag = %header.tag, offset = header.offset, "no decoder for chunk tag");
                ChunkBody::Opaque
            }
        };

        trace!(tag = %header.tag, offset = header.offset, length = header.length, "decoded chunk");

        Ok(Chunk {
            tag: header.tag,
            offset: header.offset,
            length: header.length,
            payload: frame.payload().to_vec(),
            body,
        })
    }
}

/// Nested `RIFX`: form type, then a chunk stream walked with the same map
fn decode_container(map: &ChunkMap, frame: &Frame<'_>) -> Result<ChunkBody> {
    if frame.depth >= frame.max_nesting {
        return Err(Corruption::NestingTooDeep {
            limit: frame.max_nesting,
        }
        .into());
    }

    let range = frame.header.payload_range();
    let form = bytes_at(frame.payload(), 0, 4)?;
    let form = Tag([form[0], form[1], form[2], form[3]]);

    let chunks = walk(frame.bytes, range.start + 4..range.end)
        .map(|header| {
            let child = Frame {
                bytes: frame.bytes,
                header: header?,
                depth: frame.depth + 1,
                max_nesting: frame.max_nesting,
            };
            map.decode(&child)
        })
        .collect::<Vec<_>>();

    debug!(form = %form, depth = frame.depth + 1, chunks = chunks.len(), "walked nested container");

    Ok(ChunkBody::Container(RifxContainer { form, chunks }))
}
