//! Random access to the chunks of a RIFX archive

use std::sync::{Arc, OnceLock};

use hashbrown::HashMap;
use tracing::{debug, info, warn};

use super::{CHUNK_HEADER_LEN, Chunk, ChunkBody, ChunkHeader, ChunkMap, Frame, read_header, walk};
use crate::chunks::{KeyEntry, KeyTable, MapEntry, MemoryMap, Slot};
use crate::config::ResolverConfig;
use crate::error::{Corruption, Result};
use crate::field::bytes_at;
use crate::projector::ProjectorHeader;
use crate::tag::Tag;

type CachedChunk = OnceLock<Result<Arc<Chunk>>>;

/// Resolves chunks of a RIFX archive by index id
///
/// Construction validates the root header, finds the `mmap` index and builds
/// the key association; chunks themselves decode lazily. With caching on,
/// each id decodes at most once and every caller shares the result,
/// failures included.
pub struct Resolver {
    bytes: Vec<u8>,
    config: ResolverConfig,
    map: ChunkMap,
    /// Root header; its payload bounds every chunk
    root: ChunkHeader,
    form: Tag,
    memory_map: MemoryMap,
    key_table: KeyTable,
    /// (owning cast id, resource tag) -> resource chunk id
    keys: HashMap<(u32, Tag), u32>,
    /// owning cast id -> positions in `key_table.entries`
    keys_by_cast: HashMap<u32, Vec<usize>>,
    cache: Vec<CachedChunk>,
}

impl Resolver {
    /// Resolve a bare RIFX archive
    pub fn new(bytes: Vec<u8>, config: ResolverConfig) -> Result<Self> {
        Self::with_map(bytes, 0, ChunkMap::director_v4(), config)
    }

    /// Resolve the RIFX archive embedded in a `PJ93` projector
    ///
    /// Chunk offsets stay absolute within `bytes`.
    pub fn from_projector(bytes: Vec<u8>, config: ResolverConfig) -> Result<Self> {
        let header = ProjectorHeader::decode(&bytes)?;
        if header.rifx_offset != header.rifx_offset_dup {
            warn!(
                rifx_offset = header.rifx_offset,
                rifx_offset_dup = header.rifx_offset_dup,
                "projector RIFX offsets disagree"
            );
        }
        Self::with_map(bytes, header.rifx_offset as usize, ChunkMap::director_v4(), config)
    }

    /// Resolve the archive whose root header is at `root_offset`, using `map`
    pub fn with_map(
        bytes: Vec<u8>,
        root_offset: usize,
        map: ChunkMap,
        config: ResolverConfig,
    ) -> Result<Self> {
        let (root, form) = read_root(&bytes, root_offset)?;
        let stream = root.payload_range().start + 4..root.payload_range().end;

        // The index is the first mmap in the top-level stream
        let mut index = None;
        for header in walk(&bytes, stream) {
            let header = header?;
            if header.tag == Tag::MMAP {
                index = Some(header);
                break;
            }
        }
        let index = index.ok_or(Corruption::MissingIndex)?;
        let memory_map = MemoryMap::decode(&bytes[index.payload_range()])?;

        info!(
            form = %form,
            entries_used = memory_map.entries_used,
            entries_max = memory_map.entries_max,
            "resolved RIFX index"
        );

        let mut resolver = Self {
            cache: (0..memory_map.entries.len()).map(|_| OnceLock::new()).collect(),
            bytes,
            config,
            map,
            root,
            form,
            memory_map,
            key_table: KeyTable::default(),
            keys: HashMap::new(),
            keys_by_cast: HashMap::new(),
        };
        resolver.index_keys();

        Ok(resolver)
    }

    fn index_keys(&mut self) {
        let Some(id) = self
            .memory_map
            .entries
            .iter()
            .position(|entry| entry.tag == Tag::KEY)
        else {
            debug!("archive has no KEY* table");
            return;
        };

        let table = match self.load(id as u32) {
            Ok(chunk) => match chunk.body {
                ChunkBody::KeyTable(table) => table,
                _ => return,
            },
            Err(e) => {
                warn!(id, error = %e, "KEY* table unreadable; cast resources will not resolve");
                return;
            }
        };

        for (position, entry) in table.entries.iter().enumerate() {
            self.keys
                .insert((entry.cast_index, entry.chunk_id), entry.section_index);
            self.keys_by_cast
                .entry(entry.cast_index)
                .or_default()
                .push(position);
        }
        debug!(entries = table.entries.len(), "indexed KEY* table");
        self.key_table = table;
    }

    /// Decode chunk `id`, bypassing the cache
    fn load(&self, id: u32) -> Result<Chunk> {
        let entry = *self.entry(id)?;

        if entry.tag.is_vacant() {
            return Ok(Chunk {
                tag: entry.tag,
                offset: entry.offset as usize,
                length: entry.length as usize,
                payload: Vec::new(),
                body: ChunkBody::Vacant,
            });
        }

        let bounded = &self.bytes[..self.root.payload_range().end];
        let header = read_header(bounded, entry.offset as usize)?;
        if header.tag != entry.tag {
            return Err(Corruption::TagMismatch {
                id,
                expected: entry.tag,
                found: header.tag,
            }
            .into());
        }
        if header.length != entry.length as usize {
            warn!(
                id,
                tag = %header.tag,
                index_length = entry.length,
                header_length = header.length,
                "index and chunk header disagree on length; using header"
            );
        }

        self.map.decode(&Frame {
            bytes: bounded,
            header,
            depth: 0,
            max_nesting: self.config.max_nesting,
        })
    }

    /// Chunk `id` in the `mmap` index
    pub fn chunk(&self, id: u32) -> Result<Arc<Chunk>> {
        let cell = self.cache.get(id as usize).ok_or(Corruption::ChunkIdOutOfRange {
            id,
            used: self.memory_map.entries_used,
        })?;

        if !self.config.cache_chunks {
            return self.load(id).map(Arc::new);
        }
        cell.get_or_init(|| self.load(id).map(Arc::new)).clone()
    }

    /// Live index entry `id`
    pub fn entry(&self, id: u32) -> Result<&MapEntry> {
        self.memory_map.entry(id).ok_or_else(|| {
            Corruption::ChunkIdOutOfRange {
                id,
                used: self.memory_map.entries_used,
            }
            .into()
        })
    }

    /// Index slot `id`, live or unused
    pub fn slot(&self, id: u32) -> Option<Slot<'_>> {
        self.memory_map.slot(id)
    }

    /// Ids of live entries with `tag`, in index order
    pub fn ids_tagged(&self, tag: Tag) -> impl Iterator<Item = u32> + '_ {
        self.memory_map
            .entries
            .iter()
            .enumerate()
            .filter(move |(_, entry)| entry.tag == tag)
            .map(|(id, _)| id as u32)
    }

    /// Every chunk with `tag`, each with its own result
    pub fn chunks_tagged(&self, tag: Tag) -> Vec<(u32, Result<Arc<Chunk>>)> {
        self.ids_tagged(tag).map(|id| (id, self.chunk(id))).collect()
    }

    /// Every `CASt` chunk
    pub fn casts(&self) -> Vec<(u32, Result<Arc<Chunk>>)> {
        self.chunks_tagged(Tag::CAST)
    }

    /// The `tag` resource owned by cast chunk `cast_id`, if the key table has one
    pub fn resource_for_cast(&self, cast_id: u32, tag: Tag) -> Result<Option<Arc<Chunk>>> {
        match self.keys.get(&(cast_id, tag)) {
            Some(&section) => self.chunk(section).map(Some),
            None => Ok(None),
        }
    }

    /// Key entries owned by cast chunk `cast_id`
    pub fn resources_of(&self, cast_id: u32) -> Vec<KeyEntry> {
        self.keys_by_cast
            .get(&cast_id)
            .map(|positions| {
                positions
                    .iter()
                    .map(|&p| self.key_table.entries[p])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Decode every live chunk; failures stay with their id
    pub fn decode_all(&self) -> Vec<(u32, Result<Arc<Chunk>>)> {
        (0..self.memory_map.entries.len() as u32)
            .map(|id| (id, self.chunk(id)))
            .collect()
    }

    /// Top-level chunks in file order, ignoring the index
    ///
    /// Stops after the first chunk whose header is corrupt.
    pub fn walk(&self) -> impl Iterator<Item = Result<Chunk>> + '_ {
        let bounded = &self.bytes[..self.root.payload_range().end];
        let stream = self.root.payload_range().start + 4..self.root.payload_range().end;
        walk(bounded, stream).map(move |header| {
            self.map.decode(&Frame {
                bytes: bounded,
                header: header?,
                depth: 0,
                max_nesting: self.config.max_nesting,
            })
        })
    }

    /// Form type of the root container, e.g. `MV93`
    pub fn form_type(&self) -> Tag {
        self.form
    }

    pub fn memory_map(&self) -> &MemoryMap {
        &self.memory_map
    }

    /// The `KEY*` table; empty when the archive has none
    pub fn key_table(&self) -> &KeyTable {
        &self.key_table
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Validate the outermost header
fn read_root(bytes: &[u8], offset: usize) -> Result<(ChunkHeader, Tag)> {
    let tag = bytes_at(bytes, offset, 4)
        .map_err(|_| Corruption::TruncatedHeader { offset })?;
    let tag = Tag([tag[0], tag[1], tag[2], tag[3]]);
    if tag != Tag::RIFX {
        return Err(Corruption::InvalidRoot { found: tag }.into());
    }

    let root = read_header(bytes, offset)?;
    if root.length < 4 {
        return Err(Corruption::TruncatedHeader { offset }.into());
    }
    let form = &bytes[offset + CHUNK_HEADER_LEN..offset + CHUNK_HEADER_LEN + 4];

    Ok((root, Tag([form[0], form[1], form[2], form[3]])))
}
