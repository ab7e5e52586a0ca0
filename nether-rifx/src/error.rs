//! Error types for container resolution and record decoding

use nether_codec::CodecError;
use thiserror::Error;

use crate::tag::Tag;

/// Errors raised while resolving a container or decoding its records
///
/// Unknown chunk tags and cast discriminants are not errors; they decode to
/// opaque variants instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RifxError {
    /// A constant-checked field holds the wrong value
    #[error("format violation in {record}.{field}: expected {expected}, found {found}")]
    FormatViolation {
        record: &'static str,
        field: &'static str,
        expected: String,
        found: String,
    },

    /// The container structure cannot be trusted
    #[error("container corrupt: {0}")]
    ContainerCorrupt(#[from] Corruption),

    /// A field read ran past the end of its record's bytes
    #[error("unexpected end of data at offset {offset:#x} (need {need} bytes, have {have})")]
    UnexpectedEof {
        offset: usize,
        need: usize,
        have: usize,
    },

    /// Schema definition or field access error
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A codec transform failed on a resource payload
    #[error("decode error: {0}")]
    Decode(#[from] CodecError),

    /// Resolver configuration could not be parsed
    #[error("invalid resolver config: {0}")]
    Config(String),
}

/// Ways a container can be corrupt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Corruption {
    #[error("expected RIFX root, found {found}")]
    InvalidRoot { found: Tag },

    #[error("truncated chunk header at offset {offset:#x}")]
    TruncatedHeader { offset: usize },

    #[error("chunk {tag} at offset {offset:#x} declares {declared} bytes but only {available} remain")]
    ChunkOverrun {
        tag: Tag,
        offset: usize,
        declared: usize,
        available: usize,
    },

    #[error("mandatory mmap index chunk is missing")]
    MissingIndex,

    #[error("mmap declares {used} used entries but only {max} slots")]
    IndexOverflow { used: u32, max: u32 },

    #[error("chunk id {id} out of range ({used} live index entries)")]
    ChunkIdOutOfRange { id: u32, used: u32 },

    #[error("chunk id {id} is indexed as {expected} but the file holds {found}")]
    TagMismatch { id: u32, expected: Tag, found: Tag },

    #[error("containers nested deeper than {limit} levels")]
    NestingTooDeep { limit: usize },
}

/// Schema construction and record access errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("schema {schema}: field {field} declared twice")]
    DuplicateField {
        schema: &'static str,
        field: &'static str,
    },

    #[error("schema {schema}: field {field} references undeclared field {reference}")]
    UnknownReference {
        schema: &'static str,
        field: &'static str,
        reference: &'static str,
    },

    #[error("schema {schema}: cyclic field dependency between {fields:?}")]
    Cycle {
        schema: &'static str,
        fields: Vec<&'static str>,
    },

    #[error("schema {schema}: field {field} nests {nested}, which runs to the end of the buffer")]
    Unbounded {
        schema: &'static str,
        field: &'static str,
        nested: &'static str,
    },

    #[error("record {record} has no field {field}")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },

    #[error("record {record}: field {field} is not {expected}")]
    TypeMismatch {
        record: &'static str,
        field: &'static str,
        expected: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, RifxError>;
