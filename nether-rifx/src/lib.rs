//! Nether-RIFX: chunk container resolver and record decoder for Director v4
//!
//! A Director movie is a big-endian RIFX container. Its `mmap` chunk indexes
//! every chunk by id, the optional `KEY*` chunk ties resource chunks (bitmaps,
//! sounds) to the cast member that owns them, and `CASt` chunks describe the
//! cast members themselves.
//!
//! # Layers
//!
//! | Module | Role |
//! |--------|------|
//! | [`field`] | fixed-width and bit-packed integer reads |
//! | [`schema`] | declarative record layouts with sibling-dependent fields |
//! | [`chunks`] | typed decoders for `mmap`, `KEY*`, `Sord` and `CASt` |
//! | [`container`] | chunk stream walking, tag dispatch and the [`Resolver`] |
//! | [`image`] | 1-bit bitmap cast pixels |
//!
//! Payloads of chunks nothing here understands are kept as opaque bytes, and
//! the codec transforms in `nether-codec` turn resource payloads into pixels
//! and PCM.
//!
//! # Usage
//!
//! ```no_run
//! use nether_rifx::{Resolver, ResolverConfig, Tag};
//!
//! let bytes = std::fs::read("movie.dir")?;
//! let resolver = Resolver::new(bytes, ResolverConfig::default())?;
//!
//! for (id, cast) in resolver.casts() {
//!     let Some(bitmap) = cast?.cast().and_then(|c| c.bitmap().cloned()) else {
//!         continue;
//!     };
//!     if let Some(bitd) = resolver.resource_for_cast(id, Tag::BITD)? {
//!         let image = bitmap.decode_monochrome(&bitd.payload)?;
//!         println!("cast {id}: {}x{}", image.width, image.height);
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod error;
mod tag;

pub mod chunks;
pub mod container;
pub mod field;
pub mod image;
pub mod projector;
pub mod schema;

pub use chunks::{CastRecord, CastType, decode_cast};
pub use config::ResolverConfig;
pub use container::{Chunk, ChunkBody, ChunkMap, Resolver};
pub use error::{Corruption, Result, RifxError, SchemaError};
pub use image::IndexedImage;
pub use projector::ProjectorHeader;
pub use tag::Tag;
