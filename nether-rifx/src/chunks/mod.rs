//! Typed decoders for the Director v4 chunk types

pub mod cast;
pub mod key;
pub mod mmap;
pub mod sord;

pub use cast::{BitmapCast, CastDetail, CastMap, CastRecord, CastType, Rect, decode_cast};
pub use key::{KeyEntry, KeyTable};
pub use mmap::{MapEntry, MemoryMap, Slot, UNUSED_SENTINEL};
pub use sord::ScoreOrder;
