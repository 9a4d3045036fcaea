//! Leaf-level helpers shared by every other layer: hex/base64 codecs,
//! constant-time comparison, a bounded LRU map wrapper, and secure wipe.
//!
//! Nothing in this module holds secret state; it exists so higher layers
//! don't each reinvent "compare without early return" or "evict at N
//! entries".

pub mod constant_time;
pub mod encoding;
pub mod lru_map;
pub mod wipe;

pub use constant_time::{eq_32, eq_64, eq_slices};
pub use encoding::{from_base64, from_hex, is_hex, to_base64, to_hex};
pub use lru_map::BoundedMap;
pub use wipe::wipe_bytes;
