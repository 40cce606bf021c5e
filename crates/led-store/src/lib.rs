//! Memory regions and bit-level access for Led records.
//!
//! A [`ByteStore`] is a bounds-checked window onto a shared memory region.
//! Regions live in an arena keyed by `(region id, generation)`: releasing or
//! recycling a region bumps its generation, and every view cut at an older
//! generation fails with [`StoreError::Released`] instead of reading memory
//! that may already belong to someone else.
//!
//! A [`BitBuffer`] layers typed bit-field access on one store. The window
//! arithmetic it relies on is the pure function [`bit_window`].
//!
//! # Backings
//!
//! - managed: a heap `Vec<u8>`
//! - native: an anonymous memory mapping, for regions allocated outside the heap
//! - mapped: a read-only file mapping
//! - empty: the zero-length sentinel

pub mod bits;
pub mod error;
pub mod store;
pub mod window;

pub use bits::BitBuffer;
pub use error::{StoreError, StoreResult};
pub use store::{ByteStore, StoreKind};
pub use window::{bit_window, BitWindow};
