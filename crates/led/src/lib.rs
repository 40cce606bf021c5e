//! Led: fixed-schema records stored outside the managed heap.
//!
//! Records are bit-packed views over shared memory regions
//! ([`ByteStore`]), handed out by allocators, combined as sorted
//! [`LedStream`]s, written to and read from compact files, and sorted
//! externally when they do not fit in memory.
//!
//! This crate re-exports the public API of the `led-*` crates and adds
//! [`LedFiles`], which bundles a record descriptor with its configuration.
//!
//! ```no_run
//! use led::prelude::*;
//!
//! # fn main() -> led::LedResult<()> {
//! let point = LayoutBuilder::new("point").int("x", 20).int("y", 20).build()?;
//! let files = LedFiles::new(point.clone());
//!
//! let mut builder = files.sorting_builder();
//! let mut record = point.view(ByteStore::managed(point.size(), ByteOrder::Little));
//! for (id, x) in [(3, 30), (1, 10), (2, 20)] {
//!     record.set_id(id)?;
//!     record.set_int("x", x)?;
//!     builder.append(&record)?;
//! }
//! let led = builder.build()?;
//! files.write("points.led", led.into_stream())?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod files;

#[cfg(test)]
mod scenarios;

pub use error::{LedError, LedResult};
pub use files::LedFiles;

pub use led_alloc::{
    AllocError, Allocator, ArrayIndexedAllocator, IndexedAllocator, ListIndexedAllocator,
    ManagedIndexedAllocator, RecordOf, StackAllocator, StackListAllocator,
    UnmanagedIndexedAllocator,
};
pub use led_format::{
    decode_parallel, read_parallel, FormatError, LedHeader, LedReader, LedWriter, LoadedLed,
    HEADER_SIZE, UNKNOWN_COUNT,
};
pub use led_schema::{
    Field, FieldKind, IdRecord, IdSchema, Layout, LayoutBuilder, LayoutSchema, Record, Schema,
    SchemaDescriptor, SchemaError,
};
pub use led_sort::{
    verify_sorted, ExternalMergeSort, SortConfig, SortError, SortReport, SortingLedBuilder,
    SpillingLedBuilder,
};
pub use led_store::{bit_window, BitBuffer, BitWindow, ByteStore, StoreError, StoreKind};
pub use led_stream::{
    empty, from_iter, from_vec, ids, sorted_ids, ArrayLed, BoxedStream, IdCursor, IndexedLed,
    Led, LedStream, StreamError,
};
pub use led_types::{ByteOrder, Compression, Fingerprint, LedConfig, TypeError};

/// The traits and types most programs need.
pub mod prelude {
    pub use crate::{LedError, LedFiles, LedResult};
    pub use led_alloc::{Allocator, IndexedAllocator};
    pub use led_schema::{LayoutBuilder, Schema, SchemaDescriptor};
    pub use led_sort::SortConfig;
    pub use led_store::ByteStore;
    pub use led_stream::{ids, sorted_ids, Led, LedStream};
    pub use led_types::{ByteOrder, Compression, LedConfig};
}
