//! Record schemas for Led.
//!
//! A record is a fixed-size, bit-packed view over a [`ByteStore`] slice whose
//! first eight bytes hold the signed 64-bit `id` every Led is ordered by.
//!
//! - [`Schema`]: the view itself (field access goes through its [`BitBuffer`])
//! - [`SchemaDescriptor`]: size, fingerprint and view factory for one record
//!   type; the value allocators and readers are handed
//! - [`LayoutBuilder`]: declares bit-packed fields at runtime and derives the
//!   layout fingerprint, producing a [`LayoutSchema`] whose views are
//!   dynamic [`Record`]s
//! - [`IdSchema`]: the minimal id-only record
//!
//! [`ByteStore`]: led_store::ByteStore
//! [`BitBuffer`]: led_store::BitBuffer

pub mod error;
pub mod id;
pub mod layout;
pub mod record;
pub mod schema;

pub use error::{SchemaError, SchemaResult};
pub use id::{IdRecord, IdSchema};
pub use layout::{Field, FieldKind, Layout, LayoutBuilder, LayoutSchema};
pub use record::Record;
pub use schema::{Schema, SchemaDescriptor, ID_SIZE};
