//! Foundation types for the Led off-heap record store.
//!
//! Every other Led crate depends on `led-types`. Nothing here touches
//! memory or files beyond reading a configuration document.
//!
//! # Key Types
//!
//! - [`ByteOrder`]: byte order used for record storage and bit addressing
//! - [`Fingerprint`]: opaque 128-bit schema layout identifier
//! - [`Compression`]: payload codec selection for Led files
//! - [`LedConfig`]: explicit configuration threaded through writers, readers and allocators

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod order;

pub use config::{Compression, LedConfig};
pub use error::TypeError;
pub use fingerprint::Fingerprint;
pub use order::ByteOrder;
