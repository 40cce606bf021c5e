//! The Led file format.
//!
//! A Led file is a 32-byte big-endian [`LedHeader`] followed by
//! `element_count` records of `element_size` bytes each, stored raw or as a
//! zstd stream. Which codec a file uses is chosen by the caller through
//! [`LedConfig::compression`](led_types::LedConfig); the header does not
//! record it.
//!
//! ```text
//! [element_count: i64][element_size: i64][fp_high: i64][fp_low: i64][payload...]
//! ```
//!
//! [`LedWriter`] streams records out in batches and patches the record count
//! into the header when it was not known up front. [`LedReader`] is a
//! [`LedStream`](led_stream::LedStream) that decodes one batch at a time;
//! [`load`], [`map_file`] and [`decode_parallel`] cover whole-file access.

pub(crate) mod codec;
pub mod error;
pub mod header;
pub mod load;
pub mod reader;
pub mod writer;

pub use error::{FormatError, FormatResult};
pub use header::{LedHeader, HEADER_SIZE, UNKNOWN_COUNT};
pub use load::{decode_parallel, load, map_file, read_parallel, LoadedLed};
pub use reader::LedReader;
pub use writer::LedWriter;
