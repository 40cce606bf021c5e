//! Sorting Led files and building sorted collections.
//!
//! [`ExternalMergeSort`] sorts files larger than memory: it spills sorted
//! chunks of [`SortConfig::records_in_memory`] records into a temporary
//! directory and merges them pairwise into the destination.
//!
//! Two builders collect records in arbitrary order:
//!
//! - [`SortingLedBuilder`] keeps everything in memory and sorts on `build`.
//! - [`SpillingLedBuilder`] spills to disk like the external sort and can be
//!   fed from many threads at once.

mod chunk;
pub mod builder;
pub mod config;
pub mod error;
pub mod sort;

pub use builder::{SortingLedBuilder, SpillingLedBuilder};
pub use chunk::verify_sorted;
pub use config::{SortConfig, DEFAULT_RECORDS_IN_MEMORY};
pub use error::{SortError, SortResult};
pub use sort::{ExternalMergeSort, SortReport};
