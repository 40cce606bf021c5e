//! Sorted record streams for Led.
//!
//! A [`LedStream`] is a lazy, forward-only sequence of records in
//! non-decreasing `id` order. Every combinator assumes sorted input and
//! preserves the order in its output; none of them removes duplicate ids.
//!
//! # Combinators
//!
//! - [`filter`](LedStream::filter), [`peek`](LedStream::peek): passthroughs
//! - [`map`](LedStream::map): one new record per input, from an allocator
//! - [`merge`](LedStream::merge), [`merge_all`](LedStream::merge_all):
//!   ordered union, ties to the earlier input
//! - [`remove_all`](LedStream::remove_all), [`retain_all`](LedStream::retain_all):
//!   difference and intersection by id against an [`IdCursor`]
//! - [`checked`](LedStream::checked): fails on a decreasing id
//!
//! A [`Led`] is the random-access counterpart: a finite sorted collection,
//! held in a `Vec` ([`ArrayLed`]) or an indexed allocator ([`IndexedLed`]).

pub mod error;
pub mod led;
pub mod merge;
pub mod ops;
pub mod set_ops;
pub mod source;
pub mod stream;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{StreamError, StreamResult};
pub use led::{ArrayLed, IndexedLed, Led, LedCursor};
pub use merge::{Merge, MergeAll};
pub use ops::{Checked, Filter, Map, Peek};
pub use set_ops::{ids, sorted_ids, IdCursor, RemoveAll, RetainAll, SortedIds, StreamIds};
pub use source::{empty, from_iter, from_vec, IterStream};
pub use stream::{BoxedStream, LedStream, Records};
