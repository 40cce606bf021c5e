//! Record allocators for Led.
//!
//! Allocators carve fixed-size records out of [`ByteStore`]s under one of two
//! disciplines:
//!
//! - **stack**: a bump pointer with single-step undo ([`StackAllocator`],
//!   and the auto-growing [`StackListAllocator`]). Thread-safe through an
//!   internal mutex.
//! - **indexed**: records addressed by position ([`ManagedIndexedAllocator`],
//!   [`ArrayIndexedAllocator`], [`ListIndexedAllocator`],
//!   [`UnmanagedIndexedAllocator`]). Not internally synchronized.
//!
//! Only [`ListIndexedAllocator`] reuses freed positions. Clearing an
//! allocator recycles its regions, so records handed out before the clear
//! fail with [`StoreError::Released`] instead of aliasing new records.
//!
//! [`ByteStore`]: led_store::ByteStore
//! [`StoreError::Released`]: led_store::StoreError::Released

pub mod allocator;
pub mod array;
pub mod error;
pub mod list;
pub mod managed;
pub mod stack;
pub mod stack_list;
pub mod unmanaged;

pub use allocator::{Allocator, IndexedAllocator, RecordOf};
pub use array::ArrayIndexedAllocator;
pub use error::{AllocError, AllocResult};
pub use list::ListIndexedAllocator;
pub use managed::ManagedIndexedAllocator;
pub use stack::StackAllocator;
pub use stack_list::StackListAllocator;
pub use unmanaged::UnmanagedIndexedAllocator;
