use led_schema::{Schema, SchemaDescriptor};

use crate::error::AllocResult;

/// Record type handed out by allocator `A`.
pub type RecordOf<A> = <<A as Allocator>::Descriptor as SchemaDescriptor>::Record;

/// Common contract of every record allocator.
pub trait Allocator {
    type Descriptor: SchemaDescriptor;

    /// The record type this allocator builds views for.
    fn descriptor(&self) -> &Self::Descriptor;

    /// Bytes per record.
    fn schema_size(&self) -> usize {
        self.descriptor().size()
    }

    /// A new record whose bytes are whatever the slot last held.
    fn malloc(&mut self) -> AllocResult<RecordOf<Self>>;

    /// A new zero-filled record.
    fn calloc(&mut self) -> AllocResult<RecordOf<Self>> {
        let record = self.malloc()?;
        record.store().fill(0)?;
        Ok(record)
    }

    /// Release every backing store. Idempotent; records handed out earlier
    /// fail afterwards.
    fn free(&mut self);
}

impl<A: Allocator + ?Sized> Allocator for &mut A {
    type Descriptor = A::Descriptor;

    fn descriptor(&self) -> &Self::Descriptor {
        (**self).descriptor()
    }

    fn malloc(&mut self) -> AllocResult<RecordOf<Self>> {
        (**self).malloc()
    }

    fn calloc(&mut self) -> AllocResult<RecordOf<Self>> {
        (**self).calloc()
    }

    fn free(&mut self) {
        (**self).free()
    }
}

/// Allocators whose records are addressed by position.
pub trait IndexedAllocator: Allocator {
    /// Record at `index`, extending the logical length to cover it.
    fn malloc_at(&mut self, index: usize) -> AllocResult<RecordOf<Self>>;

    /// Existing record at `index`; fails past the logical length.
    fn get(&self, index: usize) -> AllocResult<RecordOf<Self>>;

    /// Logical length: one past the highest allocated index.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records addressable without growing.
    fn capacity(&self) -> usize;

    /// Forget every record while keeping the memory.
    fn clear(&mut self) -> AllocResult<()>;
}
