use led_schema::SchemaDescriptor;
use led_store::ByteStore;
use led_types::LedConfig;
use tracing::trace;

use crate::allocator::{Allocator, IndexedAllocator};
use crate::error::AllocResult;
use crate::managed::Contiguous;

/// The managed indexed contract over a native anonymous mapping, for regions
/// larger than a heap buffer should hold.
///
/// The mapping is released by [`free`](Allocator::free) or when the
/// allocator is dropped, whichever comes first. Records outliving the
/// release fail on access.
pub struct UnmanagedIndexedAllocator<D: SchemaDescriptor> {
    inner: Contiguous<D>,
}

impl<D: SchemaDescriptor> UnmanagedIndexedAllocator<D> {
    pub fn new(descriptor: D, capacity: usize, config: &LedConfig) -> AllocResult<Self> {
        let store = ByteStore::native(capacity * descriptor.size(), config.byte_order)?;
        trace!(
            schema = descriptor.name(),
            bytes = store.len(),
            "native region mapped"
        );
        Ok(Self {
            inner: Contiguous::new(descriptor, store),
        })
    }

    pub fn store(&self) -> &ByteStore {
        self.inner.store()
    }

    pub fn is_freed(&self) -> bool {
        self.inner.is_freed()
    }
}

impl<D: SchemaDescriptor> Allocator for UnmanagedIndexedAllocator<D> {
    type Descriptor = D;

    fn descriptor(&self) -> &D {
        self.inner.descriptor()
    }

    fn malloc(&mut self) -> AllocResult<D::Record> {
        self.inner.malloc()
    }

    fn free(&mut self) {
        self.inner.free()
    }
}

impl<D: SchemaDescriptor> IndexedAllocator for UnmanagedIndexedAllocator<D> {
    fn malloc_at(&mut self, index: usize) -> AllocResult<D::Record> {
        self.inner.malloc_at(index)
    }

    fn get(&self, index: usize) -> AllocResult<D::Record> {
        self.inner.get(index)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    fn clear(&mut self) -> AllocResult<()> {
        self.inner.clear()
    }
}

impl<D: SchemaDescriptor> Drop for UnmanagedIndexedAllocator<D> {
    fn drop(&mut self) {
        self.inner.free();
    }
}
