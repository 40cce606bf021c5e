use led_schema::SchemaDescriptor;
use led_store::ByteStore;
use led_types::LedConfig;

use crate::allocator::{Allocator, IndexedAllocator};
use crate::error::{AllocError, AllocResult};

/// Fixed-capacity indexed records over one contiguous store. Shared by the
/// managed and unmanaged allocators, which differ only in backing memory.
pub(crate) struct Contiguous<D: SchemaDescriptor> {
    descriptor: D,
    store: ByteStore,
    capacity: usize,
    len: usize,
    freed: bool,
}

impl<D: SchemaDescriptor> Contiguous<D> {
    pub(crate) fn new(descriptor: D, store: ByteStore) -> Self {
        let capacity = store.len() / descriptor.size();
        Self {
            descriptor,
            store,
            capacity,
            len: 0,
            freed: false,
        }
    }

    pub(crate) fn descriptor(&self) -> &D {
        &self.descriptor
    }

    pub(crate) fn store(&self) -> &ByteStore {
        &self.store
    }

    fn view(&self, index: usize) -> AllocResult<D::Record> {
        if self.freed {
            return Err(AllocError::Freed);
        }
        let size = self.descriptor.size();
        Ok(self.descriptor.view(self.store.slice(index * size, size)?))
    }

    pub(crate) fn malloc(&mut self) -> AllocResult<D::Record> {
        if self.len == self.capacity {
            return Err(AllocError::Overflow {
                capacity: self.capacity,
            });
        }
        self.malloc_at(self.len)
    }

    pub(crate) fn malloc_at(&mut self, index: usize) -> AllocResult<D::Record> {
        if index >= self.capacity {
            return Err(AllocError::IndexOutOfBounds {
                index,
                len: self.capacity,
            });
        }
        let record = self.view(index)?;
        self.len = self.len.max(index + 1);
        Ok(record)
    }

    pub(crate) fn get(&self, index: usize) -> AllocResult<D::Record> {
        if index >= self.len {
            return Err(AllocError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        self.view(index)
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn clear(&mut self) -> AllocResult<()> {
        if self.freed {
            return Err(AllocError::Freed);
        }
        self.store.recycle()?;
        self.len = 0;
        Ok(())
    }

    pub(crate) fn free(&mut self) {
        if !self.freed {
            self.store.free();
            self.freed = true;
            self.len = 0;
        }
    }

    pub(crate) fn is_freed(&self) -> bool {
        self.freed
    }
}

/// Indexed allocator over one preallocated heap store of
/// `capacity * record size` bytes. `malloc_at` is a single multiplication;
/// there is no free list and capacity never changes.
pub struct ManagedIndexedAllocator<D: SchemaDescriptor> {
    inner: Contiguous<D>,
}

impl<D: SchemaDescriptor> ManagedIndexedAllocator<D> {
    pub fn new(descriptor: D, capacity: usize, config: &LedConfig) -> Self {
        let store = ByteStore::managed(capacity * descriptor.size(), config.byte_order);
        Self {
            inner: Contiguous::new(descriptor, store),
        }
    }

    /// The whole backing store, for bulk copies.
    pub fn store(&self) -> &ByteStore {
        self.inner.store()
    }

    pub fn is_freed(&self) -> bool {
        self.inner.is_freed()
    }
}

impl<D: SchemaDescriptor> Allocator for ManagedIndexedAllocator<D> {
    type Descriptor = D;

    fn descriptor(&self) -> &D {
        self.inner.descriptor()
    }

    /// The record after the highest allocated index.
    fn malloc(&mut self) -> AllocResult<D::Record> {
        self.inner.malloc()
    }

    fn free(&mut self) {
        self.inner.free()
    }
}

impl<D: SchemaDescriptor> IndexedAllocator for ManagedIndexedAllocator<D> {
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

#[cfg(test)]
mod tests {
    use led_schema::{IdSchema, LayoutBuilder, Schema};

    use super::*;

    fn managed(capacity: usize) -> ManagedIndexedAllocator<IdSchema> {
        ManagedIndexedAllocator::new(IdSchema, capacity, &LedConfig::default())
    }

    #[test]
    fn malloc_at_is_positional() {
        let mut a = managed(10);
        let mut r = a.malloc_at(7).unwrap();
        r.set_id(70).unwrap();
        assert_eq!(r.store().offset(), 56);
        assert_eq!(a.len(), 8);
        assert_eq!(a.capacity(), 10);
        assert_eq!(a.get(7).unwrap().id().unwrap(), 70);
        assert_eq!(a.get(3).unwrap().id().unwrap(), 0);
    }

    #[test]
    fn malloc_is_sequential_until_full() {
        let mut a = managed(3);
        for i in 0..3 {
            let mut r = a.malloc().unwrap();
            r.set_id(i).unwrap();
        }
        assert!(matches!(a.malloc(), Err(AllocError::Overflow { capacity: 3 })));
        let ids: Vec<i64> = (0..3).map(|i| a.get(i).unwrap().id().unwrap()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn bounds() {
        let mut a = managed(4);
        assert!(matches!(
            a.malloc_at(4),
            Err(AllocError::IndexOutOfBounds { index: 4, len: 4 })
        ));
        a.malloc_at(1).unwrap();
        assert!(matches!(
            a.get(2),
            Err(AllocError::IndexOutOfBounds { index: 2, len: 2 })
        ));
    }

    #[test]
    fn clear_invalidates_records() {
        let mut a = managed(2);
        let r = a.malloc().unwrap();
        a.clear().unwrap();
        assert!(a.is_empty());
        assert!(r.id().is_err());
        assert!(a.malloc().unwrap().id().is_ok());
    }

    #[test]
    fn calloc_zeroes() {
        let mut a = managed(1);
        let mut r = a.malloc().unwrap();
        r.set_id(9).unwrap();
        a.clear().unwrap();
        assert_eq!(a.calloc().unwrap().id().unwrap(), 0);
    }

    #[test]
    fn free_is_idempotent() {
        let mut a = managed(2);
        let r = a.malloc().unwrap();
        a.free();
        a.free();
        assert!(a.is_freed());
        assert!(r.id().is_err());
        assert!(matches!(a.malloc_at(0), Err(AllocError::Freed)));
    }

    #[test]
    fn layout_records() {
        let schema = LayoutBuilder::new("pair").uint("v", 12).build().unwrap();
        let mut a = ManagedIndexedAllocator::new(schema, 4, &LedConfig::default());
        assert_eq!(a.schema_size(), 10);
        let mut r = a.malloc_at(2).unwrap();
        r.set_uint("v", 4000).unwrap();
        assert_eq!(a.get(2).unwrap().get_uint("v").unwrap(), 4000);
    }
}
