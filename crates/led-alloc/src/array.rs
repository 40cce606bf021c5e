use led_schema::SchemaDescriptor;
use led_store::{ByteStore, StoreError};
use led_types::LedConfig;

use crate::allocator::{Allocator, IndexedAllocator};
use crate::error::{AllocError, AllocResult};

/// Indexed records spread over a fixed list of pages.
///
/// Built once, either over stores that already hold records (a bulk file
/// load, fully populated) or as empty pages filled front to back. Lookup
/// scans the pages' cumulative record counts.
pub struct ArrayIndexedAllocator<D: SchemaDescriptor> {
    descriptor: D,
    pages: Vec<ByteStore>,
    capacity: usize,
    len: usize,
    freed: bool,
}

impl<D: SchemaDescriptor> ArrayIndexedAllocator<D> {
    /// Pages over existing record stores; every record is live.
    ///
    /// Each store's length must be a multiple of the record size.
    pub fn from_stores(descriptor: D, pages: Vec<ByteStore>) -> AllocResult<Self> {
        let size = descriptor.size();
        for page in &pages {
            if page.len() % size != 0 {
                return Err(AllocError::Store(StoreError::LengthMismatch {
                    expected: page.len() / size * size,
                    actual: page.len(),
                }));
            }
        }
        let capacity = pages.iter().map(|p| p.len() / size).sum();
        Ok(Self {
            descriptor,
            pages,
            capacity,
            len: capacity,
            freed: false,
        })
    }

    /// `page_count` empty managed pages of `page_records` records each.
    pub fn with_pages(
        descriptor: D,
        page_count: usize,
        page_records: usize,
        config: &LedConfig,
    ) -> Self {
        let page_bytes = page_records * descriptor.size();
        let pages = (0..page_count)
            .map(|_| ByteStore::managed(page_bytes, config.byte_order))
            .collect();
        Self {
            descriptor,
            pages,
            capacity: page_count * page_records,
            len: 0,
            freed: false,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[ByteStore] {
        &self.pages
    }

    pub fn is_freed(&self) -> bool {
        self.freed
    }

    fn view(&self, index: usize) -> AllocResult<D::Record> {
        if self.freed {
            return Err(AllocError::Freed);
        }
        let size = self.descriptor.size();
        let mut first = 0;
        for page in &self.pages {
            let count = page.len() / size;
            if index < first + count {
                let store = page.slice((index - first) * size, size)?;
                return Ok(self.descriptor.view(store));
            }
            first += count;
        }
        Err(AllocError::IndexOutOfBounds {
            index,
            len: self.capacity,
        })
    }
}

impl<D: SchemaDescriptor> Allocator for ArrayIndexedAllocator<D> {
    type Descriptor = D;

    fn descriptor(&self) -> &D {
        &self.descriptor
    }

    fn malloc(&mut self) -> AllocResult<D::Record> {
        if self.len == self.capacity {
            return Err(AllocError::Overflow {
                capacity: self.capacity,
            });
        }
        self.malloc_at(self.len)
    }

    fn free(&mut self) {
        if !self.freed {
            for page in &self.pages {
                page.free();
            }
            self.freed = true;
            self.len = 0;
        }
    }
}

impl<D: SchemaDescriptor> IndexedAllocator for ArrayIndexedAllocator<D> {
    fn malloc_at(&mut self, index: usize) -> AllocResult<D::Record> {
        let record = self.view(index)?;
        self.len = self.len.max(index + 1);
        Ok(record)
    }

    fn get(&self, index: usize) -> AllocResult<D::Record> {
        if index >= self.len {
            return Err(AllocError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        self.view(index)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn clear(&mut self) -> AllocResult<()> {
        if self.freed {
            return Err(AllocError::Freed);
        }
        for page in &mut self.pages {
            page.recycle()?;
        }
        self.len = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use led_schema::{IdSchema, Schema};
    use led_types::ByteOrder;

    use super::*;

    fn page_of(ids: &[i64]) -> ByteStore {
        let mut bytes = Vec::new();
        for id in ids {
            bytes.extend_from_slice(&id.to_le_bytes());
        }
        ByteStore::from_vec(bytes, ByteOrder::Little)
    }

    #[test]
    fn lookup_spans_uneven_pages() {
        let a = ArrayIndexedAllocator::from_stores(
            IdSchema,
            vec![page_of(&[0, 1, 2]), page_of(&[3]), page_of(&[]), page_of(&[4, 5])],
        )
        .unwrap();
        assert_eq!(a.len(), 6);
        assert_eq!(a.page_count(), 4);
        let ids: Vec<i64> = (0..6).map(|i| a.get(i).unwrap().id().unwrap()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
        assert!(matches!(
            a.get(6),
            Err(AllocError::IndexOutOfBounds { index: 6, len: 6 })
        ));
    }

    #[test]
    fn ragged_page_rejected() {
        let err = ArrayIndexedAllocator::from_stores(
            IdSchema,
            vec![ByteStore::managed(12, ByteOrder::Little)],
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            AllocError::Store(StoreError::LengthMismatch { expected: 8, actual: 12 })
        ));
    }

    #[test]
    fn fixed_pages_fill_sequentially() {
        let mut a = ArrayIndexedAllocator::with_pages(IdSchema, 2, 2, &LedConfig::default());
        assert_eq!(a.capacity(), 4);
        assert!(a.is_empty());
        for i in 0..4 {
            let mut r = a.malloc().unwrap();
            r.set_id(i * 10).unwrap();
        }
        assert!(matches!(a.malloc(), Err(AllocError::Overflow { capacity: 4 })));
        assert_eq!(a.get(3).unwrap().id().unwrap(), 30);
        assert!(a.get(2).unwrap().store().same_region(&a.pages()[1]));
    }

    #[test]
    fn clear_and_free() {
        let mut a = ArrayIndexedAllocator::from_stores(IdSchema, vec![page_of(&[7, 8])]).unwrap();
        let r = a.get(1).unwrap();
        a.clear().unwrap();
        assert!(a.is_empty());
        assert!(r.id().is_err());
        a.free();
        a.free();
        assert!(a.is_freed());
        assert!(matches!(a.malloc_at(0), Err(AllocError::Freed)));
    }
}
