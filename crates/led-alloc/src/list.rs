use std::collections::{HashSet, VecDeque};

use led_schema::{Schema, SchemaDescriptor};
use led_store::ByteStore;
use led_types::{ByteOrder, LedConfig};
use tracing::trace;

use crate::allocator::{Allocator, IndexedAllocator, RecordOf};
use crate::error::{AllocError, AllocResult};

/// Growable indexed allocator with index reuse.
///
/// Pages of `page_records` records are added on demand as indices grow.
/// Released indices go to a FIFO queue and are handed out again by
/// [`malloc`](Allocator::malloc) before the allocator grows.
pub struct ListIndexedAllocator<D: SchemaDescriptor> {
    descriptor: D,
    order: ByteOrder,
    page_records: usize,
    pages: Vec<ByteStore>,
    len: usize,
    free_queue: VecDeque<usize>,
    released: HashSet<usize>,
    freed: bool,
}

impl<D: SchemaDescriptor> ListIndexedAllocator<D> {
    pub fn new(descriptor: D, page_records: usize, config: &LedConfig) -> Self {
        Self {
            descriptor,
            order: config.byte_order,
            page_records: page_records.max(1),
            pages: Vec::new(),
            len: 0,
            free_queue: VecDeque::new(),
            released: HashSet::new(),
            freed: false,
        }
    }

    /// Records currently allocated: the logical length minus released
    /// indices.
    pub fn live(&self) -> usize {
        self.len - self.released.len()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_freed(&self) -> bool {
        self.freed
    }

    /// Give `index` back for reuse.
    pub fn free_index(&mut self, index: usize) -> AllocResult<()> {
        if self.freed {
            return Err(AllocError::Freed);
        }
        if index >= self.len {
            return Err(AllocError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        if !self.released.insert(index) {
            return Err(AllocError::FreedIndex(index));
        }
        self.free_queue.push_back(index);
        Ok(())
    }

    /// Give a record back for reuse. The owning page is found by matching
    /// the record's region against every page.
    pub fn free_record(&mut self, record: &RecordOf<Self>) -> AllocResult<()> {
        let index = self.index_of(record.store())?;
        self.free_index(index)
    }

    /// Global index of the record viewed by `store`. Views cut before the
    /// last [`clear`](IndexedAllocator::clear) are stale and rejected.
    pub fn index_of(&self, store: &ByteStore) -> AllocResult<usize> {
        let size = self.descriptor.size();
        let page = self
            .pages
            .iter()
            .position(|p| p.same_region(store))
            .ok_or(AllocError::ForeignRecord)?;
        if store.generation() != self.pages[page].generation() {
            return Err(AllocError::StaleRecord);
        }
        let local = (store.offset() - self.pages[page].offset()) / size;
        Ok(page * self.page_records + local)
    }

    fn ensure_page(&mut self, index: usize) {
        let page_bytes = self.page_records * self.descriptor.size();
        while self.pages.len() * self.page_records <= index {
            self.pages.push(ByteStore::managed(page_bytes, self.order));
            trace!(
                schema = self.descriptor.name(),
                pages = self.pages.len(),
                "list page added"
            );
        }
    }

    fn view(&self, index: usize) -> AllocResult<D::Record> {
        let size = self.descriptor.size();
        let page = &self.pages[index / self.page_records];
        let store = page.slice((index % self.page_records) * size, size)?;
        Ok(self.descriptor.view(store))
    }
}

impl<D: SchemaDescriptor> Allocator for ListIndexedAllocator<D> {
    type Descriptor = D;

    fn descriptor(&self) -> &D {
        &self.descriptor
    }

    /// The oldest released index, or a new one past the logical length.
    fn malloc(&mut self) -> AllocResult<D::Record> {
        if self.freed {
            return Err(AllocError::Freed);
        }
        if let Some(index) = self.free_queue.pop_front() {
            self.released.remove(&index);
            return self.view(index);
        }
        let index = self.len;
        self.malloc_at(index)
    }

    fn free(&mut self) {
        if !self.freed {
            for page in self.pages.drain(..) {
                page.free();
            }
            self.free_queue.clear();
            self.released.clear();
            self.len = 0;
            self.freed = true;
        }
    }
}

impl<D: SchemaDescriptor> IndexedAllocator for ListIndexedAllocator<D> {
    fn malloc_at(&mut self, index: usize) -> AllocResult<D::Record> {
        if self.freed {
            return Err(AllocError::Freed);
        }
        self.ensure_page(index);
        if self.released.remove(&index) {
            self.free_queue.retain(|&i| i != index);
        }
        self.len = self.len.max(index + 1);
        self.view(index)
    }

    fn get(&self, index: usize) -> AllocResult<D::Record> {
        if index >= self.len {
            return Err(AllocError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        if self.released.contains(&index) {
            return Err(AllocError::FreedIndex(index));
        }
        self.view(index)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn capacity(&self) -> usize {
        self.pages.len() * self.page_records
    }

    fn clear(&mut self) -> AllocResult<()> {
        if self.freed {
            return Err(AllocError::Freed);
        }
        for page in &mut self.pages {
            page.recycle()?;
        }
        self.free_queue.clear();
        self.released.clear();
        self.len = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use led_schema::IdSchema;

    use super::*;

    fn list(page_records: usize) -> ListIndexedAllocator<IdSchema> {
        ListIndexedAllocator::new(IdSchema, page_records, &LedConfig::default())
    }

    #[test]
    fn pages_grow_lazily() {
        let mut a = list(4);
        assert_eq!(a.capacity(), 0);
        for i in 0..9 {
            let mut r = a.malloc().unwrap();
            r.set_id(i).unwrap();
        }
        assert_eq!(a.page_count(), 3);
        assert_eq!(a.capacity(), 12);
        assert_eq!(a.len(), 9);
        assert_eq!(a.get(8).unwrap().id().unwrap(), 8);
    }

    #[test]
    fn malloc_at_far_index_fills_pages() {
        let mut a = list(4);
        a.malloc_at(10).unwrap();
        assert_eq!(a.page_count(), 3);
        assert_eq!(a.len(), 11);
        assert_eq!(a.get(5).unwrap().id().unwrap(), 0);
    }

    #[test]
    fn freed_indices_are_reused_fifo() {
        let mut a = list(4);
        for _ in 0..6 {
            a.malloc().unwrap();
        }
        a.free_index(4).unwrap();
        a.free_index(1).unwrap();
        assert_eq!(a.live(), 4);
        assert!(matches!(a.get(1), Err(AllocError::FreedIndex(1))));

        let r = a.malloc().unwrap();
        assert_eq!(a.index_of(r.store()).unwrap(), 4);
        let r = a.malloc().unwrap();
        assert_eq!(a.index_of(r.store()).unwrap(), 1);
        let r = a.malloc().unwrap();
        assert_eq!(a.index_of(r.store()).unwrap(), 6);
        assert_eq!(a.live(), 7);
    }

    #[test]
    fn free_record_locates_page_by_region() {
        let mut a = list(2);
        let records: Vec<_> = (0..5).map(|_| a.malloc().unwrap()).collect();
        a.free_record(&records[3]).unwrap();
        assert!(matches!(a.get(3), Err(AllocError::FreedIndex(3))));
        assert!(matches!(
            a.free_record(&records[3]),
            Err(AllocError::FreedIndex(3))
        ));
    }

    #[test]
    fn foreign_record_rejected() {
        let mut a = list(2);
        let mut b = list(2);
        a.malloc().unwrap();
        let stranger = b.malloc().unwrap();
        assert!(matches!(
            a.free_record(&stranger),
            Err(AllocError::ForeignRecord)
        ));
    }

    #[test]
    fn malloc_at_revives_released_index() {
        let mut a = list(2);
        a.malloc().unwrap();
        a.malloc().unwrap();
        a.free_index(0).unwrap();
        a.malloc_at(0).unwrap();
        assert!(a.get(0).is_ok());
        let r = a.malloc().unwrap();
        assert_eq!(a.index_of(r.store()).unwrap(), 2);
    }

    #[test]
    fn free_index_bounds() {
        let mut a = list(2);
        assert!(matches!(
            a.free_index(0),
            Err(AllocError::IndexOutOfBounds { index: 0, len: 0 })
        ));
    }

    #[test]
    fn clear_keeps_pages() {
        let mut a = list(2);
        let r = a.malloc().unwrap();
        a.malloc().unwrap();
        a.malloc().unwrap();
        a.free_index(1).unwrap();
        a.clear().unwrap();
        assert_eq!(a.len(), 0);
        assert_eq!(a.page_count(), 2);
        assert!(r.id().is_err());
        let r = a.malloc().unwrap();
        assert_eq!(a.index_of(r.store()).unwrap(), 0);
    }

    #[test]
    fn stale_record_cannot_free_its_successor() {
        let mut a = list(2);
        let stale = a.malloc().unwrap();
        a.clear().unwrap();
        let mut live = a.malloc().unwrap();
        live.set_id(42).unwrap();

        assert!(matches!(a.free_record(&stale), Err(AllocError::StaleRecord)));
        assert!(matches!(a.index_of(stale.store()), Err(AllocError::StaleRecord)));
        assert_eq!(a.live(), 1);
        assert_eq!(a.get(0).unwrap().id().unwrap(), 42);
        assert_eq!(live.id().unwrap(), 42);
        a.free_record(&live).unwrap();
        assert!(matches!(a.get(0), Err(AllocError::FreedIndex(0))));
    }

    #[test]
    fn free_releases_pages() {
        let mut a = list(2);
        let r = a.malloc().unwrap();
        a.free();
        a.free();
        assert!(r.id().is_err());
        assert!(matches!(a.malloc(), Err(AllocError::Freed)));
    }
}
