use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard};

use led_types::ByteOrder;
use memmap2::{Mmap, MmapMut};
use tracing::trace;

use crate::error::{StoreError, StoreResult};

/// Source of process-unique region ids. Id 0 is never handed out.
static NEXT_REGION_ID: AtomicU64 = AtomicU64::new(1);

/// Kind of memory backing a region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    /// Heap buffer.
    Managed,
    /// Anonymous memory mapping outside the heap.
    Native,
    /// Read-only file mapping.
    Mapped,
    /// Zero-length sentinel.
    Empty,
}

enum Memory {
    Managed(Vec<u8>),
    Native(MmapMut),
    Mapped(Mmap),
    Empty,
    Released,
}

impl Memory {
    fn bytes(&self) -> &[u8] {
        match self {
            Memory::Managed(v) => v,
            Memory::Native(m) => m,
            Memory::Mapped(m) => m,
            Memory::Empty | Memory::Released => &[],
        }
    }

    fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            Memory::Managed(v) => Some(v.as_mut_slice()),
            Memory::Native(m) => Some(&mut m[..]),
            Memory::Empty => Some(&mut []),
            Memory::Mapped(_) | Memory::Released => None,
        }
    }
}

struct RegionState {
    generation: u64,
    memory: Memory,
}

struct Region {
    id: u64,
    kind: StoreKind,
    state: RwLock<RegionState>,
}

impl Region {
    fn new(kind: StoreKind, memory: Memory) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_REGION_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            state: RwLock::new(RegionState {
                generation: 0,
                memory,
            }),
        })
    }
}

/// A bounds-checked window onto a shared memory region.
///
/// Cloning or slicing a store never copies memory; all views of a region see
/// the same bytes. Every access checks the view's window and its generation
/// against the region's current generation, so reads and writes through a
/// view outlived by [`free`](ByteStore::free) or
/// [`recycle`](ByteStore::recycle) fail with [`StoreError::Released`].
#[derive(Clone)]
pub struct ByteStore {
    region: Arc<Region>,
    generation: u64,
    offset: usize,
    len: usize,
    order: ByteOrder,
    read_only: bool,
}

impl ByteStore {
    // -- Constructors ---------------------------------------------------------

    /// Zero-filled heap buffer of `len` bytes.
    pub fn managed(len: usize, order: ByteOrder) -> Self {
        Self::from_vec(vec![0u8; len], order)
    }

    /// Take ownership of an existing heap buffer.
    pub fn from_vec(bytes: Vec<u8>, order: ByteOrder) -> Self {
        let len = bytes.len();
        Self::whole(Region::new(StoreKind::Managed, Memory::Managed(bytes)), len, order, false)
    }

    /// Zero-filled anonymous mapping of `len` bytes, outside the heap.
    pub fn native(len: usize, order: ByteOrder) -> StoreResult<Self> {
        if len == 0 {
            return Ok(Self::empty());
        }
        let map = MmapMut::map_anon(len)?;
        Ok(Self::whole(Region::new(StoreKind::Native, Memory::Native(map)), len, order, false))
    }

    /// Read-only view over a file mapping.
    pub fn mapped(map: Mmap, order: ByteOrder) -> Self {
        let len = map.len();
        Self::whole(Region::new(StoreKind::Mapped, Memory::Mapped(map)), len, order, true)
    }

    /// The zero-length sentinel store.
    pub fn empty() -> Self {
        Self::whole(Region::new(StoreKind::Empty, Memory::Empty), 0, ByteOrder::default(), false)
    }

    fn whole(region: Arc<Region>, len: usize, order: ByteOrder, read_only: bool) -> Self {
        Self {
            region,
            generation: 0,
            offset: 0,
            len,
            order,
            read_only,
        }
    }

    // -- Introspection --------------------------------------------------------

    /// Length of this view in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte offset of this view inside its region.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn kind(&self) -> StoreKind {
        self.region.kind
    }

    /// Process-unique id of the backing region; the "address" allocators use
    /// to find which page a record belongs to.
    pub fn region_id(&self) -> u64 {
        self.region.id
    }

    /// Generation this view was cut at.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether accesses through this view are still valid.
    pub fn is_live(&self) -> bool {
        let state = self.read_state();
        state.generation == self.generation && !matches!(state.memory, Memory::Released)
    }

    /// Whether both views share one region.
    pub fn same_region(&self, other: &ByteStore) -> bool {
        Arc::ptr_eq(&self.region, &other.region)
    }

    // -- Views ----------------------------------------------------------------

    /// Narrower view `[offset, offset + len)` of this view, sharing memory.
    pub fn slice(&self, offset: usize, len: usize) -> StoreResult<ByteStore> {
        self.check_range(offset, len)?;
        if !self.is_live() {
            return Err(self.released());
        }
        Ok(Self {
            region: Arc::clone(&self.region),
            generation: self.generation,
            offset: self.offset + offset,
            len,
            order: self.order,
            read_only: self.read_only,
        })
    }

    /// Read-only copy of this view.
    pub fn to_read_only(&self) -> ByteStore {
        let mut view = self.clone();
        view.read_only = true;
        view
    }

    /// Permanently mark this view read-only.
    pub fn make_read_only(&mut self) {
        self.read_only = true;
    }

    /// Same window interpreted with another byte order.
    pub fn with_order(&self, order: ByteOrder) -> ByteStore {
        let mut view = self.clone();
        view.order = order;
        view
    }

    // -- Lifecycle ------------------------------------------------------------

    /// Release the backing memory of the whole region. Idempotent.
    ///
    /// Every view of the region, including this one, fails afterwards.
    pub fn free(&self) {
        let mut state = self.region.state.write().expect("region lock poisoned");
        if matches!(state.memory, Memory::Released) {
            return;
        }
        let bytes = state.memory.bytes().len();
        state.memory = Memory::Released;
        state.generation += 1;
        trace!(region = self.region.id, bytes, "region released");
    }

    /// Invalidate all outstanding views of the region while keeping its
    /// memory, and move this view to the new generation.
    pub fn recycle(&mut self) -> StoreResult<()> {
        let mut state = self.region.state.write().expect("region lock poisoned");
        if state.generation != self.generation || matches!(state.memory, Memory::Released) {
            return Err(self.released());
        }
        state.generation += 1;
        self.generation = state.generation;
        Ok(())
    }

    // -- Bulk access ----------------------------------------------------------

    /// Run `f` over `len` bytes starting at `index` of this view.
    pub fn with_bytes<T>(&self, index: usize, len: usize, f: impl FnOnce(&[u8]) -> T) -> StoreResult<T> {
        self.check_range(index, len)?;
        let state = self.read_state();
        self.check_generation(&state)?;
        let start = self.offset + index;
        Ok(f(&state.memory.bytes()[start..start + len]))
    }

    /// Run `f` over `len` mutable bytes starting at `index` of this view.
    pub fn with_bytes_mut<T>(
        &self,
        index: usize,
        len: usize,
        f: impl FnOnce(&mut [u8]) -> T,
    ) -> StoreResult<T> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        self.check_range(index, len)?;
        let mut state = self.region.state.write().expect("region lock poisoned");
        self.check_generation(&state)?;
        let start = self.offset + index;
        let bytes = state.memory.bytes_mut().ok_or(StoreError::ReadOnly)?;
        Ok(f(&mut bytes[start..start + len]))
    }

    pub fn read_bytes(&self, index: usize, dst: &mut [u8]) -> StoreResult<()> {
        self.with_bytes(index, dst.len(), |src| dst.copy_from_slice(src))
    }

    pub fn write_bytes(&self, index: usize, src: &[u8]) -> StoreResult<()> {
        self.with_bytes_mut(index, src.len(), |dst| dst.copy_from_slice(src))
    }

    /// Set every byte of the view to `value`.
    pub fn fill(&self, value: u8) -> StoreResult<()> {
        self.with_bytes_mut(0, self.len, |dst| dst.fill(value))
    }

    /// Copy of the view's bytes.
    pub fn to_vec(&self) -> StoreResult<Vec<u8>> {
        self.with_bytes(0, self.len, |src| src.to_vec())
    }

    /// Append the view's bytes to `out`.
    pub fn extend_vec(&self, out: &mut Vec<u8>) -> StoreResult<()> {
        self.with_bytes(0, self.len, |src| out.extend_from_slice(src))
    }

    /// Overwrite this view with the bytes of an equally long view.
    pub fn copy_from(&self, src: &ByteStore) -> StoreResult<()> {
        if src.len != self.len {
            return Err(StoreError::LengthMismatch {
                expected: self.len,
                actual: src.len,
            });
        }
        // Snapshot first: both views may share one region lock.
        let bytes = src.to_vec()?;
        self.write_bytes(0, &bytes)
    }

    // -- Aligned scalar access ------------------------------------------------

    fn read_array<const N: usize>(&self, index: usize) -> StoreResult<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_bytes(index, &mut buf)?;
        Ok(buf)
    }

    pub fn get_u8(&self, index: usize) -> StoreResult<u8> {
        Ok(self.read_array::<1>(index)?[0])
    }

    pub fn set_u8(&self, index: usize, value: u8) -> StoreResult<()> {
        self.write_bytes(index, &[value])
    }

    pub fn get_u16(&self, index: usize) -> StoreResult<u16> {
        let b = self.read_array::<2>(index)?;
        Ok(match self.order {
            ByteOrder::Little => u16::from_le_bytes(b),
            ByteOrder::Big => u16::from_be_bytes(b),
        })
    }

    pub fn set_u16(&self, index: usize, value: u16) -> StoreResult<()> {
        let b = match self.order {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        };
        self.write_bytes(index, &b)
    }

    pub fn get_u32(&self, index: usize) -> StoreResult<u32> {
        let b = self.read_array::<4>(index)?;
        Ok(match self.order {
            ByteOrder::Little => u32::from_le_bytes(b),
            ByteOrder::Big => u32::from_be_bytes(b),
        })
    }

    pub fn set_u32(&self, index: usize, value: u32) -> StoreResult<()> {
        let b = match self.order {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        };
        self.write_bytes(index, &b)
    }

    pub fn get_u64(&self, index: usize) -> StoreResult<u64> {
        let b = self.read_array::<8>(index)?;
        Ok(match self.order {
            ByteOrder::Little => u64::from_le_bytes(b),
            ByteOrder::Big => u64::from_be_bytes(b),
        })
    }

    pub fn set_u64(&self, index: usize, value: u64) -> StoreResult<()> {
        let b = match self.order {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        };
        self.write_bytes(index, &b)
    }

    pub fn get_i64(&self, index: usize) -> StoreResult<i64> {
        self.get_u64(index).map(|v| v as i64)
    }

    pub fn set_i64(&self, index: usize, value: i64) -> StoreResult<()> {
        self.set_u64(index, value as u64)
    }

    pub fn get_f32(&self, index: usize) -> StoreResult<f32> {
        self.get_u32(index).map(f32::from_bits)
    }

    pub fn set_f32(&self, index: usize, value: f32) -> StoreResult<()> {
        self.set_u32(index, value.to_bits())
    }

    pub fn get_f64(&self, index: usize) -> StoreResult<f64> {
        self.get_u64(index).map(f64::from_bits)
    }

    pub fn set_f64(&self, index: usize, value: f64) -> StoreResult<()> {
        self.set_u64(index, value.to_bits())
    }

    // -- Internals ------------------------------------------------------------

    fn read_state(&self) -> RwLockReadGuard<'_, RegionState> {
        self.region.state.read().expect("region lock poisoned")
    }

    fn check_range(&self, index: usize, len: usize) -> StoreResult<()> {
        match index.checked_add(len) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(StoreError::OutOfBounds {
                offset: index,
                len,
                size: self.len,
            }),
        }
    }

    fn check_generation(&self, state: &RegionState) -> StoreResult<()> {
        if state.generation != self.generation || matches!(state.memory, Memory::Released) {
            return Err(self.released());
        }
        Ok(())
    }

    fn released(&self) -> StoreError {
        StoreError::Released {
            region: self.region.id,
            generation: self.generation,
        }
    }
}

impl fmt::Debug for ByteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStore")
            .field("region", &self.region.id)
            .field("kind", &self.region.kind)
            .field("generation", &self.generation)
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("order", &self.order)
            .field("read_only", &self.read_only)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn managed_store_is_zeroed() {
        let store = ByteStore::managed(16, ByteOrder::Little);
        assert_eq!(store.len(), 16);
        assert_eq!(store.kind(), StoreKind::Managed);
        assert_eq!(store.to_vec().unwrap(), vec![0u8; 16]);
    }

    #[test]
    fn slices_share_memory() {
        let store = ByteStore::managed(16, ByteOrder::Little);
        let slice = store.slice(8, 8).unwrap();
        slice.set_u64(0, 0xdead_beef).unwrap();
        assert_eq!(store.get_u64(8).unwrap(), 0xdead_beef);
        assert_eq!(slice.offset(), 8);
        assert!(slice.same_region(&store));
    }

    #[test]
    fn slice_bounds_are_checked() {
        let store = ByteStore::managed(16, ByteOrder::Little);
        let slice = store.slice(4, 8).unwrap();
        assert!(matches!(
            slice.get_u64(1),
            Err(StoreError::OutOfBounds { offset: 1, len: 8, size: 8 })
        ));
        assert!(store.slice(10, 8).is_err());
        assert!(store.slice(usize::MAX, 2).is_err());
    }

    #[test]
    fn byte_order_is_respected() {
        let le = ByteStore::managed(4, ByteOrder::Little);
        le.set_u32(0, 0x0102_0304).unwrap();
        assert_eq!(le.to_vec().unwrap(), vec![4, 3, 2, 1]);

        let be = ByteStore::managed(4, ByteOrder::Big);
        be.set_u32(0, 0x0102_0304).unwrap();
        assert_eq!(be.to_vec().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn floats_roundtrip() {
        let store = ByteStore::managed(12, ByteOrder::Big);
        store.set_f32(0, 1.5).unwrap();
        store.set_f64(4, -2.25).unwrap();
        assert_eq!(store.get_f32(0).unwrap(), 1.5);
        assert_eq!(store.get_f64(4).unwrap(), -2.25);
    }

    #[test]
    fn free_is_idempotent_and_invalidates_all_views() {
        let store = ByteStore::managed(16, ByteOrder::Little);
        let slice = store.slice(0, 8).unwrap();
        store.free();
        store.free();
        assert!(!store.is_live());
        assert!(matches!(slice.get_u64(0), Err(StoreError::Released { .. })));
        assert!(matches!(store.slice(0, 4), Err(StoreError::Released { .. })));
    }

    #[test]
    fn recycle_invalidates_old_views_only() {
        let mut store = ByteStore::managed(16, ByteOrder::Little);
        let old = store.slice(0, 8).unwrap();
        store.recycle().unwrap();
        assert!(matches!(old.get_u64(0), Err(StoreError::Released { .. })));
        let fresh = store.slice(0, 8).unwrap();
        fresh.set_u64(0, 9).unwrap();
        assert_eq!(fresh.get_u64(0).unwrap(), 9);
        assert_eq!(fresh.generation(), 1);
    }

    #[test]
    fn read_only_views_reject_writes() {
        let store = ByteStore::managed(8, ByteOrder::Little);
        let ro = store.to_read_only();
        assert!(matches!(ro.set_u8(0, 1), Err(StoreError::ReadOnly)));
        store.set_u8(0, 7).unwrap();
        assert_eq!(ro.get_u8(0).unwrap(), 7);
    }

    #[test]
    fn native_store_roundtrip() {
        let store = ByteStore::native(64, ByteOrder::Little).unwrap();
        assert_eq!(store.kind(), StoreKind::Native);
        store.set_i64(56, -5).unwrap();
        assert_eq!(store.get_i64(56).unwrap(), -5);
        store.free();
        assert!(store.get_i64(56).is_err());
    }

    #[test]
    fn mapped_store_is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, [1u8, 2, 3, 4]).unwrap();
        let file = std::fs::File::open(&path).unwrap();
        let map = unsafe { Mmap::map(&file) }.unwrap();
        let store = ByteStore::mapped(map, ByteOrder::Big);
        assert!(store.is_read_only());
        assert_eq!(store.get_u32(0).unwrap(), 0x0102_0304);
        assert!(store.fill(0).is_err());
    }

    #[test]
    fn empty_sentinel() {
        let store = ByteStore::empty();
        assert!(store.is_empty());
        assert_eq!(store.kind(), StoreKind::Empty);
        assert!(store.get_u8(0).is_err());
        assert_eq!(store.to_vec().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn copy_from_same_region() {
        let store = ByteStore::managed(16, ByteOrder::Little);
        let a = store.slice(0, 8).unwrap();
        let b = store.slice(8, 8).unwrap();
        a.set_u64(0, 77).unwrap();
        b.copy_from(&a).unwrap();
        assert_eq!(b.get_u64(0).unwrap(), 77);
        let short = store.slice(0, 4).unwrap();
        assert!(matches!(
            b.copy_from(&short),
            Err(StoreError::LengthMismatch { expected: 8, actual: 4 })
        ));
    }

    #[test]
    fn region_ids_are_unique() {
        let a = ByteStore::managed(1, ByteOrder::Little);
        let b = ByteStore::managed(1, ByteOrder::Little);
        assert_ne!(a.region_id(), b.region_id());
        assert_eq!(a.slice(0, 1).unwrap().region_id(), a.region_id());
    }
}
