use std::sync::Mutex;

use led_schema::{Schema, SchemaDescriptor};
use led_store::{ByteStore, StoreResult};
use led_types::LedConfig;
use tracing::trace;

use crate::allocator::Allocator;
use crate::error::{AllocError, AllocResult};

struct StackState {
    store: ByteStore,
    pointer: usize,
    freed: bool,
}

/// Bump allocator over one store.
///
/// Records are carved from the front of the store in order. The only way to
/// give one back is [`pop`](Self::pop), which undoes the most recent
/// allocation. Every operation takes an internal lock, so a stack can be
/// shared between threads through `&self`.
pub struct StackAllocator<D: SchemaDescriptor> {
    descriptor: D,
    state: Mutex<StackState>,
}

impl<D: SchemaDescriptor> StackAllocator<D> {
    /// A managed stack with room for `records` records.
    pub fn new(descriptor: D, records: usize, config: &LedConfig) -> Self {
        let store = ByteStore::managed(records * descriptor.size(), config.byte_order);
        Self::with_store(descriptor, store)
    }

    /// A stack over a native anonymous mapping with room for `records`.
    pub fn native(descriptor: D, records: usize, config: &LedConfig) -> StoreResult<Self> {
        let store = ByteStore::native(records * descriptor.size(), config.byte_order)?;
        Ok(Self::with_store(descriptor, store))
    }

    /// A stack over an existing store. Trailing bytes smaller than one
    /// record are never handed out.
    pub fn with_store(descriptor: D, store: ByteStore) -> Self {
        Self {
            descriptor,
            state: Mutex::new(StackState {
                store,
                pointer: 0,
                freed: false,
            }),
        }
    }

    pub fn malloc(&self) -> AllocResult<D::Record> {
        let size = self.descriptor.size();
        let mut state = self.state.lock().expect("stack mutex poisoned");
        if state.freed {
            return Err(AllocError::Freed);
        }
        if state.store.len() - state.pointer < size {
            return Err(AllocError::Overflow {
                capacity: state.store.len() / size,
            });
        }
        let view = state.store.slice(state.pointer, size)?;
        state.pointer += size;
        Ok(self.descriptor.view(view))
    }

    pub fn calloc(&self) -> AllocResult<D::Record> {
        let record = self.malloc()?;
        record.store().fill(0)?;
        Ok(record)
    }

    /// Retreat the bump pointer by one record.
    pub fn pop(&self) -> AllocResult<()> {
        let size = self.descriptor.size();
        let mut state = self.state.lock().expect("stack mutex poisoned");
        if state.freed {
            return Err(AllocError::Freed);
        }
        if state.pointer < size {
            return Err(AllocError::Underflow);
        }
        state.pointer -= size;
        Ok(())
    }

    /// Reset the bump pointer, keeping the memory. Records handed out before
    /// the clear fail from now on.
    pub fn clear(&self) -> AllocResult<()> {
        let mut state = self.state.lock().expect("stack mutex poisoned");
        if state.freed {
            return Err(AllocError::Freed);
        }
        state.store.recycle()?;
        state.pointer = 0;
        Ok(())
    }

    /// Release the store. Idempotent.
    pub fn free(&self) {
        let mut state = self.state.lock().expect("stack mutex poisoned");
        if !state.freed {
            state.store.free();
            state.freed = true;
            trace!(schema = self.descriptor.name(), "stack freed");
        }
    }

    pub fn descriptor(&self) -> &D {
        &self.descriptor
    }

    /// Records currently allocated.
    pub fn size(&self) -> usize {
        self.address() / self.descriptor.size()
    }

    /// Byte offset of the bump pointer.
    pub fn address(&self) -> usize {
        self.state.lock().expect("stack mutex poisoned").pointer
    }

    /// Total bytes of the backing store.
    pub fn stack_size(&self) -> usize {
        self.state.lock().expect("stack mutex poisoned").store.len()
    }

    /// Records that still fit.
    pub fn remaining(&self) -> usize {
        let state = self.state.lock().expect("stack mutex poisoned");
        (state.store.len() - state.pointer) / self.descriptor.size()
    }

    pub fn is_freed(&self) -> bool {
        self.state.lock().expect("stack mutex poisoned").freed
    }
}

impl<D: SchemaDescriptor> Allocator for StackAllocator<D> {
    type Descriptor = D;

    fn descriptor(&self) -> &D {
        &self.descriptor
    }

    fn malloc(&mut self) -> AllocResult<D::Record> {
        StackAllocator::malloc(self)
    }

    fn calloc(&mut self) -> AllocResult<D::Record> {
        StackAllocator::calloc(self)
    }

    fn free(&mut self) {
        StackAllocator::free(self)
    }
}
