use std::sync::Mutex;

use led_schema::{Schema, SchemaDescriptor};
use led_types::LedConfig;
use tracing::trace;

use crate::allocator::Allocator;
use crate::error::{AllocError, AllocResult};
use crate::stack::StackAllocator;

/// Builds the next segment when the current one is exhausted.
pub type SegmentFactory<D> = Box<dyn Fn(&D) -> AllocResult<StackAllocator<D>> + Send + Sync>;

struct ListState<D: SchemaDescriptor> {
    segments: Vec<StackAllocator<D>>,
    current: usize,
    freed: bool,
}

/// An auto-growing list of stack segments.
///
/// Allocation fills the current segment, then moves on to the next
/// pre-reserved segment or asks the factory for a fresh one. `size`,
/// `address` and `stack_size` describe the current segment.
pub struct StackListAllocator<D: SchemaDescriptor> {
    descriptor: D,
    factory: SegmentFactory<D>,
    state: Mutex<ListState<D>>,
}

impl<D: SchemaDescriptor> StackListAllocator<D> {
    /// Managed segments of `segment_records` records each.
    pub fn new(descriptor: D, segment_records: usize, config: &LedConfig) -> Self {
        let config = config.clone();
        Self::with_factory(
            descriptor,
            Box::new(move |d: &D| Ok(StackAllocator::new(d.clone(), segment_records, &config))),
        )
    }

    pub fn with_factory(descriptor: D, factory: SegmentFactory<D>) -> Self {
        Self {
            descriptor,
            factory,
            state: Mutex::new(ListState {
                segments: Vec::new(),
                current: 0,
                freed: false,
            }),
        }
    }

    /// Build `segments` more segments ahead of need.
    pub fn reserve(&self, segments: usize) -> AllocResult<()> {
        let mut state = self.state.lock().expect("stack list mutex poisoned");
        if state.freed {
            return Err(AllocError::Freed);
        }
        for _ in 0..segments {
            let segment = (self.factory)(&self.descriptor)?;
            state.segments.push(segment);
        }
        Ok(())
    }

    pub fn malloc(&self) -> AllocResult<D::Record> {
        let mut state = self.state.lock().expect("stack list mutex poisoned");
        if state.freed {
            return Err(AllocError::Freed);
        }
        if state.segments.is_empty() {
            let first = (self.factory)(&self.descriptor)?;
            state.segments.push(first);
        }
        loop {
            let current = state.current;
            match state.segments[current].malloc() {
                Err(AllocError::Overflow { .. }) => {}
                result => return result,
            }
            if current + 1 == state.segments.len() {
                let segment = (self.factory)(&self.descriptor)?;
                if segment.remaining() == 0 {
                    return Err(AllocError::Overflow {
                        capacity: self.total_capacity(&state),
                    });
                }
                state.segments.push(segment);
                trace!(
                    schema = self.descriptor.name(),
                    segments = state.segments.len(),
                    "stack segment added"
                );
            }
            state.current += 1;
        }
    }

    pub fn calloc(&self) -> AllocResult<D::Record> {
        let record = self.malloc()?;
        record.store().fill(0)?;
        Ok(record)
    }

    /// Undo the most recent allocation, stepping back into the previous
    /// segment when the current one is empty.
    pub fn pop(&self) -> AllocResult<()> {
        let mut state = self.state.lock().expect("stack list mutex poisoned");
        if state.freed {
            return Err(AllocError::Freed);
        }
        if state.segments.is_empty() {
            return Err(AllocError::Underflow);
        }
        while state.current > 0 && state.segments[state.current].address() == 0 {
            state.current -= 1;
        }
        let current = state.current;
        state.segments[current].pop()
    }

    /// Reset every segment, keeping them for reuse.
    pub fn clear(&self) -> AllocResult<()> {
        let mut state = self.state.lock().expect("stack list mutex poisoned");
        if state.freed {
            return Err(AllocError::Freed);
        }
        for segment in &state.segments {
            segment.clear()?;
        }
        state.current = 0;
        Ok(())
    }

    /// Release every segment. Idempotent.
    pub fn free(&self) {
        let mut state = self.state.lock().expect("stack list mutex poisoned");
        for segment in state.segments.drain(..) {
            segment.free();
        }
        state.current = 0;
        state.freed = true;
    }

    pub fn descriptor(&self) -> &D {
        &self.descriptor
    }

    /// Records allocated in the current segment.
    pub fn size(&self) -> usize {
        self.with_current(|s| s.size())
    }

    /// Bump offset within the current segment.
    pub fn address(&self) -> usize {
        self.with_current(|s| s.address())
    }

    /// Byte size of the current segment.
    pub fn stack_size(&self) -> usize {
        self.with_current(|s| s.stack_size())
    }

    pub fn segment_count(&self) -> usize {
        self.state.lock().expect("stack list mutex poisoned").segments.len()
    }

    /// Index of the segment allocations currently come from.
    pub fn current_segment(&self) -> usize {
        self.state.lock().expect("stack list mutex poisoned").current
    }

    /// Records allocated across all segments.
    pub fn total_size(&self) -> usize {
        let state = self.state.lock().expect("stack list mutex poisoned");
        state.segments.iter().map(|s| s.size()).sum()
    }

    fn with_current(&self, f: impl FnOnce(&StackAllocator<D>) -> usize) -> usize {
        let state = self.state.lock().expect("stack list mutex poisoned");
        state.segments.get(state.current).map_or(0, f)
    }

    fn total_capacity(&self, state: &ListState<D>) -> usize {
        state
            .segments
            .iter()
            .map(|s| s.stack_size() / self.descriptor.size())
            .sum()
    }
}

impl<D: SchemaDescriptor> Allocator for StackListAllocator<D> {
    type Descriptor = D;

    fn descriptor(&self) -> &D {
        &self.descriptor
    }

    fn malloc(&mut self) -> AllocResult<D::Record> {
        StackListAllocator::malloc(self)
    }

    fn calloc(&mut self) -> AllocResult<D::Record> {
        StackListAllocator::calloc(self)
    }

    fn free(&mut self) {
        StackListAllocator::free(self)
    }
}
