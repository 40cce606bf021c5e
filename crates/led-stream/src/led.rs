use led_alloc::{AllocError, Allocator, IndexedAllocator, RecordOf};
use led_schema::Schema;

use crate::error::{StreamError, StreamResult};
use crate::source::{from_vec, IterStream};
use crate::stream::LedStream;

/// A finite, randomly indexable collection of records in non-decreasing id
/// order.
pub trait Led {
    type Item: Schema;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> StreamResult<Self::Item>;

    /// Stream over the records in order.
    fn stream(&self) -> LedCursor<'_, Self>
    where
        Self: Sized,
    {
        LedCursor { led: self, next: 0 }
    }

    fn first(&self) -> StreamResult<Option<Self::Item>> {
        if self.is_empty() {
            return Ok(None);
        }
        self.get(0).map(Some)
    }

    fn last(&self) -> StreamResult<Option<Self::Item>> {
        match self.len() {
            0 => Ok(None),
            n => self.get(n - 1).map(Some),
        }
    }

    /// Index of the first record whose id is not less than `id`; `len()`
    /// when there is none.
    fn lower_bound(&self, id: i64) -> StreamResult<usize> {
        let (mut lo, mut hi) = (0, self.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.get(mid)?.id()? < id {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    fn contains_id(&self, id: i64) -> StreamResult<bool> {
        let at = self.lower_bound(id)?;
        if at == self.len() {
            return Ok(false);
        }
        Ok(self.get(at)?.id()? == id)
    }
}

/// Borrowing stream over a [`Led`]. See [`Led::stream`].
pub struct LedCursor<'a, L> {
    led: &'a L,
    next: usize,
}

impl<'a, L: Led> LedStream for LedCursor<'a, L> {
    type Item = L::Item;

    fn next_record(&mut self) -> StreamResult<Option<L::Item>> {
        if self.next >= self.led.len() {
            return Ok(None);
        }
        let record = self.led.get(self.next)?;
        self.next += 1;
        Ok(Some(record))
    }

    fn close(&mut self) -> StreamResult<()> {
        self.next = self.led.len();
        Ok(())
    }
}

/// Walk ids pairwise, failing on the first decrease.
fn check_sorted(ids: impl IntoIterator<Item = StreamResult<i64>>) -> StreamResult<()> {
    let mut prev: Option<i64> = None;
    for id in ids {
        let id = id?;
        if let Some(p) = prev {
            if id < p {
                return Err(StreamError::Unsorted { prev: p, id });
            }
        }
        prev = Some(id);
    }
    Ok(())
}

/// A [`Led`] held in a vector.
#[derive(Clone, Debug)]
pub struct ArrayLed<R> {
    records: Vec<R>,
}

impl<R: Schema> ArrayLed<R> {
    /// Wrap records that are already in id order.
    pub fn from_sorted(records: Vec<R>) -> StreamResult<Self> {
        check_sorted(records.iter().map(|r| -> StreamResult<i64> { Ok(r.id()?) }))?;
        Ok(Self { records })
    }

    /// Sort records by id. Records with equal ids keep their relative order.
    pub fn sort(records: Vec<R>) -> StreamResult<Self> {
        let mut keyed = records
            .into_iter()
            .map(|r| -> StreamResult<(i64, R)> { Ok((r.id()?, r)) })
            .collect::<StreamResult<Vec<_>>>()?;
        keyed.sort_by_key(|(id, _)| *id);
        Ok(Self {
            records: keyed.into_iter().map(|(_, r)| r).collect(),
        })
    }

    /// Drain a stream, checking its order.
    pub fn from_stream<S: LedStream<Item = R>>(stream: S) -> StreamResult<Self> {
        Ok(Self {
            records: stream.checked().into_vec()?,
        })
    }

    pub fn as_slice(&self) -> &[R] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.records.iter()
    }

    pub fn into_vec(self) -> Vec<R> {
        self.records
    }

    /// Owning stream over the records.
    pub fn into_stream(self) -> IterStream<std::vec::IntoIter<R>> {
        from_vec(self.records)
    }
}

impl<R: Schema> Led for ArrayLed<R> {
    type Item = R;

    fn len(&self) -> usize {
        self.records.len()
    }

    fn get(&self, index: usize) -> StreamResult<R> {
        self.records
            .get(index)
            .cloned()
            .ok_or(StreamError::IndexOutOfBounds {
                index,
                len: self.records.len(),
            })
    }
}

/// A [`Led`] over the records of an indexed allocator.
pub struct IndexedLed<A> {
    allocator: A,
}

impl<A: IndexedAllocator> IndexedLed<A> {
    /// Wrap an allocator whose records `0..len()` are in id order.
    pub fn new(allocator: A) -> StreamResult<Self> {
        let led = Self { allocator };
        check_sorted((0..led.len()).map(|i| -> StreamResult<i64> { Ok(led.get(i)?.id()?) }))?;
        Ok(led)
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    pub fn into_allocator(self) -> A {
        self.allocator
    }

    /// Release the allocator's memory; every record of this Led fails
    /// afterwards.
    pub fn free(&mut self) {
        self.allocator.free();
    }
}

impl<A: IndexedAllocator> Led for IndexedLed<A> {
    type Item = RecordOf<A>;

    fn len(&self) -> usize {
        self.allocator.len()
    }

    fn get(&self, index: usize) -> StreamResult<RecordOf<A>> {
        self.allocator.get(index).map_err(|e| match e {
            AllocError::IndexOutOfBounds { index, len } => {
                StreamError::IndexOutOfBounds { index, len }
            }
            other => StreamError::Alloc(other),
        })
    }
}
