use led_alloc::{Allocator, RecordOf};
use led_schema::Schema;

use crate::error::{StreamError, StreamResult};
use crate::stream::LedStream;

/// See [`LedStream::filter`].
pub struct Filter<S, P> {
    inner: S,
    predicate: P,
}

impl<S, P> Filter<S, P> {
    pub(crate) fn new(inner: S, predicate: P) -> Self {
        Self { inner, predicate }
    }
}

impl<S, P> LedStream for Filter<S, P>
where
    S: LedStream,
    P: FnMut(&S::Item) -> bool,
{
    type Item = S::Item;

    fn next_record(&mut self) -> StreamResult<Option<S::Item>> {
        while let Some(record) = self.inner.next_record()? {
            if (self.predicate)(&record) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn close(&mut self) -> StreamResult<()> {
        self.inner.close()
    }
}

/// See [`LedStream::peek`].
pub struct Peek<S, F> {
    inner: S,
    f: F,
}

impl<S, F> Peek<S, F> {
    pub(crate) fn new(inner: S, f: F) -> Self {
        Self { inner, f }
    }
}

impl<S, F> LedStream for Peek<S, F>
where
    S: LedStream,
    F: FnMut(&S::Item),
{
    type Item = S::Item;

    fn next_record(&mut self) -> StreamResult<Option<S::Item>> {
        let next = self.inner.next_record()?;
        if let Some(record) = &next {
            (self.f)(record);
        }
        Ok(next)
    }

    fn close(&mut self) -> StreamResult<()> {
        self.inner.close()
    }
}

/// See [`LedStream::map`].
pub struct Map<S, A, F> {
    inner: S,
    allocator: A,
    transform: F,
}

impl<S, A, F> Map<S, A, F> {
    pub(crate) fn new(inner: S, allocator: A, transform: F) -> Self {
        Self {
            inner,
            allocator,
            transform,
        }
    }

    /// Give back the allocator the mapped records live in.
    pub fn into_allocator(self) -> A {
        self.allocator
    }
}

impl<S, A, F> LedStream for Map<S, A, F>
where
    S: LedStream,
    A: Allocator,
    F: FnMut(&S::Item, &mut RecordOf<A>) -> StreamResult<()>,
{
    type Item = RecordOf<A>;

    fn next_record(&mut self) -> StreamResult<Option<RecordOf<A>>> {
        let Some(source) = self.inner.next_record()? else {
            return Ok(None);
        };
        let mut target = self.allocator.malloc()?;
        (self.transform)(&source, &mut target)?;
        Ok(Some(target))
    }

    fn close(&mut self) -> StreamResult<()> {
        self.inner.close()
    }
}

/// See [`LedStream::checked`].
pub struct Checked<S> {
    inner: S,
    prev: Option<i64>,
}

impl<S> Checked<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self { inner, prev: None }
    }
}

impl<S: LedStream> LedStream for Checked<S> {
    type Item = S::Item;

    fn next_record(&mut self) -> StreamResult<Option<S::Item>> {
        let Some(record) = self.inner.next_record()? else {
            return Ok(None);
        };
        let id = record.id()?;
        if let Some(prev) = self.prev {
            if id < prev {
                return Err(StreamError::Unsorted { prev, id });
            }
        }
        self.prev = Some(id);
        Ok(Some(record))
    }

    fn close(&mut self) -> StreamResult<()> {
        self.inner.close()
    }
}
