use led_alloc::{Allocator, RecordOf};
use led_schema::Schema;

use crate::error::StreamResult;
use crate::merge::{Merge, MergeAll};
use crate::ops::{Checked, Filter, Map, Peek};
use crate::set_ops::{IdCursor, RemoveAll, RetainAll};

/// A boxed stream, for heterogeneous inputs to [`LedStream::merge_all`].
pub type BoxedStream<'a, R> = Box<dyn LedStream<Item = R> + 'a>;

/// A lazy, forward-only sequence of records in non-decreasing id order.
pub trait LedStream {
    type Item: Schema;

    /// The next record, or `None` once the stream is exhausted.
    fn next_record(&mut self) -> StreamResult<Option<Self::Item>>;

    /// Release files and buffers held by the stream and its inputs. The
    /// stream yields nothing afterwards.
    fn close(&mut self) -> StreamResult<()> {
        Ok(())
    }

    fn filter<P>(self, predicate: P) -> Filter<Self, P>
    where
        Self: Sized,
        P: FnMut(&Self::Item) -> bool,
    {
        Filter::new(self, predicate)
    }

    /// Call `f` on every record as it passes.
    fn peek<F>(self, f: F) -> Peek<Self, F>
    where
        Self: Sized,
        F: FnMut(&Self::Item),
    {
        Peek::new(self, f)
    }

    /// For every record, allocate a record from `allocator` and let
    /// `transform` fill it from the source.
    ///
    /// The transform must keep the id order intact; it usually copies the id.
    fn map<A, F>(self, allocator: A, transform: F) -> Map<Self, A, F>
    where
        Self: Sized,
        A: Allocator,
        F: FnMut(&Self::Item, &mut RecordOf<A>) -> StreamResult<()>,
    {
        Map::new(self, allocator, transform)
    }

    /// Ordered union with `other`; on equal ids this stream's record comes
    /// first.
    fn merge<S>(self, other: S) -> Merge<Self, S>
    where
        Self: Sized,
        S: LedStream<Item = Self::Item>,
    {
        Merge::new(self, other)
    }

    /// Ordered union of this stream and `others`; on equal ids the earlier
    /// input wins, this stream first.
    fn merge_all<'a>(self, others: Vec<BoxedStream<'a, Self::Item>>) -> MergeAll<'a, Self::Item>
    where
        Self: Sized + 'a,
    {
        let mut inputs = Vec::with_capacity(others.len() + 1);
        inputs.push(self.boxed());
        inputs.extend(others);
        MergeAll::new(inputs)
    }

    /// Records whose id does not appear in `other`.
    fn remove_all<C>(self, other: C) -> RemoveAll<Self, C>
    where
        Self: Sized,
        C: IdCursor,
    {
        RemoveAll::new(self, other)
    }

    /// Records whose id appears in `other`.
    fn retain_all<C>(self, other: C) -> RetainAll<Self, C>
    where
        Self: Sized,
        C: IdCursor,
    {
        RetainAll::new(self, other)
    }

    /// Fail with [`StreamError::Unsorted`](crate::StreamError::Unsorted) at
    /// the first id smaller than its predecessor.
    fn checked(self) -> Checked<Self>
    where
        Self: Sized,
    {
        Checked::new(self)
    }

    fn boxed<'a>(self) -> BoxedStream<'a, Self::Item>
    where
        Self: Sized + 'a,
    {
        Box::new(self)
    }

    /// Adapt to an [`Iterator`] of results. Iteration ends after the first
    /// error.
    fn records(self) -> Records<Self>
    where
        Self: Sized,
    {
        Records {
            stream: self,
            done: false,
        }
    }

    /// Drain the stream into a vector and close it.
    fn into_vec(mut self) -> StreamResult<Vec<Self::Item>>
    where
        Self: Sized,
    {
        let mut out = Vec::new();
        while let Some(record) = self.next_record()? {
            out.push(record);
        }
        self.close()?;
        Ok(out)
    }

    /// Drain the stream, keeping only ids.
    fn collect_ids(mut self) -> StreamResult<Vec<i64>>
    where
        Self: Sized,
    {
        let mut out = Vec::new();
        while let Some(record) = self.next_record()? {
            out.push(record.id()?);
        }
        self.close()?;
        Ok(out)
    }

    /// Drain the stream, counting records.
    fn count(mut self) -> StreamResult<usize>
    where
        Self: Sized,
    {
        let mut n = 0;
        while self.next_record()?.is_some() {
            n += 1;
        }
        self.close()?;
        Ok(n)
    }
}

impl<S: LedStream + ?Sized> LedStream for Box<S> {
    type Item = S::Item;

    fn next_record(&mut self) -> StreamResult<Option<S::Item>> {
        (**self).next_record()
    }

    fn close(&mut self) -> StreamResult<()> {
        (**self).close()
    }
}

impl<S: LedStream + ?Sized> LedStream for &mut S {
    type Item = S::Item;

    fn next_record(&mut self) -> StreamResult<Option<S::Item>> {
        (**self).next_record()
    }

    fn close(&mut self) -> StreamResult<()> {
        (**self).close()
    }
}

/// Iterator over a stream's records. See [`LedStream::records`].
pub struct Records<S> {
    stream: S,
    done: bool,
}

impl<S: LedStream> Iterator for Records<S> {
    type Item = StreamResult<S::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.stream.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
