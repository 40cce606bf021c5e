use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use led_schema::Schema;

use crate::error::StreamResult;
use crate::stream::{BoxedStream, LedStream};

/// Next record of `stream` together with its id.
fn pull<S: LedStream>(stream: &mut S) -> StreamResult<Option<(i64, S::Item)>> {
    match stream.next_record()? {
        Some(record) => Ok(Some((record.id()?, record))),
        None => Ok(None),
    }
}

/// Two-way ordered merge. See [`LedStream::merge`].
pub struct Merge<A: LedStream, B: LedStream<Item = A::Item>> {
    left: A,
    right: B,
    left_head: Option<(i64, A::Item)>,
    right_head: Option<(i64, A::Item)>,
    primed: bool,
}

impl<A, B> Merge<A, B>
where
    A: LedStream,
    B: LedStream<Item = A::Item>,
{
    pub(crate) fn new(left: A, right: B) -> Self {
        Self {
            left,
            right,
            left_head: None,
            right_head: None,
            primed: false,
        }
    }
}

impl<A, B> LedStream for Merge<A, B>
where
    A: LedStream,
    B: LedStream<Item = A::Item>,
{
    type Item = A::Item;

    fn next_record(&mut self) -> StreamResult<Option<A::Item>> {
        if !self.primed {
            self.left_head = pull(&mut self.left)?;
            self.right_head = pull(&mut self.right)?;
            self.primed = true;
        }
        let take_left = match (&self.left_head, &self.right_head) {
            (None, None) => return Ok(None),
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (Some((l, _)), Some((r, _))) => l <= r,
        };
        let taken = if take_left {
            std::mem::replace(&mut self.left_head, pull(&mut self.left)?)
        } else {
            std::mem::replace(&mut self.right_head, pull(&mut self.right)?)
        };
        Ok(taken.map(|(_, record)| record))
    }

    fn close(&mut self) -> StreamResult<()> {
        self.left_head = None;
        self.right_head = None;
        self.primed = true;
        let left = self.left.close();
        let right = self.right.close();
        left.and(right)
    }
}

/// Heap slot: the current head id of one input.
#[derive(PartialEq, Eq)]
struct HeapEntry {
    id: i64,
    input: usize,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id
            .cmp(&other.id)
            .then(self.input.cmp(&other.input))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// N-way ordered merge: min-of-N selection over a heap of input heads.
/// See [`LedStream::merge_all`].
pub struct MergeAll<'a, R> {
    inputs: Vec<BoxedStream<'a, R>>,
    heads: Vec<Option<R>>,
    heap: BinaryHeap<Reverse<HeapEntry>>,
    primed: bool,
}

impl<'a, R: Schema> MergeAll<'a, R> {
    pub fn new(inputs: Vec<BoxedStream<'a, R>>) -> Self {
        let heads = inputs.iter().map(|_| None).collect();
        Self {
            heap: BinaryHeap::with_capacity(inputs.len()),
            inputs,
            heads,
            primed: false,
        }
    }

    fn refill(&mut self, input: usize) -> StreamResult<()> {
        if let Some((id, record)) = pull(&mut self.inputs[input])? {
            self.heads[input] = Some(record);
            self.heap.push(Reverse(HeapEntry { id, input }));
        }
        Ok(())
    }
}

impl<'a, R: Schema> LedStream for MergeAll<'a, R> {
    type Item = R;

    fn next_record(&mut self) -> StreamResult<Option<R>> {
        if !self.primed {
            for input in 0..self.inputs.len() {
                self.refill(input)?;
            }
            self.primed = true;
        }
        let Some(Reverse(entry)) = self.heap.pop() else {
            return Ok(None);
        };
        let record = self.heads[entry.input].take();
        self.refill(entry.input)?;
        Ok(record)
    }

    fn close(&mut self) -> StreamResult<()> {
        self.heap.clear();
        self.heads.iter_mut().for_each(|h| *h = None);
        self.primed = true;
        let mut result = Ok(());
        for input in &mut self.inputs {
            let closed = input.close();
            if result.is_ok() {
                result = closed;
            }
        }
        result
    }
}
