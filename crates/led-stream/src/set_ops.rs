use led_schema::Schema;

use crate::error::StreamResult;
use crate::stream::LedStream;

/// A non-decreasing sequence of ids to compare a stream against.
pub trait IdCursor {
    fn next_id(&mut self) -> StreamResult<Option<i64>>;

    fn close(&mut self) -> StreamResult<()> {
        Ok(())
    }
}

/// The ids of a stream's records. See [`ids`].
pub struct StreamIds<S>(S);

impl<S: LedStream> IdCursor for StreamIds<S> {
    fn next_id(&mut self) -> StreamResult<Option<i64>> {
        match self.0.next_record()? {
            Some(record) => Ok(Some(record.id()?)),
            None => Ok(None),
        }
    }

    fn close(&mut self) -> StreamResult<()> {
        self.0.close()
    }
}

/// A raw id sequence. See [`sorted_ids`].
pub struct SortedIds<I>(I);

impl<I: Iterator<Item = i64>> IdCursor for SortedIds<I> {
    fn next_id(&mut self) -> StreamResult<Option<i64>> {
        Ok(self.0.next())
    }
}

/// Use another stream's ids as the other side of a set operation.
pub fn ids<S: LedStream>(stream: S) -> StreamIds<S> {
    StreamIds(stream)
}

/// Use an id sequence, already in non-decreasing order, as the other side
/// of a set operation.
pub fn sorted_ids<I: IntoIterator<Item = i64>>(ids: I) -> SortedIds<I::IntoIter> {
    SortedIds(ids.into_iter())
}

/// Two-cursor walk shared by difference and intersection.
struct CoCursor<S, C> {
    source: S,
    other: C,
    head: Option<i64>,
    started: bool,
    exhausted: bool,
}

impl<S: LedStream, C: IdCursor> CoCursor<S, C> {
    fn new(source: S, other: C) -> Self {
        Self {
            source,
            other,
            head: None,
            started: false,
            exhausted: false,
        }
    }

    /// Advance the other side while it is behind `id`; true when it then
    /// sits on `id`.
    fn meets(&mut self, id: i64) -> StreamResult<bool> {
        if !self.started {
            self.head = self.other.next_id()?;
            self.started = true;
        }
        while !self.exhausted {
            match self.head {
                Some(other) if other < id => self.head = self.other.next_id()?,
                Some(_) => break,
                None => self.exhausted = true,
            }
        }
        Ok(!self.exhausted && self.head == Some(id))
    }

    /// Next source record for which the other side's match equals `keep`.
    fn next_where(&mut self, keep: bool) -> StreamResult<Option<S::Item>> {
        while let Some(record) = self.source.next_record()? {
            if !keep && self.exhausted {
                return Ok(Some(record));
            }
            if keep && self.exhausted {
                return Ok(None);
            }
            let id = record.id()?;
            if self.meets(id)? == keep {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn close(&mut self) -> StreamResult<()> {
        let source = self.source.close();
        let other = self.other.close();
        source.and(other)
    }
}

/// Set difference by id. See [`LedStream::remove_all`].
///
/// A source record is dropped when the other side holds its id; the other
/// side is not advanced past a match, so every duplicate of a matched id is
/// dropped. Once the other side runs out the rest of the source passes
/// through unchanged.
pub struct RemoveAll<S, C>(CoCursor<S, C>);

impl<S: LedStream, C: IdCursor> RemoveAll<S, C> {
    pub(crate) fn new(source: S, other: C) -> Self {
        Self(CoCursor::new(source, other))
    }
}

impl<S: LedStream, C: IdCursor> LedStream for RemoveAll<S, C> {
    type Item = S::Item;

    fn next_record(&mut self) -> StreamResult<Option<S::Item>> {
        self.0.next_where(false)
    }

    fn close(&mut self) -> StreamResult<()> {
        self.0.close()
    }
}

/// Set intersection by id. See [`LedStream::retain_all`].
///
/// Keeps exactly the source records [`RemoveAll`] would drop, so the two
/// partition the source.
pub struct RetainAll<S, C>(CoCursor<S, C>);

impl<S: LedStream, C: IdCursor> RetainAll<S, C> {
    pub(crate) fn new(source: S, other: C) -> Self {
        Self(CoCursor::new(source, other))
    }
}

impl<S: LedStream, C: IdCursor> LedStream for RetainAll<S, C> {
    type Item = S::Item;

    fn next_record(&mut self) -> StreamResult<Option<S::Item>> {
        self.0.next_where(true)
    }

    fn close(&mut self) -> StreamResult<()> {
        self.0.close()
    }
}

#[cfg(test)]
mod tests {
    use led_schema::IdRecord;
    use proptest::prelude::*;

    use super::*;
    use crate::source::from_vec;
    use crate::testutil::id_records;

    fn stream(ids: &[i64]) -> impl LedStream<Item = IdRecord> {
        from_vec(id_records(ids))
    }

    #[test]
    fn remove_all_against_stream() {
        let out = stream(&[1, 2, 3, 5])
            .remove_all(ids(stream(&[2, 5, 6, 8, 10])))
            .collect_ids()
            .unwrap();
        assert_eq!(out, vec![1, 3]);
    }

    #[test]
    fn retain_all_against_stream() {
        let out = stream(&[1, 2, 3, 5])
            .retain_all(ids(stream(&[2, 5, 6, 8, 10])))
            .collect_ids()
            .unwrap();
        assert_eq!(out, vec![2, 5]);
    }

    #[test]
    fn raw_id_sequences() {
        let out = stream(&[1, 2, 3, 5])
            .remove_all(sorted_ids(vec![2, 5, 6, 8, 10]))
            .collect_ids()
            .unwrap();
        assert_eq!(out, vec![1, 3]);
        let out = stream(&[1, 2, 3, 5])
            .retain_all(sorted_ids([2, 5, 6, 8, 10]))
            .collect_ids()
            .unwrap();
        assert_eq!(out, vec![2, 5]);
    }

    #[test]
    fn exhausted_other_passes_source_through() {
        let out = stream(&[4, 5, 6]).remove_all(sorted_ids([1, 2])).collect_ids().unwrap();
        assert_eq!(out, vec![4, 5, 6]);
        let out = stream(&[4, 5, 6]).retain_all(sorted_ids([1, 2])).collect_ids().unwrap();
        assert!(out.is_empty());
        let out = stream(&[4, 5]).remove_all(sorted_ids([])).collect_ids().unwrap();
        assert_eq!(out, vec![4, 5]);
    }

    #[test]
    fn duplicates_on_either_side() {
        let source = [1, 2, 2, 3, 3, 3];
        let other = [2, 2, 3];
        let removed = stream(&source).remove_all(sorted_ids(other)).collect_ids().unwrap();
        let retained = stream(&source).retain_all(sorted_ids(other)).collect_ids().unwrap();
        assert_eq!(removed, vec![1]);
        assert_eq!(retained, vec![2, 2, 3, 3, 3]);
    }

    #[test]
    fn empty_source() {
        let out = stream(&[]).retain_all(sorted_ids([1, 2])).collect_ids().unwrap();
        assert!(out.is_empty());
    }

    fn sorted_vec() -> impl Strategy<Value = Vec<i64>> {
        proptest::collection::vec(0i64..30, 0..40).prop_map(|mut v| {
            v.sort_unstable();
            v
        })
    }

    proptest! {
        #[test]
        fn remove_and_retain_partition_the_source(a in sorted_vec(), b in sorted_vec()) {
            let removed = stream(&a).remove_all(sorted_ids(b.clone())).collect_ids().unwrap();
            let retained = stream(&a).retain_all(ids(stream(&b))).collect_ids().unwrap();

            for id in &removed {
                prop_assert!(!b.contains(id));
            }
            for id in &retained {
                prop_assert!(b.contains(id));
            }
            let mut union: Vec<i64> = removed.iter().chain(retained.iter()).copied().collect();
            union.sort_unstable();
            prop_assert_eq!(union, a);
        }
    }
}
