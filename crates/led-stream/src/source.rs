use led_schema::Schema;

use crate::error::StreamResult;
use crate::stream::LedStream;

/// Stream over an iterator of records already in id order.
pub struct IterStream<I> {
    iter: Option<I>,
}

impl<I> LedStream for IterStream<I>
where
    I: Iterator,
    I::Item: Schema,
{
    type Item = I::Item;

    fn next_record(&mut self) -> StreamResult<Option<I::Item>> {
        Ok(self.iter.as_mut().and_then(|it| it.next()))
    }

    fn close(&mut self) -> StreamResult<()> {
        self.iter = None;
        Ok(())
    }
}

/// Stream over records already in id order.
pub fn from_vec<R: Schema>(records: Vec<R>) -> IterStream<std::vec::IntoIter<R>> {
    from_iter(records)
}

pub fn from_iter<I>(records: I) -> IterStream<I::IntoIter>
where
    I: IntoIterator,
    I::Item: Schema,
{
    IterStream {
        iter: Some(records.into_iter()),
    }
}

/// A stream with no records.
pub fn empty<R: Schema>() -> IterStream<std::iter::Empty<R>> {
    IterStream {
        iter: Some(std::iter::empty()),
    }
}

#[cfg(test)]
mod tests {
    use led_schema::IdRecord;

    use super::*;
    use crate::testutil::id_records;

    #[test]
    fn empty_yields_nothing() {
        let mut s = empty::<IdRecord>();
        assert!(s.next_record().unwrap().is_none());
    }

    #[test]
    fn close_stops_the_stream() {
        let mut s = from_vec(id_records(&[1, 2]));
        assert!(s.next_record().unwrap().is_some());
        s.close().unwrap();
        assert!(s.next_record().unwrap().is_none());
    }
}
