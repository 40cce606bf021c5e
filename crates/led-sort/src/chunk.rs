//! Sorted chunk files and the pairwise merger shared by the external sort and
//! the spilling builder.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::path::{Path, PathBuf};

use led_alloc::{Allocator, IndexedAllocator, ManagedIndexedAllocator};
use led_format::{LedReader, LedWriter};
use led_schema::{Schema, SchemaDescriptor};
use led_stream::{LedStream, StreamError};
use led_types::LedConfig;
use tracing::{debug, warn};

use crate::error::{SortError, SortResult};

/// Walk the file at `path` checking that ids never decrease. Returns the
/// number of records.
pub fn verify_sorted<D: SchemaDescriptor>(
    path: impl AsRef<Path>,
    descriptor: D,
    config: &LedConfig,
) -> SortResult<u64> {
    let reader = LedReader::open(path, descriptor, config)?;
    match reader.checked().count() {
        Ok(n) => Ok(n as u64),
        Err(StreamError::Unsorted { prev, id }) => Err(SortError::Unsorted { prev, id }),
        Err(e) => Err(e.into()),
    }
}

/// Buffers records, spills them as sorted uncompressed chunk files into a
/// working directory, and merges chunk files into a final output.
pub(crate) struct Chunks<D: SchemaDescriptor> {
    descriptor: D,
    dir: PathBuf,
    chunk_config: LedConfig,
    buffer: ManagedIndexedAllocator<D>,
    sorted: ManagedIndexedAllocator<D>,
    heap: BinaryHeap<Reverse<(i64, usize)>>,
    next_file: usize,
    verify: bool,
}

impl<D: SchemaDescriptor> Chunks<D> {
    pub(crate) fn new(
        descriptor: D,
        dir: &Path,
        records_in_memory: usize,
        config: &LedConfig,
        verify: bool,
    ) -> Self {
        Self {
            buffer: ManagedIndexedAllocator::new(descriptor.clone(), records_in_memory, config),
            sorted: ManagedIndexedAllocator::new(descriptor.clone(), records_in_memory, config),
            heap: BinaryHeap::with_capacity(records_in_memory),
            descriptor,
            dir: dir.to_path_buf(),
            chunk_config: config.uncompressed(),
            next_file: 0,
            verify,
        }
    }

    #[cfg(test)]
    pub(crate) fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.buffer.len() == self.buffer.capacity()
    }

    /// Copy `record` into the in-memory buffer. The caller spills first
    /// when the buffer is full.
    pub(crate) fn push<R: Schema>(&mut self, record: &R) -> SortResult<()> {
        let mut slot = self.buffer.malloc()?;
        slot.copy_from(record)?;
        Ok(())
    }

    fn next_path(&mut self) -> PathBuf {
        let path = self.dir.join(format!("chunk-{:06}.led", self.next_file));
        self.next_file += 1;
        path
    }

    /// Sort the buffered records into a new chunk file and empty the
    /// buffer. `None` when nothing was buffered.
    pub(crate) fn spill(&mut self) -> SortResult<Option<PathBuf>> {
        let n = self.buffer.len();
        if n == 0 {
            return Ok(None);
        }
        // Slot index breaks ties, so equal ids keep their arrival order.
        self.heap.clear();
        for slot in 0..n {
            let id = self.buffer.get(slot)?.id()?;
            self.heap.push(Reverse((id, slot)));
        }
        while let Some(Reverse((_, slot))) = self.heap.pop() {
            let mut target = self.sorted.malloc()?;
            target.copy_from(&self.buffer.get(slot)?)?;
        }

        let path = self.next_path();
        let mut writer =
            LedWriter::with_count(&path, self.descriptor.clone(), n as u64, &self.chunk_config)?;
        for slot in 0..n {
            writer.append(&self.sorted.get(slot)?)?;
        }
        writer.finish()?;
        self.buffer.clear()?;
        self.sorted.clear()?;
        debug!(path = %path.display(), records = n, "wrote sorted chunk");

        if self.verify {
            verify_sorted(&path, self.descriptor.clone(), &self.chunk_config)?;
        }
        Ok(Some(path))
    }

    /// Merge two sorted files into `dest`. Records of `left` come first on
    /// equal ids.
    fn merge_pair(
        &self,
        left: &Path,
        right: &Path,
        dest: &Path,
        config: &LedConfig,
    ) -> SortResult<u64> {
        let a = LedReader::open(left, self.descriptor.clone(), &self.chunk_config)?;
        let b = LedReader::open(right, self.descriptor.clone(), &self.chunk_config)?;
        let total = a.header().count().unwrap_or(0) + b.header().count().unwrap_or(0);
        let mut writer = LedWriter::with_count(dest, self.descriptor.clone(), total, config)?;
        writer.append_all(a.merge(b))?;
        writer.finish()?;
        debug!(
            left = %left.display(),
            right = %right.display(),
            dest = %dest.display(),
            records = total,
            "merged chunks"
        );
        Ok(total)
    }

    /// Merge `chunks`, in arrival order, into `dest` written with `config`.
    /// Spent chunk files are deleted. Returns the number of pairwise merges.
    pub(crate) fn merge_into(
        &mut self,
        mut chunks: Vec<PathBuf>,
        dest: &Path,
        config: &LedConfig,
    ) -> SortResult<usize> {
        let mut merges = 0;

        // Adjacent pairs only, so equal ids stay in arrival order.
        while chunks.len() > 2 {
            let mut next = Vec::with_capacity(chunks.len().div_ceil(2));
            let mut pending = chunks.into_iter();
            while let Some(left) = pending.next() {
                match pending.next() {
                    Some(right) => {
                        let out = self.next_path();
                        self.merge_pair(&left, &right, &out, &self.chunk_config)?;
                        remove_spent(&left);
                        remove_spent(&right);
                        merges += 1;
                        next.push(out);
                    }
                    None => next.push(left),
                }
            }
            chunks = next;
        }

        let mut last = chunks.into_iter();
        match (last.next(), last.next()) {
            (None, _) => {
                LedWriter::with_count(dest, self.descriptor.clone(), 0, config)?.finish()?;
            }
            (Some(only), None) => {
                let reader = LedReader::open(&only, self.descriptor.clone(), &self.chunk_config)?;
                let count = reader.header().count().unwrap_or(0);
                let mut writer = LedWriter::with_count(dest, self.descriptor.clone(), count, config)?;
                writer.append_all(reader)?;
                writer.finish()?;
                remove_spent(&only);
            }
            (Some(left), Some(right)) => {
                self.merge_pair(&left, &right, dest, config)?;
                remove_spent(&left);
                remove_spent(&right);
                merges += 1;
            }
        }
        Ok(merges)
    }
}

/// Deleting a spent chunk is best effort; the working directory goes away
/// at the end of the run regardless.
fn remove_spent(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "failed to delete spent chunk");
    }
}

#[cfg(test)]
mod tests {
    use led_schema::{IdRecord, IdSchema, LayoutBuilder};
    use led_store::ByteStore;
    use led_types::ByteOrder;

    use super::*;

    fn id_record(id: i64) -> IdRecord {
        let mut r = IdSchema.view(ByteStore::managed(8, ByteOrder::Little));
        r.set_id(id).unwrap();
        r
    }

    #[test]
    fn spill_sorts_and_empties_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let config = LedConfig::default();
        let mut chunks = Chunks::new(IdSchema, dir.path(), 4, &config, true);
        assert!(chunks.spill().unwrap().is_none());
        for id in [9, 2, 7, 2] {
            chunks.push(&id_record(id)).unwrap();
        }
        assert!(chunks.is_full());
        let path = chunks.spill().unwrap().unwrap();
        assert_eq!(chunks.buffered(), 0);

        let ids = LedReader::open(&path, IdSchema, &config.uncompressed())
            .unwrap()
            .collect_ids()
            .unwrap();
        assert_eq!(ids, vec![2, 2, 7, 9]);
    }

    #[test]
    fn spill_keeps_arrival_order_of_equal_ids() {
        let dir = tempfile::tempdir().unwrap();
        let schema = LayoutBuilder::new("tagged").uint("seq", 8).build().unwrap();
        let config = LedConfig::default();
        let mut chunks = Chunks::new(schema.clone(), dir.path(), 8, &config, false);
        for (seq, id) in [5i64, 1, 5, 1, 5].into_iter().enumerate() {
            let mut r = schema.view(ByteStore::managed(schema.size(), ByteOrder::Little));
            r.set_id(id).unwrap();
            r.set_uint("seq", seq as u64).unwrap();
            chunks.push(&r).unwrap();
        }
        let path = chunks.spill().unwrap().unwrap();
        let seqs: Vec<u64> = LedReader::open(&path, schema, &config.uncompressed())
            .unwrap()
            .into_vec()
            .unwrap()
            .iter()
            .map(|r| r.get_uint("seq").unwrap())
            .collect();
        assert_eq!(seqs, vec![1, 3, 0, 2, 4]);
    }

    #[test]
    fn merge_into_deletes_spent_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let config = LedConfig::default();
        let mut chunks = Chunks::new(IdSchema, dir.path(), 2, &config, false);
        let mut paths = Vec::new();
        for pair in [[8, 1], [5, 4], [3, 6], [0, 9], [7, 2]] {
            for id in pair {
                chunks.push(&id_record(id)).unwrap();
            }
            paths.extend(chunks.spill().unwrap());
        }
        let out = tempfile::tempdir().unwrap();
        let dest = out.path().join("sorted.led");
        let merges = chunks.merge_into(paths, &dest, &config).unwrap();
        assert_eq!(merges, 4);

        let ids = LedReader::open(&dest, IdSchema, &config).unwrap().collect_ids().unwrap();
        assert_eq!(ids, (0..10).collect::<Vec<_>>());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn verify_reports_first_decrease() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.led");
        let config = LedConfig::default();
        let mut w = LedWriter::create(&path, IdSchema, &config).unwrap();
        for id in [1, 4, 3] {
            w.append(&id_record(id)).unwrap();
        }
        w.finish().unwrap();
        assert!(matches!(
            verify_sorted(&path, IdSchema, &config),
            Err(SortError::Unsorted { prev: 4, id: 3 })
        ));
    }
}
