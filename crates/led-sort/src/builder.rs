use std::path::{Path, PathBuf};
use std::sync::Mutex;

use led_alloc::{Allocator, IndexedAllocator, ListIndexedAllocator};
use led_format::{load, LoadedLed};
use led_schema::{Schema, SchemaDescriptor};
use led_stream::ArrayLed;
use led_types::LedConfig;
use tempfile::TempDir;
use tracing::debug;

use crate::chunk::Chunks;
use crate::config::SortConfig;
use crate::error::{SortError, SortResult};
use crate::sort::SortReport;

/// Collects records in memory and sorts them by id on [`build`].
///
/// Appended records are copied, so callers may reuse one record to feed
/// many values. Equal ids keep their append order.
///
/// [`build`]: SortingLedBuilder::build
pub struct SortingLedBuilder<D: SchemaDescriptor> {
    allocator: ListIndexedAllocator<D>,
}

impl<D: SchemaDescriptor> SortingLedBuilder<D> {
    pub fn new(descriptor: D, config: &LedConfig) -> Self {
        Self {
            allocator: ListIndexedAllocator::new(descriptor, config.batch_records.max(1), config),
        }
    }

    pub fn append<R: Schema>(&mut self, record: &R) -> SortResult<()> {
        let mut slot = self.allocator.malloc()?;
        slot.copy_from(record)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.allocator.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocator.is_empty()
    }

    pub fn build(self) -> SortResult<ArrayLed<D::Record>> {
        let records = (0..self.allocator.len())
            .map(|i| self.allocator.get(i))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ArrayLed::sort(records)?)
    }
}

struct SpillState<D: SchemaDescriptor> {
    chunks: Chunks<D>,
    spilled: Vec<PathBuf>,
    records: u64,
    finished: bool,
}

/// A sorting builder for more records than fit in memory, shared between
/// threads.
///
/// `append` takes `&self`; appends from many threads are serialized on an
/// internal lock. Every [`SortConfig::records_in_memory`] records the buffer
/// is sorted and spilled to a chunk file in the builder's own temporary
/// directory. [`finish`](Self::finish) merges the chunks into a file, after
/// which the builder accepts nothing more.
pub struct SpillingLedBuilder<D: SchemaDescriptor> {
    descriptor: D,
    led_config: LedConfig,
    state: Mutex<SpillState<D>>,
    work: TempDir,
}

impl<D: SchemaDescriptor> SpillingLedBuilder<D> {
    pub fn new(descriptor: D, config: &SortConfig, led_config: &LedConfig) -> SortResult<Self> {
        config.validate()?;
        let work = config.temp_dir("led-build-")?;
        let chunks = Chunks::new(
            descriptor.clone(),
            work.path(),
            config.records_in_memory,
            led_config,
            config.verify_chunks,
        );
        Ok(Self {
            descriptor,
            led_config: led_config.clone(),
            state: Mutex::new(SpillState {
                chunks,
                spilled: Vec::new(),
                records: 0,
                finished: false,
            }),
            work,
        })
    }

    /// Copy one record into the builder.
    pub fn append<R: Schema>(&self, record: &R) -> SortResult<()> {
        let mut state = self.state.lock().expect("builder mutex poisoned");
        if state.finished {
            return Err(SortError::IllegalState("append to finished builder".into()));
        }
        if state.chunks.is_full() {
            let spilled = state.chunks.spill()?;
            state.spilled.extend(spilled);
        }
        state.chunks.push(record)?;
        state.records += 1;
        Ok(())
    }

    /// Records appended so far.
    pub fn len(&self) -> u64 {
        self.state.lock().expect("builder mutex poisoned").records
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_finished(&self) -> bool {
        self.state.lock().expect("builder mutex poisoned").finished
    }

    /// Merge everything appended into a sorted file at `dest`, written with
    /// the builder's [`LedConfig`].
    pub fn finish(&self, dest: impl AsRef<Path>) -> SortResult<SortReport> {
        let dest = dest.as_ref();
        let mut state = self.state.lock().expect("builder mutex poisoned");
        if state.finished {
            return Err(SortError::IllegalState("builder already finished".into()));
        }
        state.finished = true;

        let last = state.chunks.spill()?;
        state.spilled.extend(last);
        let spilled = std::mem::take(&mut state.spilled);
        let chunks = spilled.len();
        let merges = state.chunks.merge_into(spilled, dest, &self.led_config)?;
        debug!(
            schema = self.descriptor.name(),
            dest = %dest.display(),
            records = state.records,
            chunks,
            "finished spilling builder"
        );
        Ok(SortReport {
            records: state.records,
            chunks,
            merges,
        })
    }

    /// Finish into the builder's own directory and load the result into
    /// memory.
    pub fn build(&self) -> SortResult<LoadedLed<D>> {
        let dest = self.work.path().join("built.led");
        self.finish(&dest)?;
        Ok(load(&dest, self.descriptor.clone(), &self.led_config)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use led_format::LedReader;
    use led_schema::{IdSchema, LayoutBuilder};
    use led_store::ByteStore;
    use led_stream::{Led, LedStream};
    use led_types::ByteOrder;

    use super::*;

    fn id_record(id: i64) -> led_schema::IdRecord {
        let mut r = IdSchema.view(ByteStore::managed(8, ByteOrder::Little));
        r.set_id(id).unwrap();
        r
    }

    #[test]
    fn sorting_builder_orders_by_id() {
        let mut builder = SortingLedBuilder::new(IdSchema, &LedConfig::default().with_batch_records(2));
        let mut r = id_record(0);
        for id in [3, 1, 2] {
            r.set_id(id).unwrap();
            builder.append(&r).unwrap();
        }
        assert_eq!(builder.len(), 3);
        let led = builder.build().unwrap();
        assert_eq!(led.stream().collect_ids().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn sorting_builder_is_stable() {
        let schema = LayoutBuilder::new("tagged").uint("seq", 8).build().unwrap();
        let mut builder = SortingLedBuilder::new(schema.clone(), &LedConfig::default());
        let mut r = schema.view(ByteStore::managed(schema.size(), ByteOrder::Little));
        for (seq, id) in [2i64, 1, 2, 1].into_iter().enumerate() {
            r.set_id(id).unwrap();
            r.set_uint("seq", seq as u64).unwrap();
            builder.append(&r).unwrap();
        }
        let led = builder.build().unwrap();
        let seqs: Vec<u64> = led.iter().map(|r| r.get_uint("seq").unwrap()).collect();
        assert_eq!(seqs, vec![1, 3, 0, 2]);
    }

    #[test]
    fn spilling_builder_spills_and_merges() {
        let sort_config = SortConfig::default().with_records_in_memory(10);
        let builder = SpillingLedBuilder::new(IdSchema, &sort_config, &LedConfig::default()).unwrap();
        for id in (0..95).rev() {
            builder.append(&id_record(id)).unwrap();
        }
        let out = tempfile::tempdir().unwrap();
        let dest = out.path().join("sorted.led");
        let report = builder.finish(&dest).unwrap();
        assert_eq!(report.records, 95);
        assert_eq!(report.chunks, 10);

        let ids = LedReader::open(&dest, IdSchema, &LedConfig::default())
            .unwrap()
            .collect_ids()
            .unwrap();
        assert_eq!(ids, (0..95).collect::<Vec<_>>());
    }

    #[test]
    fn spilling_builder_rejects_use_after_finish() {
        let builder =
            SpillingLedBuilder::new(IdSchema, &SortConfig::default(), &LedConfig::default()).unwrap();
        builder.append(&id_record(1)).unwrap();
        let led = builder.build().unwrap();
        assert_eq!(led.len(), 1);
        assert!(builder.is_finished());
        assert!(matches!(
            builder.append(&id_record(2)),
            Err(SortError::IllegalState(_))
        ));
        let out = tempfile::tempdir().unwrap();
        assert!(matches!(
            builder.finish(out.path().join("again.led")),
            Err(SortError::IllegalState(_))
        ));
    }

    #[test]
    fn dropped_builder_removes_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        let sort_config = SortConfig::default()
            .with_records_in_memory(4)
            .with_work_dir(&work);
        let builder = SpillingLedBuilder::new(IdSchema, &sort_config, &LedConfig::default()).unwrap();
        for id in (0..10).rev() {
            builder.append(&id_record(id)).unwrap();
        }
        let spilled = std::fs::read_dir(&work).unwrap().next().unwrap().unwrap().path();
        assert_eq!(std::fs::read_dir(&spilled).unwrap().count(), 2);

        drop(builder);
        assert!(!spilled.exists());
        assert_eq!(std::fs::read_dir(&work).unwrap().count(), 0);
    }

    #[test]
    fn concurrent_appends() {
        let sort_config = SortConfig::default().with_records_in_memory(64);
        let builder =
            Arc::new(SpillingLedBuilder::new(IdSchema, &sort_config, &LedConfig::default()).unwrap());
        let handles: Vec<_> = (0..8i64)
            .map(|t| {
                let builder = Arc::clone(&builder);
                thread::spawn(move || {
                    let mut r = id_record(0);
                    for i in 0..250i64 {
                        r.set_id(i * 8 + t).unwrap();
                        builder.append(&r).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(builder.len(), 2000);

        let led = builder.build().unwrap();
        assert_eq!(led.len(), 2000);
        assert_eq!(led.stream().collect_ids().unwrap(), (0..2000).collect::<Vec<_>>());
    }
}
