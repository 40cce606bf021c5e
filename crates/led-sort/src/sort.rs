use std::path::Path;
use std::time::Instant;

use led_format::LedReader;
use led_schema::SchemaDescriptor;
use led_stream::LedStream;
use led_types::LedConfig;
use tracing::info;

use crate::chunk::{verify_sorted, Chunks};
use crate::config::SortConfig;
use crate::error::SortResult;

/// Summary of one sort run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SortReport {
    /// Records in the output.
    pub records: u64,
    /// Sorted chunk files written in the first phase.
    pub chunks: usize,
    /// Pairwise merges, including the final one into the output.
    pub merges: usize,
}

/// Sorts Led files larger than memory by id.
///
/// The source is read in windows of [`SortConfig::records_in_memory`]
/// records; each window is sorted in memory and written to an uncompressed
/// chunk file in a private working directory. Chunks are then merged
/// pairwise until two remain, and those two are merged into the
/// destination, which is written with the codec of the [`LedConfig`].
/// Equal ids keep their source order.
///
/// The working directory is removed when the run ends, whether it
/// succeeded or not.
pub struct ExternalMergeSort<D: SchemaDescriptor> {
    descriptor: D,
    config: SortConfig,
    led_config: LedConfig,
}

impl<D: SchemaDescriptor> ExternalMergeSort<D> {
    pub fn new(descriptor: D, config: SortConfig, led_config: LedConfig) -> Self {
        Self {
            descriptor,
            config,
            led_config,
        }
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Sort the Led file at `source` into a new file at `dest`.
    pub fn sort(&self, source: impl AsRef<Path>, dest: impl AsRef<Path>) -> SortResult<SortReport> {
        let reader = LedReader::open(source, self.descriptor.clone(), &self.led_config)?;
        self.sort_stream(reader, dest)
    }

    /// Sort the records of `source`, in whatever order they come, into a
    /// new file at `dest`. The stream is closed when it has been drained.
    pub fn sort_stream<S: LedStream>(&self, mut source: S, dest: impl AsRef<Path>) -> SortResult<SortReport> {
        self.config.validate()?;
        let dest = dest.as_ref();
        let started = Instant::now();
        let work = self.config.temp_dir("led-sort-")?;
        let mut chunks = Chunks::new(
            self.descriptor.clone(),
            work.path(),
            self.config.records_in_memory,
            &self.led_config,
            self.config.verify_chunks,
        );

        let mut spilled = Vec::new();
        let mut records = 0u64;
        while let Some(record) = source.next_record()? {
            if chunks.is_full() {
                spilled.extend(chunks.spill()?);
            }
            chunks.push(&record)?;
            records += 1;
        }
        source.close()?;
        spilled.extend(chunks.spill()?);

        let report = SortReport {
            records,
            chunks: spilled.len(),
            merges: chunks.merge_into(spilled, dest, &self.led_config)?,
        };
        if self.config.verify_chunks {
            verify_sorted(dest, self.descriptor.clone(), &self.led_config)?;
        }
        info!(
            schema = self.descriptor.name(),
            dest = %dest.display(),
            records = report.records,
            chunks = report.chunks,
            merges = report.merges,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "external sort complete"
        );
        Ok(report)
    }
}
