use std::path::Path;

use led_format::{load, map_file, LedReader, LedWriter, LoadedLed};
use led_schema::SchemaDescriptor;
use led_sort::{
    verify_sorted, ExternalMergeSort, SortConfig, SortReport, SortingLedBuilder, SpillingLedBuilder,
};
use led_stream::LedStream;
use led_types::LedConfig;
use tracing::debug;

use crate::error::LedResult;

/// File operations for one record type.
///
/// Bundles a descriptor with the [`LedConfig`] and [`SortConfig`] every
/// operation runs under, so call sites name them once.
#[derive(Clone, Debug)]
pub struct LedFiles<D> {
    descriptor: D,
    config: LedConfig,
    sort_config: SortConfig,
}

impl<D: SchemaDescriptor> LedFiles<D> {
    pub fn new(descriptor: D) -> Self {
        Self {
            descriptor,
            config: LedConfig::default(),
            sort_config: SortConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LedConfig) -> LedResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn with_sort_config(mut self, sort_config: SortConfig) -> LedResult<Self> {
        sort_config.validate()?;
        self.sort_config = sort_config;
        Ok(self)
    }

    pub fn descriptor(&self) -> &D {
        &self.descriptor
    }

    pub fn config(&self) -> &LedConfig {
        &self.config
    }

    pub fn sort_config(&self) -> &SortConfig {
        &self.sort_config
    }

    pub fn writer(&self, path: impl AsRef<Path>) -> LedResult<LedWriter<D>> {
        Ok(LedWriter::create(path, self.descriptor.clone(), &self.config)?)
    }

    /// Write every record of `stream` to a new file. Returns the count.
    pub fn write<S: LedStream>(&self, path: impl AsRef<Path>, stream: S) -> LedResult<u64> {
        let path = path.as_ref();
        let mut writer = self.writer(path)?;
        writer.append_all(stream)?;
        let count = writer.finish()?;
        debug!(path = %path.display(), count, "wrote led file");
        Ok(count)
    }

    pub fn reader(&self, path: impl AsRef<Path>) -> LedResult<LedReader<D>> {
        Ok(LedReader::open(path, self.descriptor.clone(), &self.config)?)
    }

    pub fn load(&self, path: impl AsRef<Path>) -> LedResult<LoadedLed<D>> {
        Ok(load(path, self.descriptor.clone(), &self.config)?)
    }

    /// Memory-map an uncompressed file. See [`led_format::map_file`].
    pub fn map(&self, path: impl AsRef<Path>) -> LedResult<LoadedLed<D>> {
        Ok(map_file(path, self.descriptor.clone(), &self.config)?)
    }

    pub fn sort(&self, source: impl AsRef<Path>, dest: impl AsRef<Path>) -> LedResult<SortReport> {
        Ok(self.sorter().sort(source, dest)?)
    }

    pub fn sorter(&self) -> ExternalMergeSort<D> {
        ExternalMergeSort::new(
            self.descriptor.clone(),
            self.sort_config.clone(),
            self.config.clone(),
        )
    }

    /// Check a file's id order. Returns its record count.
    pub fn verify(&self, path: impl AsRef<Path>) -> LedResult<u64> {
        Ok(verify_sorted(path, self.descriptor.clone(), &self.config)?)
    }

    pub fn sorting_builder(&self) -> SortingLedBuilder<D> {
        SortingLedBuilder::new(self.descriptor.clone(), &self.config)
    }

    pub fn spilling_builder(&self) -> LedResult<SpillingLedBuilder<D>> {
        Ok(SpillingLedBuilder::new(
            self.descriptor.clone(),
            &self.sort_config,
            &self.config,
        )?)
    }
}
