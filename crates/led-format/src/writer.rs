use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use led_schema::{Schema, SchemaDescriptor};
use led_stream::LedStream;
use led_types::LedConfig;
use tracing::{debug, trace, warn};

use crate::codec::PayloadSink;
use crate::error::{FormatError, FormatResult};
use crate::header::{patch_count, LedHeader};

/// Streams records into a Led file.
///
/// Records are copied into a batch buffer and written out `batch_records`
/// at a time. Call [`finish`](LedWriter::finish) to close the payload and
/// settle the header count; a writer dropped before that leaves an
/// incomplete file behind.
pub struct LedWriter<D: SchemaDescriptor> {
    descriptor: D,
    path: PathBuf,
    declared: Option<u64>,
    sink: Option<PayloadSink>,
    batch: Vec<u8>,
    batch_records: usize,
    buffered: usize,
    written: u64,
}

impl<D: SchemaDescriptor> LedWriter<D> {
    /// Create (or truncate) `path` for a number of records that will be
    /// known once writing ends.
    pub fn create(path: impl AsRef<Path>, descriptor: D, config: &LedConfig) -> FormatResult<Self> {
        Self::open(path.as_ref(), descriptor, config, None)
    }

    /// Create (or truncate) `path` for exactly `count` records.
    pub fn with_count(
        path: impl AsRef<Path>,
        descriptor: D,
        count: u64,
        config: &LedConfig,
    ) -> FormatResult<Self> {
        Self::open(path.as_ref(), descriptor, config, Some(count))
    }

    fn open(path: &Path, descriptor: D, config: &LedConfig, declared: Option<u64>) -> FormatResult<Self> {
        let mut file = BufWriter::new(File::create(path)?);
        LedHeader::for_descriptor(&descriptor, declared).write_to(&mut file)?;

        let batch_records = config.batch_records.max(1);
        debug!(
            path = %path.display(),
            schema = descriptor.name(),
            ?declared,
            compression = ?config.compression,
            "creating led file"
        );
        Ok(Self {
            batch: Vec::with_capacity(batch_records * descriptor.size()),
            descriptor,
            path: path.to_path_buf(),
            declared,
            sink: Some(PayloadSink::new(file, config.compression)),
            batch_records,
            buffered: 0,
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn descriptor(&self) -> &D {
        &self.descriptor
    }

    /// Records appended so far.
    pub fn len(&self) -> u64 {
        self.written + self.buffered as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_finished(&self) -> bool {
        self.sink.is_none()
    }

    /// Append one record. Its bytes are copied; the record stays usable.
    pub fn append<R: Schema>(&mut self, record: &R) -> FormatResult<()> {
        if self.sink.is_none() {
            return Err(FormatError::IllegalState(format!(
                "append to finished writer for {}",
                self.path.display()
            )));
        }
        if record.size() != self.descriptor.size() {
            return Err(FormatError::ElementSizeMismatch {
                expected: self.descriptor.size(),
                actual: record.size(),
            });
        }
        record.store().extend_vec(&mut self.batch)?;
        self.buffered += 1;
        if self.buffered == self.batch_records {
            self.flush_batch()?;
        }
        Ok(())
    }

    /// Append every record of `stream`, then close it. Returns the number
    /// of records appended.
    pub fn append_all<S: LedStream>(&mut self, mut stream: S) -> FormatResult<u64> {
        let mut n = 0;
        while let Some(record) = stream.next_record()? {
            self.append(&record)?;
            n += 1;
        }
        stream.close()?;
        Ok(n)
    }

    fn flush_batch(&mut self) -> FormatResult<()> {
        if self.buffered == 0 {
            return Ok(());
        }
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| FormatError::IllegalState("writer already finished".into()))?;
        sink.write_all(&self.batch)?;
        trace!(records = self.buffered, "flushed batch");
        self.written += self.buffered as u64;
        self.buffered = 0;
        self.batch.clear();
        Ok(())
    }

    /// Write out the last batch, close the payload and settle the header.
    ///
    /// Returns the number of records in the file. An unknown count is
    /// patched into the header; a declared count that does not match fails
    /// with [`FormatError::CountMismatch`].
    pub fn finish(&mut self) -> FormatResult<u64> {
        if self.sink.is_none() {
            return Err(FormatError::IllegalState(format!(
                "writer for {} already finished",
                self.path.display()
            )));
        }
        self.flush_batch()?;
        if let Some(sink) = self.sink.take() {
            sink.finish()?;
        }

        match self.declared {
            Some(declared) if declared != self.written => {
                return Err(FormatError::CountMismatch {
                    declared,
                    written: self.written,
                });
            }
            Some(_) => {}
            None => patch_count(&self.path, self.written)?,
        }
        debug!(path = %self.path.display(), records = self.written, "finished led file");
        Ok(self.written)
    }
}

impl<D: SchemaDescriptor> Drop for LedWriter<D> {
    fn drop(&mut self) {
        if self.sink.is_some() && !std::thread::panicking() {
            warn!(
                path = %self.path.display(),
                records = self.len(),
                "led writer dropped without finish; file is incomplete"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use led_alloc::{Allocator, ManagedIndexedAllocator};
    use led_schema::{IdSchema, LayoutBuilder};
    use led_store::ByteStore;
    use led_types::{ByteOrder, Compression};

    use super::*;
    use crate::header::HEADER_SIZE;

    fn raw() -> LedConfig {
        LedConfig::default().with_compression(Compression::None)
    }

    fn header_of(path: &Path) -> LedHeader {
        let bytes = std::fs::read(path).unwrap();
        LedHeader::read_from(&mut &bytes[..]).unwrap()
    }

    #[test]
    fn unknown_count_is_patched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.led");
        let mut alloc = ManagedIndexedAllocator::new(IdSchema, 10, &LedConfig::default());
        let mut w = LedWriter::create(&path, IdSchema, &raw().with_batch_records(3)).unwrap();
        for id in 0..10 {
            let mut r = alloc.malloc().unwrap();
            r.set_id(id).unwrap();
            w.append(&r).unwrap();
        }
        assert_eq!(w.len(), 10);
        assert_eq!(w.finish().unwrap(), 10);

        assert_eq!(header_of(&path).count(), Some(10));
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + 80);
        assert_eq!(&bytes[HEADER_SIZE + 8..HEADER_SIZE + 16], &1i64.to_le_bytes());
    }

    #[test]
    fn empty_file_is_just_a_header() {
        let dir = tempfile::tempdir().unwrap();
        for (name, config) in [("raw.led", raw()), ("z.led", LedConfig::default())] {
            let path = dir.path().join(name);
            let mut w = LedWriter::create(&path, IdSchema, &config).unwrap();
            assert!(w.is_empty());
            assert_eq!(w.finish().unwrap(), 0);
            assert_eq!(std::fs::metadata(&path).unwrap().len(), HEADER_SIZE as u64);
            assert_eq!(header_of(&path).count(), Some(0));
        }
    }

    #[test]
    fn declared_count_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.led");
        let mut w = LedWriter::with_count(&path, IdSchema, 2, &raw()).unwrap();
        w.append(&IdSchema.view(ByteStore::managed(8, ByteOrder::Little))).unwrap();
        assert!(matches!(
            w.finish(),
            Err(FormatError::CountMismatch { declared: 2, written: 1 })
        ));
    }

    #[test]
    fn append_after_finish_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = LedWriter::create(dir.path().join("x.led"), IdSchema, &raw()).unwrap();
        w.finish().unwrap();
        assert!(w.is_finished());
        let r = IdSchema.view(ByteStore::managed(8, ByteOrder::Little));
        assert!(matches!(w.append(&r), Err(FormatError::IllegalState(_))));
        assert!(matches!(w.finish(), Err(FormatError::IllegalState(_))));
    }

    #[test]
    fn wrong_record_size_fails() {
        let dir = tempfile::tempdir().unwrap();
        let wide = LayoutBuilder::new("wide").uint("x", 32).build().unwrap();
        let mut w = LedWriter::create(dir.path().join("x.led"), IdSchema, &raw()).unwrap();
        let r = wide.view(ByteStore::managed(wide.size(), ByteOrder::Little));
        assert!(matches!(
            w.append(&r),
            Err(FormatError::ElementSizeMismatch { expected: 8, actual: 12 })
        ));
        w.finish().unwrap();
    }

    #[test]
    fn header_carries_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fp.led");
        let schema = LayoutBuilder::new("p").double("x").build().unwrap();
        let mut w = LedWriter::create(&path, schema.clone(), &LedConfig::default()).unwrap();
        w.finish().unwrap();
        let header = header_of(&path);
        assert_eq!(header.fingerprint, schema.fingerprint());
        assert_eq!(header.record_size(), 16);
    }
}
