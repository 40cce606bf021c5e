use std::fs::File;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use led_schema::SchemaDescriptor;
use led_store::ByteStore;
use led_stream::{LedStream, StreamResult};
use led_types::{ByteOrder, LedConfig};
use tracing::{debug, trace};

use crate::codec::PayloadSource;
use crate::error::FormatResult;
use crate::header::LedHeader;

/// Reads a Led file as a stream of records.
///
/// The header is checked against the descriptor when the file is opened.
/// The payload is decoded one batch at a time into a fresh managed region;
/// records are views into their batch and stay valid after the reader has
/// moved on.
pub struct LedReader<D: SchemaDescriptor> {
    descriptor: D,
    path: PathBuf,
    header: LedHeader,
    order: ByteOrder,
    batch_records: usize,
    source: Option<PayloadSource>,
    batch: Option<ByteStore>,
    batch_len: usize,
    next: usize,
    /// Records left to read, when the header knows.
    remaining: Option<u64>,
}

impl<D: SchemaDescriptor> LedReader<D> {
    /// Open `path`, failing before any payload is read if the file's
    /// fingerprint or record size does not match `descriptor`.
    ///
    /// The payload is decoded with `config.compression`, which must be the
    /// codec the file was written with; the header does not say. A raw
    /// payload read as zstd fails with an I/O error, but a zstd payload
    /// read as raw yields the compressed bytes as records.
    pub fn open(path: impl AsRef<Path>, descriptor: D, config: &LedConfig) -> FormatResult<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let header = LedHeader::read_from(&mut file)?;
        header.check(&descriptor)?;
        debug!(
            path = %path.display(),
            schema = descriptor.name(),
            count = ?header.count(),
            "opened led file"
        );
        Ok(Self {
            source: Some(PayloadSource::open(file, config.compression)?),
            remaining: header.count(),
            descriptor,
            path: path.to_path_buf(),
            header,
            order: config.byte_order,
            batch_records: config.batch_records.max(1),
            batch: None,
            batch_len: 0,
            next: 0,
        })
    }

    pub fn header(&self) -> &LedHeader {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn descriptor(&self) -> &D {
        &self.descriptor
    }

    /// Decode the next batch and return its whole region, skipping record
    /// by record iteration. Records not yet taken from the current batch
    /// are dropped.
    pub fn next_batch(&mut self) -> StreamResult<Option<ByteStore>> {
        self.batch = None;
        self.batch_len = 0;
        self.next = 0;

        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };
        let size = self.descriptor.size();
        let wanted = match self.remaining {
            Some(left) => (left.min(self.batch_records as u64)) as usize,
            None => self.batch_records,
        };
        if wanted == 0 {
            return Ok(None);
        }

        let mut bytes = vec![0u8; wanted * size];
        let filled = source.read_full(&mut bytes)?;
        if filled % size != 0 {
            return Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                format!(
                    "{}: trailing partial record ({} of {} bytes)",
                    self.path.display(),
                    filled % size,
                    size
                ),
            )
            .into());
        }
        let records = filled / size;
        if let Some(left) = self.remaining.as_mut() {
            if records < wanted {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!(
                        "{}: payload ends {} records short of the header count",
                        self.path.display(),
                        *left - records as u64
                    ),
                )
                .into());
            }
            *left -= records as u64;
        }
        if records == 0 {
            return Ok(None);
        }

        bytes.truncate(filled);
        trace!(records, "decoded batch");
        let store = ByteStore::from_vec(bytes, self.order);
        self.batch = Some(store.clone());
        self.batch_len = records;
        self.next = records;
        Ok(Some(store))
    }
}

impl<D: SchemaDescriptor> LedStream for LedReader<D> {
    type Item = D::Record;

    fn next_record(&mut self) -> StreamResult<Option<D::Record>> {
        if self.next == self.batch_len {
            if self.next_batch()?.is_none() {
                return Ok(None);
            }
            self.next = 0;
        }
        let Some(batch) = self.batch.as_ref() else {
            return Ok(None);
        };
        let size = self.descriptor.size();
        let store = batch.slice(self.next * size, size)?;
        self.next += 1;
        Ok(Some(self.descriptor.view(store)))
    }

    fn close(&mut self) -> StreamResult<()> {
        self.source = None;
        self.batch = None;
        self.batch_len = 0;
        self.next = 0;
        Ok(())
    }
}
