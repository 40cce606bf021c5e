//! Whole-file access: bulk loads, memory maps and parallel decoding.

use std::fs::File;
use std::path::Path;

use led_alloc::ArrayIndexedAllocator;
use led_schema::SchemaDescriptor;
use led_store::{ByteStore, StoreError};
use led_stream::{IndexedLed, LedStream, StreamResult};
use led_types::LedConfig;
use memmap2::Mmap;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{FormatError, FormatResult};
use crate::header::{LedHeader, HEADER_SIZE};
use crate::reader::LedReader;

/// A sorted Led file held in memory, one page per decoded batch.
pub type LoadedLed<D> = IndexedLed<ArrayIndexedAllocator<D>>;

/// Read a whole file into memory as a sorted, randomly indexable Led.
///
/// Fails with [`StreamError::Unsorted`](led_stream::StreamError::Unsorted)
/// if the file's ids are not in order.
pub fn load<D: SchemaDescriptor>(
    path: impl AsRef<Path>,
    descriptor: D,
    config: &LedConfig,
) -> FormatResult<LoadedLed<D>> {
    let mut reader = LedReader::open(path, descriptor.clone(), config)?;
    let mut pages = Vec::new();
    while let Some(batch) = reader.next_batch()? {
        pages.push(batch);
    }
    reader.close()?;
    let allocator = ArrayIndexedAllocator::from_stores(descriptor, pages)?;
    Ok(IndexedLed::new(allocator)?)
}

/// Memory-map an uncompressed file as a read-only Led.
///
/// Records are views straight into the mapping and cannot be written.
pub fn map_file<D: SchemaDescriptor>(
    path: impl AsRef<Path>,
    descriptor: D,
    config: &LedConfig,
) -> FormatResult<LoadedLed<D>> {
    if config.compression.is_compressed() {
        return Err(FormatError::Unsupported(
            "only uncompressed files can be memory-mapped".into(),
        ));
    }
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let header = LedHeader::read_from(&mut file)?;
    header.check(&descriptor)?;

    let size = descriptor.size();
    let payload = (file.metadata()?.len() as usize).saturating_sub(HEADER_SIZE);
    let records = match header.count() {
        Some(n) => {
            let fits = usize::try_from(n)
                .ok()
                .and_then(|n| n.checked_mul(size))
                .is_some_and(|bytes| bytes <= payload);
            if !fits {
                return Err(FormatError::InvalidHeader(format!(
                    "header declares {n} records but the payload holds {payload} bytes"
                )));
            }
            n as usize
        }
        None if payload % size != 0 => {
            return Err(FormatError::InvalidHeader(format!(
                "payload of {payload} bytes is not a whole number of {size}-byte records"
            )));
        }
        None => payload / size,
    };

    // SAFETY: the mapping is read-only; Led files are not modified while
    // they are being read.
    let map = unsafe { Mmap::map(&file) }?;
    let store = ByteStore::mapped(map, config.byte_order).slice(HEADER_SIZE, records * size)?;
    debug!(path = %path.display(), records, "mapped led file");
    let allocator = ArrayIndexedAllocator::from_stores(descriptor, vec![store])?;
    Ok(IndexedLed::new(allocator)?)
}

/// Decode every record of an in-memory block on the rayon pool.
///
/// `block` holds whole records back to back, such as a batch returned by
/// [`LedReader::next_batch`]. Results come back in record order.
pub fn decode_parallel<D, T, F>(block: &ByteStore, descriptor: &D, decode: F) -> FormatResult<Vec<T>>
where
    D: SchemaDescriptor,
    T: Send,
    F: Fn(&D::Record) -> StreamResult<T> + Send + Sync,
{
    let size = descriptor.size();
    if block.len() % size != 0 {
        return Err(StoreError::LengthMismatch {
            expected: block.len() / size * size,
            actual: block.len(),
        }
        .into());
    }
    let order = block.order();
    let bytes = block.to_vec()?;
    let out = bytes
        .par_chunks_exact(size)
        .map(|chunk| {
            let record = descriptor.view(ByteStore::from_vec(chunk.to_vec(), order));
            decode(&record)
        })
        .collect::<StreamResult<Vec<T>>>()?;
    Ok(out)
}

/// Read a file batch by batch, decoding each batch with [`decode_parallel`].
pub fn read_parallel<D, T, F>(
    path: impl AsRef<Path>,
    descriptor: D,
    config: &LedConfig,
    decode: F,
) -> FormatResult<Vec<T>>
where
    D: SchemaDescriptor,
    T: Send,
    F: Fn(&D::Record) -> StreamResult<T> + Send + Sync,
{
    let mut reader = LedReader::open(path, descriptor.clone(), config)?;
    let mut out = Vec::new();
    while let Some(batch) = reader.next_batch()? {
        out.extend(decode_parallel(&batch, &descriptor, &decode)?);
    }
    reader.close()?;
    Ok(out)
}
