use led_alloc::AllocError;
use led_schema::SchemaError;
use led_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A record's id is smaller than the one before it.
    #[error("stream not sorted: id {id} follows {prev}")]
    Unsorted { prev: i64, id: i64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("allocator error: {0}")]
    Alloc(#[from] AllocError),
}

pub type StreamResult<T> = Result<T, StreamError>;
