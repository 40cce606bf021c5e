use led_alloc::AllocError;
use led_format::FormatError;
use led_schema::SchemaError;
use led_store::StoreError;
use led_stream::StreamError;
use led_types::TypeError;
use thiserror::Error;

/// Errors from sorting and building sorted collections.
#[derive(Debug, Error)]
pub enum SortError {
    /// The builder was used after it finished.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// Verification found an id smaller than its predecessor.
    #[error("output not sorted: id {id} follows {prev}")]
    Unsorted { prev: i64, id: i64 },

    #[error("format error: {0}")]
    Format(#[from] FormatError),

    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("allocator error: {0}")]
    Alloc(#[from] AllocError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] TypeError),
}

pub type SortResult<T> = Result<T, SortError>;
