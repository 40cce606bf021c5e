use thiserror::Error;

/// Any error a Led operation can produce.
#[derive(Debug, Error)]
pub enum LedError {
    #[error("configuration error: {0}")]
    Config(#[from] led_types::TypeError),

    #[error("store error: {0}")]
    Store(#[from] led_store::StoreError),

    #[error("schema error: {0}")]
    Schema(#[from] led_schema::SchemaError),

    #[error("allocator error: {0}")]
    Alloc(#[from] led_alloc::AllocError),

    #[error("stream error: {0}")]
    Stream(#[from] led_stream::StreamError),

    #[error("format error: {0}")]
    Format(#[from] led_format::FormatError),

    #[error("sort error: {0}")]
    Sort(#[from] led_sort::SortError),
}

pub type LedResult<T> = Result<T, LedError>;
