use led_schema::SchemaError;
use led_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AllocError {
    /// No room for another record.
    #[error("allocator overflow: capacity of {capacity} records exhausted")]
    Overflow { capacity: usize },

    /// `pop` on an empty stack.
    #[error("allocator underflow: nothing to pop")]
    Underflow,

    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("index {0} has been freed")]
    FreedIndex(usize),

    /// The record was not allocated from this allocator.
    #[error("record does not belong to this allocator")]
    ForeignRecord,

    /// The record was handed out before the allocator was cleared.
    #[error("record is stale: its allocator was cleared since it was allocated")]
    StaleRecord,

    #[error("allocator has been freed")]
    Freed,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

pub type AllocResult<T> = Result<T, AllocError>;
