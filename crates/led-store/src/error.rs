use thiserror::Error;

/// Errors from byte-store and bit-buffer access.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Access outside the store's window.
    #[error("access out of bounds: offset {offset} + {len} exceeds store of {size} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    /// The field's minimal aligned window would exceed 8 bytes.
    #[error("misaligned bit field: {bit_count} bits at bit {bit_index} need a window wider than 8 bytes")]
    Misalignment { bit_index: u64, bit_count: u32 },

    /// Bit widths are 1..=64.
    #[error("invalid bit width: {0}")]
    InvalidWidth(u32),

    /// Write through a read-only or invalidated view.
    #[error("store is read-only")]
    ReadOnly,

    /// The backing region was freed or recycled after this view was cut.
    #[error("region {region} released (view generation {generation})")]
    Released { region: u64, generation: u64 },

    #[error("length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Failure creating a native mapping.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
