use led_alloc::AllocError;
use led_schema::SchemaError;
use led_store::StoreError;
use led_stream::StreamError;
use led_types::Fingerprint;
use thiserror::Error;

/// Errors reading or writing Led files.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The file was written for a different record layout.
    #[error("schema fingerprint mismatch: expected {expected}, file has {actual}")]
    FingerprintMismatch {
        expected: Fingerprint,
        actual: Fingerprint,
    },

    #[error("element size mismatch: expected {expected} bytes, got {actual}")]
    ElementSizeMismatch { expected: usize, actual: usize },

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The writer was told how many records to expect and got a different
    /// number.
    #[error("declared {declared} records but {written} were written")]
    CountMismatch { declared: u64, written: u64 },

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("allocator error: {0}")]
    Alloc(#[from] AllocError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

pub type FormatResult<T> = Result<T, FormatError>;
