use led_store::StoreError;
use thiserror::Error;

use crate::layout::FieldKind;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("duplicate field: {0}")]
    DuplicateField(String),

    #[error("invalid field {name}: {reason}")]
    InvalidField { name: String, reason: String },

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("field {field} is {actual:?}, accessed as {expected:?}")]
    KindMismatch {
        field: String,
        expected: FieldKind,
        actual: FieldKind,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type SchemaResult<T> = Result<T, SchemaError>;
