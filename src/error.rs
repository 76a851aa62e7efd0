//! Error types for the codec and the table layer

use thiserror::Error;

/// Errors that can occur while encoding values or talking to a table
#[derive(Error, Debug)]
pub enum CodecError {
    /// The value has a shape the wire format cannot represent.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("JSON conversion error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

impl CodecError {
    pub(crate) fn type_mismatch(msg: impl Into<String>) -> Self {
        CodecError::TypeMismatch(msg.into())
    }

    /// True when the error came from `encode` rejecting an unsupported shape.
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, CodecError::TypeMismatch(_))
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
