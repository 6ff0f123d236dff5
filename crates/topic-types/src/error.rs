use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("label must not be empty")]
    EmptyLabel,

    #[error("label is {actual} bytes, at most {max} allowed")]
    LabelTooLong { max: usize, actual: usize },
}
