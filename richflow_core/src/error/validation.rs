//! Validation related error types

use thiserror::Error;

/// Configuration errors raised while building, merging or windowing a chain
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A count argument that must be greater than zero
    #[error("Invalid parameter '{parameter}': must be greater than 0 (got {value})")]
    NonPositive { parameter: String, value: usize },

    /// Range bounds in the wrong order
    #[error("Invalid range: start {start} is greater than end {end}")]
    InvalidRange { start: usize, end: usize },

    /// Streaming and non-streaming sources mixed on one root
    #[error("A streaming source cannot be merged with a non-streaming source")]
    StreamingMismatch,
}

impl ValidationError {
    /// Create a non-positive count error
    pub fn non_positive(parameter: &str, value: usize) -> Self {
        Self::NonPositive {
            parameter: parameter.to_string(),
            value,
        }
    }

    /// Create an invalid range error
    pub fn invalid_range(start: usize, end: usize) -> Self {
        Self::InvalidRange { start, end }
    }

    /// Create a streaming/non-streaming merge error
    pub fn streaming_mismatch() -> Self {
        Self::StreamingMismatch
    }
}
