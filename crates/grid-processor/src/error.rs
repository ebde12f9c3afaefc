//! Error types for grid processing.

use thiserror::Error;

/// Errors that can occur while reshaping or resampling a grid.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridProcessorError {
    /// The number of values does not match the declared grid shape.
    #[error("grid has {actual} values but its shape requires {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The grid shape itself cannot be resolved.
    #[error("invalid grid shape: {0}")]
    InvalidShape(String),
}

impl GridProcessorError {
    /// Create an InvalidShape error.
    pub fn invalid_shape(msg: impl Into<String>) -> Self {
        Self::InvalidShape(msg.into())
    }
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridProcessorError>;
