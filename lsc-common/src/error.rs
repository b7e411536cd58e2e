//! Common error types for the lung sound classifier

use std::path::PathBuf;

use thiserror::Error;

/// Common result type for feature extraction and inference
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the shared core
#[derive(Error, Debug)]
pub enum Error {
    /// Audio bytes could not be decoded (corrupt or unsupported container)
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Input that is well-formed bytes but violates the input contract
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Tensor handed to the classifier has the wrong shape
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    Shape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Model artifact file does not exist
    #[error("Model artifact not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    /// Model artifact exists but could not be deserialized or saved
    #[error("Model artifact error: {0}")]
    ModelLoad(String),

    /// Forward pass or output conversion failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
