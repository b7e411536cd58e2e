//! Error types for lsc-train

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrainError>;

#[derive(Error, Debug)]
pub enum TrainError {
    /// `<data dir>/<class>` does not exist
    #[error("Class folder not found: {}", .0.display())]
    MissingClassDir(PathBuf),

    /// Directory traversal failed
    #[error("Failed to scan dataset: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A WAV file could not be turned into features
    #[error("Failed to extract features from {path}: {source}")]
    Features {
        path: PathBuf,
        source: lsc_common::Error,
    },

    /// Not enough samples to train and evaluate
    #[error("Dataset too small: {0}")]
    DatasetTooSmall(String),

    #[error("Invalid training configuration: {0}")]
    InvalidConfig(String),

    /// Model artifact or tensor conversion failure
    #[error(transparent)]
    Model(#[from] lsc_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
