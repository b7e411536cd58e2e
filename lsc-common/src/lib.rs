//! # Lung Sound Classifier Common Library
//!
//! Shared core for the lung sound services:
//! - Audio decoding, resampling and raw PCM conversion
//! - Mel-spectrogram feature extraction with a fixed `(128, 128, 1)` output
//! - The CNN classifier (definition, artifact loading, prediction)
//! - The inference context injected into every serving handler

pub mod audio;
pub mod classifier;
pub mod error;
pub mod features;
pub mod pipeline;

pub use classifier::{Classification, ClassificationReport, Classifier, LungSoundClass};
pub use error::{Error, Result};
pub use features::{FeatureExtractor, FeatureTensor};
pub use pipeline::InferenceContext;
