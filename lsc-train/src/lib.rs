//! Training pipeline for the lung sound CNN
//!
//! Loads labelled WAV folders through the upload feature path, trains the
//! shared [`lsc_common::classifier::ClassifierNet`] and evaluates it on a
//! held-out split.

pub mod dataset;
pub mod error;
pub mod metrics;
pub mod trainer;

pub use error::{Result, TrainError};
