//! Process-lifetime inference context
//!
//! Built once at startup and shared behind an `Arc` with every request and
//! stream handler. Holds nothing mutable.

use std::path::Path;

use crate::classifier::{Classification, Classifier};
use crate::error::Result;
use crate::features::FeatureExtractor;

pub struct InferenceContext {
    extractor: FeatureExtractor,
    classifier: Classifier,
}

impl InferenceContext {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            extractor: FeatureExtractor::new(),
            classifier,
        }
    }

    /// Load the model artifact at `model_path`
    pub fn load(model_path: &Path) -> Result<Self> {
        Ok(Self::new(Classifier::load(model_path)?))
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Classify an uploaded WAV file
    pub fn classify_wav_bytes(&self, bytes: &[u8]) -> Result<Classification> {
        let features = self.extractor.from_wav_bytes(bytes)?;
        self.classifier.classify(&features)
    }

    /// Classify one raw 16-bit PCM chunk from a streaming producer
    pub fn classify_pcm16(&self, bytes: &[u8]) -> Result<Classification> {
        let features = self.extractor.from_pcm16(bytes)?;
        self.classifier.classify(&features)
    }
}
