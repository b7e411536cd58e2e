//! CNN classifier over feature tensors
//!
//! The artifact is a burn record of [`ClassifierNet`] written with
//! `NamedMpkFileRecorder` at full precision. Burn's file recorders force the
//! `.mpk` extension, so paths are normalized to it before any file access.
//! The network architecture comes from the `config.json` training writes
//! beside the artifact, or the default [`ClassifierNetConfig`] without one.

pub mod model;
pub mod result;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::NdArray;
use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::activation::softmax;
use burn::tensor::{Tensor, TensorData};
use ndarray::ArrayView4;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::features::{FeatureTensor, N_FRAMES, N_MELS};
pub use model::{ClassifierNet, ClassifierNetConfig};
pub use result::{round_confidence, Classification, ClassificationReport, LungSoundClass};

/// CPU backend used for serving
pub type InferenceBackend = NdArray<f32>;

/// File extension burn's mpk recorder writes and reads
pub const ARTIFACT_EXTENSION: &str = "mpk";

/// Recorder used for the model artifact
pub type ArtifactRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Training config written beside the artifact; its `model` key holds the
/// network architecture
pub const NETWORK_CONFIG_FILE: &str = "config.json";

/// Shape accepted by [`Classifier::predict`]
pub const INPUT_SHAPE: [usize; 4] = [1, N_MELS, N_FRAMES, 1];

/// Path the recorder actually touches for `path`
pub fn artifact_path(path: &Path) -> PathBuf {
    path.with_extension(ARTIFACT_EXTENSION)
}

/// Loaded, read-only classifier.
///
/// The mutex only guards cloning the module out; burn modules are cheap to
/// clone (parameters are reference counted) and `Send` but not `Sync`, so
/// each prediction runs on its own handle outside the lock.
pub struct Classifier {
    net: Mutex<ClassifierNet<InferenceBackend>>,
    device: NdArrayDevice,
}

impl Classifier {
    /// Wrap an in-memory network
    pub fn from_net(net: ClassifierNet<InferenceBackend>) -> Self {
        Self {
            net: Mutex::new(net),
            device: NdArrayDevice::default(),
        }
    }

    /// Load the artifact at `path` with the architecture recorded beside it
    ///
    /// # Errors
    /// * `Error::ModelLoad` if a `config.json` exists but does not describe a network
    /// * Any error of [`Classifier::load_with_config`]
    pub fn load(path: &Path) -> Result<Self> {
        let config = network_config_for(path)?;
        Self::load_with_config(path, &config)
    }

    /// Load the artifact at `path` into a network built from `config`
    ///
    /// # Errors
    /// * `Error::ModelNotFound` if the artifact file does not exist
    /// * `Error::ModelLoad` if the record cannot be read into the network
    pub fn load_with_config(path: &Path, config: &ClassifierNetConfig) -> Result<Self> {
        let path = artifact_path(path);
        if !path.exists() {
            return Err(Error::ModelNotFound(path));
        }

        let device = NdArrayDevice::default();
        let net = config
            .init::<InferenceBackend>(&device)
            .load_file(path.clone(), &ArtifactRecorder::new(), &device)
            .map_err(|e| Error::ModelLoad(format!("{}: {}", path.display(), e)))?;

        info!(path = %path.display(), "Loaded classifier model");
        Ok(Self {
            net: Mutex::new(net),
            device,
        })
    }

    /// Write the current network to `path` (extension forced to `.mpk`)
    pub fn save(&self, path: &Path) -> Result<PathBuf> {
        let net = self.snapshot()?;
        save_net(net, path)
    }

    /// Predict over a batch of one with shape `(1, N_MELS, N_FRAMES, 1)`
    ///
    /// # Errors
    /// * `Error::Shape` for any other input shape
    /// * `Error::Inference` if the output cannot be read back
    pub fn predict(&self, input: ArrayView4<'_, f32>) -> Result<Classification> {
        let actual = input.shape().to_vec();
        if actual != INPUT_SHAPE {
            return Err(Error::Shape {
                expected: INPUT_SHAPE.to_vec(),
                actual,
            });
        }

        // Channel-last (1, H, W, 1) and channel-first (1, 1, H, W) share a
        // memory order when there is a single channel.
        let values: Vec<f32> = input.iter().copied().collect();
        let tensor = Tensor::<InferenceBackend, 4>::from_data(
            TensorData::new(values, [1, 1, N_MELS, N_FRAMES]),
            &self.device,
        );

        let net = self.snapshot()?;
        let logits = net.forward(tensor);
        let probabilities = softmax(logits, 1)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| Error::Inference(format!("Failed to read model output: {:?}", e)))?;

        let probabilities: [f32; 2] = probabilities.as_slice().try_into().map_err(|_| {
            Error::Inference(format!(
                "Expected 2 output probabilities, got {}",
                probabilities.len()
            ))
        })?;

        let result = Classification::from_probabilities(probabilities);
        debug!(
            label = %result.label,
            confidence = result.confidence,
            "Prediction complete"
        );
        Ok(result)
    }

    /// Predict a single feature tensor
    pub fn classify(&self, features: &FeatureTensor) -> Result<Classification> {
        self.predict(features.to_batch().view())
    }

    fn snapshot(&self) -> Result<ClassifierNet<InferenceBackend>> {
        self.net
            .lock()
            .map(|net| net.clone())
            .map_err(|_| Error::Inference("Classifier lock poisoned".to_string()))
    }
}

/// Network architecture for the artifact at `path`
///
/// Accepts either a full training config (architecture under `model`) or a
/// bare network config.
pub fn network_config_for(path: &Path) -> Result<ClassifierNetConfig> {
    let config_path = path.with_file_name(NETWORK_CONFIG_FILE);
    if !config_path.is_file() {
        debug!("No {} beside the model, using default architecture", NETWORK_CONFIG_FILE);
        return Ok(ClassifierNetConfig::new());
    }

    let bad_config =
        |e: serde_json::Error| Error::ModelLoad(format!("{}: {}", config_path.display(), e));
    let mut value: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&config_path)?).map_err(bad_config)?;
    let network = value.get_mut("model").map(serde_json::Value::take).unwrap_or(value);
    let config = serde_json::from_value(network).map_err(bad_config)?;
    debug!(path = %config_path.display(), "Loaded network architecture");
    Ok(config)
}

/// Save any network record as a model artifact, returning the written path
pub fn save_net<B: burn::prelude::Backend>(net: ClassifierNet<B>, path: &Path) -> Result<PathBuf> {
    let path = artifact_path(path);
    net.save_file(path.clone(), &ArtifactRecorder::new())
        .map_err(|e| Error::ModelLoad(format!("Failed to save {}: {}", path.display(), e)))?;
    Ok(path)
}
