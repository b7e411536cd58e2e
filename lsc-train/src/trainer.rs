//! CNN training loop
//!
//! Plain burn loop: seeded init, per-epoch reshuffle, Adam over
//! cross-entropy on logits, validation on the inner (non-autodiff) backend
//! after every epoch.

use std::path::{Path, PathBuf};

use burn::module::AutodiffModule;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ElementConversion;
use lsc_common::classifier::{save_net, ClassifierNet, ClassifierNetConfig, NETWORK_CONFIG_FILE};
use lsc_common::features::{N_FRAMES, N_MELS};
use lsc_common::LungSoundClass;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info};

use crate::dataset::Sample;
use crate::error::TrainError;
use crate::metrics::ClassificationReport;

/// Artifact file stem; the recorder appends `.mpk`
pub const MODEL_FILE_STEM: &str = "lung_cnn_model";

#[derive(Config)]
pub struct TrainingConfig {
    pub model: ClassifierNetConfig,
    pub optimizer: AdamConfig,
    #[config(default = 100)]
    pub num_epochs: usize,
    #[config(default = 8)]
    pub batch_size: usize,
    #[config(default = 5e-4)]
    pub learning_rate: f64,
    #[config(default = 0.4)]
    pub test_split: f64,
    #[config(default = 2025)]
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig::new(
            ClassifierNetConfig::new(),
            AdamConfig::new().with_epsilon(1e-7),
        )
    }
}

impl TrainingConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if self.num_epochs == 0 {
            return Err(TrainError::InvalidConfig("num_epochs must be > 0".into()));
        }
        if self.batch_size == 0 {
            return Err(TrainError::InvalidConfig("batch_size must be > 0".into()));
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(TrainError::InvalidConfig(format!(
                "learning_rate must be > 0, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Loss and accuracy for one epoch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub train_loss: f64,
    pub train_accuracy: f64,
    pub val_loss: f64,
    pub val_accuracy: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
}

impl TrainingHistory {
    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }
}

/// Trained network with its history and held-out evaluation
pub struct TrainedModel<B: Backend> {
    pub model: ClassifierNet<B>,
    pub history: TrainingHistory,
    pub report: ClassificationReport,
}

/// Files written by [`save_artifacts`]
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub config: PathBuf,
    pub history: PathBuf,
    pub report: PathBuf,
}

/// Train on `train`, validating on `test` after every epoch
pub fn train<B: AutodiffBackend>(
    config: &TrainingConfig,
    train: &[Sample],
    test: &[Sample],
    device: &B::Device,
) -> crate::error::Result<TrainedModel<B::InnerBackend>> {
    config.validate()?;
    if train.is_empty() || test.is_empty() {
        return Err(TrainError::DatasetTooSmall(format!(
            "train and test splits must be non-empty (train {}, test {})",
            train.len(),
            test.len()
        )));
    }

    B::seed(config.seed);
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut model: ClassifierNet<B> = config.model.init(device);
    let mut optim = config.optimizer.init::<B, ClassifierNet<B>>();
    let loss_fn = CrossEntropyLossConfig::new().init(device);

    let mut history = TrainingHistory::default();
    let mut order: Vec<usize> = (0..train.len()).collect();

    info!(
        train = train.len(),
        test = test.len(),
        epochs = config.num_epochs,
        batch_size = config.batch_size,
        "Starting training"
    );

    for epoch in 1..=config.num_epochs {
        order.shuffle(&mut rng);

        let mut loss_sum = 0.0;
        let mut correct = 0;

        for batch_indices in order.chunks(config.batch_size) {
            let batch: Vec<&Sample> = batch_indices.iter().map(|&i| &train[i]).collect();
            let (inputs, targets) = to_tensors::<B>(&batch, device);

            let logits = model.forward(inputs);
            let predictions = predicted_classes(logits.clone())?;
            correct += count_correct(batch.iter().map(|s| s.label), &predictions);

            let loss = loss_fn.forward(logits, targets);
            loss_sum += loss.clone().into_scalar().elem::<f64>() * batch.len() as f64;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(config.learning_rate, model, grads);
        }

        let (val_loss, val_predictions) = evaluate(&model.valid(), test, config.batch_size, device)?;
        let metrics = EpochMetrics {
            epoch,
            train_loss: loss_sum / train.len() as f64,
            train_accuracy: correct as f64 / train.len() as f64,
            val_loss,
            val_accuracy: count_correct(test.iter().map(|s| s.label), &val_predictions) as f64
                / test.len() as f64,
        };
        info!(
            epoch,
            train_loss = metrics.train_loss,
            train_accuracy = metrics.train_accuracy,
            val_loss = metrics.val_loss,
            val_accuracy = metrics.val_accuracy,
            "Epoch complete"
        );
        history.epochs.push(metrics);
    }

    let model = model.valid();
    let (_, predictions) = evaluate(&model, test, config.batch_size, device)?;
    let truth: Vec<LungSoundClass> = test.iter().map(|s| s.label).collect();
    let report = ClassificationReport::from_labels(&truth, &predictions);

    Ok(TrainedModel {
        model,
        history,
        report,
    })
}

/// Mean loss and predicted classes over `samples`
pub fn evaluate<B: Backend>(
    model: &ClassifierNet<B>,
    samples: &[Sample],
    batch_size: usize,
    device: &B::Device,
) -> crate::error::Result<(f64, Vec<LungSoundClass>)> {
    let loss_fn = CrossEntropyLossConfig::new().init(device);
    let mut loss_sum = 0.0;
    let mut predictions = Vec::with_capacity(samples.len());

    for chunk in samples.chunks(batch_size.max(1)) {
        let batch: Vec<&Sample> = chunk.iter().collect();
        let (inputs, targets) = to_tensors::<B>(&batch, device);

        let logits = model.forward(inputs);
        predictions.extend(predicted_classes(logits.clone())?);

        let loss = loss_fn.forward(logits, targets);
        loss_sum += loss.into_scalar().elem::<f64>() * batch.len() as f64;
    }

    let mean = if samples.is_empty() {
        0.0
    } else {
        loss_sum / samples.len() as f64
    };
    debug!(samples = samples.len(), loss = mean, "Evaluation complete");
    Ok((mean, predictions))
}

/// Channel-first inputs `[n, 1, N_MELS, N_FRAMES]` and class-index targets
fn to_tensors<B: Backend>(
    batch: &[&Sample],
    device: &B::Device,
) -> (Tensor<B, 4>, Tensor<B, 1, Int>) {
    let values: Vec<f32> = batch.iter().flat_map(|s| s.features.to_vec()).collect();
    let inputs = Tensor::<B, 4>::from_data(
        TensorData::new(values, [batch.len(), 1, N_MELS, N_FRAMES]),
        device,
    );

    let labels: Vec<i64> = batch.iter().map(|s| s.label.index() as i64).collect();
    let targets = Tensor::<B, 1, Int>::from_data(TensorData::new(labels, [batch.len()]), device);

    (inputs, targets)
}

fn predicted_classes<B: Backend>(logits: Tensor<B, 2>) -> crate::error::Result<Vec<LungSoundClass>> {
    let indices = logits
        .argmax(1)
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| lsc_common::Error::Inference(format!("Failed to read predictions: {:?}", e)))?;

    indices
        .into_iter()
        .map(|i| {
            usize::try_from(i)
                .ok()
                .and_then(LungSoundClass::from_index)
                .ok_or_else(|| {
                    TrainError::Model(lsc_common::Error::Inference(format!(
                        "Predicted class index out of range: {}",
                        i
                    )))
                })
        })
        .collect()
}

fn count_correct(
    labels: impl IntoIterator<Item = LungSoundClass>,
    predictions: &[LungSoundClass],
) -> usize {
    labels
        .into_iter()
        .zip(predictions)
        .filter(|(truth, predicted)| truth == *predicted)
        .count()
}

/// Write the model artifact, training config, history and report to `dir`
pub fn save_artifacts<B: Backend>(
    dir: &Path,
    config: &TrainingConfig,
    trained: TrainedModel<B>,
) -> crate::error::Result<ArtifactPaths> {
    std::fs::create_dir_all(dir)?;

    let config_path = dir.join(NETWORK_CONFIG_FILE);
    config.save(&config_path)?;

    let history_path = dir.join("history.json");
    std::fs::write(&history_path, serde_json::to_vec_pretty(&trained.history)?)?;

    let report_path = dir.join("report.json");
    std::fs::write(&report_path, serde_json::to_vec_pretty(&trained.report)?)?;

    let model_path = save_net(trained.model, &dir.join(MODEL_FILE_STEM))?;
    info!("Model artifact written to {}", model_path.display());

    Ok(ArtifactPaths {
        model: model_path,
        config: config_path,
        history: history_path,
        report: report_path,
    })
}
