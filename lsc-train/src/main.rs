//! lsc-train: train the lung sound CNN from labelled WAV folders
//!
//! Expects `<data dir>/normal/*.wav` and `<data dir>/wheezing/*.wav`, and
//! writes `lung_cnn_model.mpk` plus `config.json`, `history.json` and
//! `report.json` into the artifact directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use clap::Parser;
use lsc_common::FeatureExtractor;
use lsc_train::dataset::{class_counts, load_dataset, train_test_split};
use lsc_train::trainer::{save_artifacts, train, TrainingConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type TrainingBackend = Autodiff<NdArray<f32>>;

/// Command-line arguments for lsc-train
#[derive(Parser, Debug)]
#[command(name = "lsc-train")]
#[command(about = "Train the lung sound classifier")]
#[command(version)]
struct Args {
    /// Folder containing one sub-folder of WAV files per class
    #[arg(short, long, default_value = "data", env = "LSC_DATA_DIR")]
    data_dir: PathBuf,

    /// Output folder for the model artifact and training reports
    #[arg(short, long, default_value = ".", env = "LSC_ARTIFACT_DIR")]
    artifact_dir: PathBuf,

    #[arg(long, default_value_t = 100)]
    epochs: usize,

    #[arg(long, default_value_t = 8)]
    batch_size: usize,

    #[arg(long, default_value_t = 5e-4)]
    learning_rate: f64,

    /// Fraction of samples held out for validation
    #[arg(long, default_value_t = 0.4)]
    test_split: f64,

    #[arg(long, default_value_t = 2025)]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lsc_train=info,lsc_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("Starting lsc-train v{}", env!("CARGO_PKG_VERSION"));

    let config = TrainingConfig::default()
        .with_num_epochs(args.epochs)
        .with_batch_size(args.batch_size)
        .with_learning_rate(args.learning_rate)
        .with_test_split(args.test_split)
        .with_seed(args.seed);

    let extractor = FeatureExtractor::new();
    let samples = load_dataset(&args.data_dir, &extractor)
        .with_context(|| format!("Failed to load dataset from {}", args.data_dir.display()))?;
    let [normal, wheezing] = class_counts(&samples);
    info!(normal, wheezing, "Dataset loaded");

    let (train_set, test_set) = train_test_split(samples, config.test_split, config.seed)?;
    info!(train = train_set.len(), test = test_set.len(), "Dataset split");

    let device = NdArrayDevice::default();
    let trained = train::<TrainingBackend>(&config, &train_set, &test_set, &device)?;

    info!("Classification report\n{}", trained.report);

    let paths = save_artifacts(&args.artifact_dir, &config, trained)
        .with_context(|| format!("Failed to write artifacts to {}", args.artifact_dir.display()))?;
    info!(
        model = %paths.model.display(),
        config = %paths.config.display(),
        history = %paths.history.display(),
        report = %paths.report.display(),
        "Training complete"
    );

    Ok(())
}
