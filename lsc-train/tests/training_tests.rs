//! End-to-end training tests on a tiny generated dataset

use std::path::Path;

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use lsc_common::classifier::ClassifierNetConfig;
use lsc_common::{Classifier, FeatureExtractor, LungSoundClass};
use lsc_train::dataset::{class_counts, load_dataset, train_test_split};
use lsc_train::trainer::{save_artifacts, train, TrainingConfig};
use lsc_train::TrainError;
use tempfile::TempDir;

type TestBackend = Autodiff<NdArray<f32>>;

fn write_tone(path: &Path, freq: f32, seconds: f32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let total = (16_000.0 * seconds) as usize;
    for i in 0..total {
        let t = i as f32 / 16_000.0;
        let value = (2.0 * std::f32::consts::PI * freq * t).sin() * 0.5 * i16::MAX as f32;
        writer.write_sample(value as i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Two files per class plus a stray non-WAV file
fn tiny_dataset() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for (class, freq) in [("normal", 200.0), ("wheezing", 1_200.0)] {
        let dir = temp_dir.path().join(class);
        std::fs::create_dir_all(&dir).unwrap();
        write_tone(&dir.join("a.wav"), freq, 0.5);
        write_tone(&dir.join("b.wav"), freq * 1.1, 0.5);
        std::fs::write(dir.join("notes.txt"), "not audio").unwrap();
    }
    temp_dir
}

#[test]
fn test_dataset_loading_labels_by_folder() {
    let data = tiny_dataset();

    let samples = load_dataset(data.path(), &FeatureExtractor::new()).unwrap();

    assert_eq!(samples.len(), 4);
    assert_eq!(class_counts(&samples), [2, 2]);
    assert_eq!(samples[0].label, LungSoundClass::Normal);
    assert!(samples[0].path.ends_with("normal/a.wav"));
    assert_eq!(samples[3].label, LungSoundClass::Wheezing);
}

#[test]
fn test_missing_class_folder_is_error() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::create_dir_all(temp_dir.path().join("normal")).unwrap();

    let result = load_dataset(temp_dir.path(), &FeatureExtractor::new());

    match result {
        Err(TrainError::MissingClassDir(path)) => assert!(path.ends_with("wheezing")),
        other => panic!("expected missing class folder, got {:?}", other.map(|s| s.len())),
    }
}

#[test]
fn test_train_and_save_artifacts() {
    // Given: a 4-sample dataset split 2/2
    let data = tiny_dataset();
    let samples = load_dataset(data.path(), &FeatureExtractor::new()).unwrap();
    let (train_set, test_set) = train_test_split(samples, 0.5, 2025).unwrap();
    let mut config = TrainingConfig::default()
        .with_num_epochs(2)
        .with_batch_size(2);
    config.model = ClassifierNetConfig::new().with_hidden_size(32);

    // When: trained and saved
    let device = NdArrayDevice::default();
    let trained = train::<TestBackend>(&config, &train_set, &test_set, &device).unwrap();
    assert_eq!(trained.history.epochs.len(), 2);
    let last = trained.history.last().unwrap();
    assert!(last.train_loss.is_finite() && last.val_loss.is_finite());
    assert!((0.0..=1.0).contains(&last.val_accuracy));
    assert_eq!(trained.report.confusion_matrix.total(), test_set.len());

    let out = TempDir::new().unwrap();
    let paths = save_artifacts(out.path(), &config, trained).unwrap();

    // Then: every artifact exists and the smaller model loads for serving
    // through the architecture recorded in config.json
    assert_eq!(paths.model, out.path().join("lung_cnn_model.mpk"));
    for path in [&paths.model, &paths.config, &paths.history, &paths.report] {
        assert!(path.exists(), "{} missing", path.display());
    }
    let history: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&paths.history).unwrap()).unwrap();
    assert_eq!(history["epochs"].as_array().unwrap().len(), 2);

    let classifier = Classifier::load(&paths.model).unwrap();
    let result = classifier.classify(&test_set[0].features).unwrap();
    assert!((0.0..=1.0).contains(&result.confidence));
}

#[test]
fn test_zero_epochs_is_rejected() {
    let data = tiny_dataset();
    let samples = load_dataset(data.path(), &FeatureExtractor::new()).unwrap();
    let (train_set, test_set) = train_test_split(samples, 0.5, 1).unwrap();
    let config = TrainingConfig::default().with_num_epochs(0);

    let result = train::<TestBackend>(&config, &train_set, &test_set, &NdArrayDevice::default());

    assert!(matches!(result, Err(TrainError::InvalidConfig(_))));
}
