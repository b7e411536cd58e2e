//! Classifier and inference context integration tests
//!
//! Uses freshly initialized networks; predictions are meaningless but the
//! output contract (labels, probability range, artifact round trip) holds.

mod helpers;

use burn::backend::ndarray::NdArrayDevice;
use helpers::{pcm_bytes, tone, wav_bytes};
use lsc_common::classifier::{artifact_path, ClassifierNetConfig, InferenceBackend};
use lsc_common::features::SAMPLE_RATE;
use lsc_common::{Classifier, Error, FeatureExtractor, InferenceContext, LungSoundClass};
use tempfile::TempDir;

fn untrained_classifier() -> Classifier {
    let device = NdArrayDevice::default();
    Classifier::from_net(ClassifierNetConfig::new().init::<InferenceBackend>(&device))
}

#[test]
fn test_silent_wav_end_to_end() {
    // Given: 1 s of silence at 16 kHz mono
    let context = InferenceContext::new(untrained_classifier());
    let bytes = wav_bytes(SAMPLE_RATE, 1, &vec![0; SAMPLE_RATE as usize]);

    // When: classified through the upload path
    let result = context.classify_wav_bytes(&bytes).unwrap();

    // Then: a known label with a confidence in [0, 1]
    assert!(LungSoundClass::ALL.contains(&result.label));
    assert!((0.0..=1.0).contains(&result.confidence));
    let sum: f32 = result.probabilities.iter().sum();
    assert!((sum - 1.0).abs() < 1e-4);
}

#[test]
fn test_streaming_chunk_end_to_end() {
    let context = InferenceContext::new(untrained_classifier());
    let bytes = pcm_bytes(&tone(SAMPLE_RATE, 0.1, 440.0, 0.5));

    let report = context.classify_pcm16(&bytes).unwrap().report();

    assert!(report.confidence >= 0.0 && report.confidence <= 1.0);
    let scaled = report.confidence * 10_000.0;
    assert!((scaled - scaled.round()).abs() < 1e-6);
}

#[test]
fn test_predictions_are_repeatable() {
    let context = InferenceContext::new(untrained_classifier());
    let bytes = wav_bytes(SAMPLE_RATE, 1, &tone(SAMPLE_RATE, 1.5, 700.0, 0.3));

    let first = context.classify_wav_bytes(&bytes).unwrap();
    let second = context.classify_wav_bytes(&bytes).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_decode_failure_surfaces_as_error() {
    let context = InferenceContext::new(untrained_classifier());
    let result = context.classify_wav_bytes(b"RIFF\x00\x00");
    assert!(matches!(result, Err(Error::Decode(_))));
}

#[test]
fn test_artifact_round_trip() {
    // Given: a saved network
    let temp_dir = TempDir::new().unwrap();
    let classifier = untrained_classifier();
    let written = classifier.save(&temp_dir.path().join("lung_cnn_model")).unwrap();
    assert_eq!(written, temp_dir.path().join("lung_cnn_model.mpk"));
    assert!(written.exists());

    // When: it is loaded back
    let loaded = Classifier::load(&written).unwrap();

    // Then: both produce identical probabilities
    let bytes = wav_bytes(SAMPLE_RATE, 1, &tone(SAMPLE_RATE, 1.0, 250.0, 0.8));
    let features = FeatureExtractor::new().from_wav_bytes(&bytes).unwrap();
    let before = classifier.classify(&features).unwrap();
    let after = loaded.classify(&features).unwrap();
    assert_eq!(before.probabilities, after.probabilities);
}

#[test]
fn test_non_default_architecture_loads_from_config_file() {
    // Given: a smaller network saved next to the config.json describing it
    let temp_dir = TempDir::new().unwrap();
    let config = ClassifierNetConfig::new()
        .with_conv1_channels(8)
        .with_conv2_channels(16)
        .with_hidden_size(16);
    let net = config.init::<InferenceBackend>(&NdArrayDevice::default());
    let written = Classifier::from_net(net)
        .save(&temp_dir.path().join("lung_cnn_model"))
        .unwrap();
    let training = serde_json::json!({ "model": config, "seed": 7 });
    std::fs::write(
        temp_dir.path().join("config.json"),
        serde_json::to_vec_pretty(&training).unwrap(),
    )
    .unwrap();

    // When: loaded without naming the architecture
    let loaded = Classifier::load(&written).unwrap();

    // Then: it predicts normally
    let bytes = wav_bytes(SAMPLE_RATE, 1, &tone(SAMPLE_RATE, 1.0, 250.0, 0.8));
    let features = FeatureExtractor::new().from_wav_bytes(&bytes).unwrap();
    let result = loaded.classify(&features).unwrap();
    assert!((0.0..=1.0).contains(&result.confidence));
}

#[test]
fn test_missing_artifact_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.mpk");

    match InferenceContext::load(&path) {
        Err(Error::ModelNotFound(p)) => assert_eq!(p, artifact_path(&path)),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("loading a missing artifact must fail"),
    }
}

#[test]
fn test_unreadable_artifact_is_load_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.mpk");
    std::fs::write(&path, b"not a record").unwrap();

    assert!(matches!(Classifier::load(&path), Err(Error::ModelLoad(_))));
}

#[test]
fn test_concurrent_predictions() {
    let context = std::sync::Arc::new(InferenceContext::new(untrained_classifier()));
    let bytes = pcm_bytes(&tone(SAMPLE_RATE, 0.1, 440.0, 0.5));
    let expected = context.classify_pcm16(&bytes).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let context = context.clone();
            let bytes = bytes.clone();
            std::thread::spawn(move || context.classify_pcm16(&bytes).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
