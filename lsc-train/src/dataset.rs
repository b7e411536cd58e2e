//! Labelled dataset discovery and splitting
//!
//! Layout: `<data dir>/normal/*.wav` and `<data dir>/wheezing/*.wav`. Only
//! files directly inside each class folder are used.

use std::path::{Path, PathBuf};

use lsc_common::{FeatureExtractor, FeatureTensor, LungSoundClass};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Result, TrainError};

/// One labelled example
#[derive(Debug, Clone)]
pub struct Sample {
    pub path: PathBuf,
    pub features: FeatureTensor,
    pub label: LungSoundClass,
}

/// `.wav` files directly inside `dir`, sorted by path
pub fn wav_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(TrainError::MissingClassDir(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "wav") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Extract features for every class folder under `data_dir`
///
/// Classes are visited in index order so labels match the model's output
/// columns.
pub fn load_dataset(data_dir: &Path, extractor: &FeatureExtractor) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();

    for class in LungSoundClass::ALL {
        let class_dir = data_dir.join(class.as_str());
        let files = wav_files(&class_dir)?;
        info!(class = %class, files = files.len(), "Loading {}", class_dir.display());

        for path in files {
            let bytes = std::fs::read(&path).map_err(|source| TrainError::Read {
                path: path.clone(),
                source,
            })?;
            let features = extractor
                .from_wav_bytes(&bytes)
                .map_err(|source| TrainError::Features {
                    path: path.clone(),
                    source,
                })?;
            debug!(file = %path.display(), "Features extracted");

            samples.push(Sample {
                path,
                features,
                label: class,
            });
        }
    }

    Ok(samples)
}

/// Seeded shuffle into `(train, test)`
///
/// `ceil(test_fraction * n)` samples are held out, clamped so that both
/// sides keep at least one sample.
pub fn train_test_split(
    mut samples: Vec<Sample>,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<Sample>, Vec<Sample>)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(TrainError::InvalidConfig(format!(
            "test fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }
    if samples.len() < 2 {
        return Err(TrainError::DatasetTooSmall(format!(
            "need at least 2 samples, found {}",
            samples.len()
        )));
    }

    let n = samples.len();
    let n_test = ((test_fraction * n as f64).ceil() as usize).clamp(1, n - 1);

    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let train = samples.split_off(n_test);
    Ok((train, samples))
}

/// Per-class sample counts, indexed like [`LungSoundClass::ALL`]
pub fn class_counts(samples: &[Sample]) -> [usize; 2] {
    let mut counts = [0; 2];
    for sample in samples {
        counts[sample.label.index()] += 1;
    }
    counts
}
