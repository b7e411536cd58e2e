//! Decibel scaling and time-axis fixing of mel spectrograms

use ndarray::{s, Array2};

/// Lower clamp applied before taking the logarithm
pub const AMIN: f32 = 1e-10;

/// Dynamic range kept below the loudest value
pub const TOP_DB: f32 = 80.0;

/// Convert power to dB referenced to the spectrogram's own maximum.
///
/// The loudest cell maps to 0 dB and nothing falls below `-TOP_DB`.
pub fn power_to_db(power: &Array2<f32>) -> Array2<f32> {
    let reference = power.iter().fold(0.0_f32, |acc, &p| acc.max(p));
    let ref_db = 10.0 * reference.max(AMIN).log10();

    let mut db = power.mapv(|p| 10.0 * p.max(AMIN).log10() - ref_db);
    let max_db = db.iter().fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
    if max_db.is_finite() {
        let floor = max_db - TOP_DB;
        db.mapv_inplace(|v| v.max(floor));
    }
    db
}

/// Truncate or zero-pad the time axis (columns) to exactly `frames`.
pub fn fix_frames(spectrogram: &Array2<f32>, frames: usize) -> Array2<f32> {
    let (bands, current) = spectrogram.dim();
    let keep = current.min(frames);
    let mut fixed = Array2::<f32>::zeros((bands, frames));
    fixed
        .slice_mut(s![.., ..keep])
        .assign(&spectrogram.slice(s![.., ..keep]));
    fixed
}
