//! Slaney mel filter bank
//!
//! Triangular filters on the Slaney mel scale (linear below 1 kHz,
//! logarithmic above) with area normalization, matching the default mel
//! basis of the reference signal library.

use ndarray::{Array2, ArrayView2};

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4_f64.ln() / 27.0
}

pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Mel weight matrix of shape `(n_mels, n_fft / 2 + 1)`
pub struct MelFilterBank {
    weights: Array2<f32>,
}

impl MelFilterBank {
    /// Build Slaney-normalized filters spanning `0 Hz .. sample_rate / 2`
    pub fn slaney(sample_rate: u32, n_fft: usize, n_mels: usize) -> Self {
        let bins = n_fft / 2 + 1;
        let nyquist = sample_rate as f64 / 2.0;

        let fft_freqs: Vec<f64> = (0..bins)
            .map(|i| {
                if bins > 1 {
                    nyquist * i as f64 / (bins - 1) as f64
                } else {
                    0.0
                }
            })
            .collect();

        // n_mels + 2 edge frequencies evenly spaced in mel
        let max_mel = hz_to_mel(nyquist);
        let edges: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(max_mel * i as f64 / (n_mels + 1) as f64))
            .collect();

        let mut weights = Array2::<f32>::zeros((n_mels, bins));
        for m in 0..n_mels {
            let (left, center, right) = (edges[m], edges[m + 1], edges[m + 2]);
            let enorm = 2.0 / (right - left);
            for (k, &f) in fft_freqs.iter().enumerate() {
                let lower = (f - left) / (center - left);
                let upper = (right - f) / (right - center);
                let w = lower.min(upper).max(0.0);
                weights[[m, k]] = (w * enorm) as f32;
            }
        }

        Self { weights }
    }

    pub fn weights(&self) -> ArrayView2<'_, f32> {
        self.weights.view()
    }

    pub fn n_mels(&self) -> usize {
        self.weights.nrows()
    }

    /// Project a `(bins, frames)` power spectrogram onto the mel bands
    pub fn apply(&self, power: ArrayView2<'_, f32>) -> Array2<f32> {
        self.weights.dot(&power)
    }
}
