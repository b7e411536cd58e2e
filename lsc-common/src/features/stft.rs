//! Short-time power spectrum

use std::sync::Arc;

use ndarray::Array2;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Centered STFT producing a `(n_fft / 2 + 1, frames)` power spectrogram.
///
/// Frames are centered by zero-padding `n_fft / 2` samples on both sides,
/// so a signal of `n` samples yields `1 + n / hop` frames.
pub struct PowerSpectrogram {
    n_fft: usize,
    hop: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl PowerSpectrogram {
    pub fn new(n_fft: usize, hop: usize) -> Self {
        let n_fft = n_fft.max(1);
        let mut planner = FftPlanner::<f32>::new();
        Self {
            n_fft,
            hop: hop.max(1),
            window: hann_window(n_fft),
            fft: planner.plan_fft_forward(n_fft),
        }
    }

    /// Number of frequency bins per frame
    pub fn bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Number of frames produced for a signal of `len` samples
    pub fn frame_count(&self, len: usize) -> usize {
        1 + len / self.hop
    }

    pub fn compute(&self, samples: &[f32]) -> Array2<f32> {
        let pad = self.n_fft / 2;
        let mut padded = vec![0.0_f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let frames = self.frame_count(samples.len());
        let bins = self.bins();
        let mut power = Array2::<f32>::zeros((bins, frames));
        let mut buffer = vec![Complex::new(0.0_f32, 0.0); self.n_fft];

        for frame in 0..frames {
            let start = frame * self.hop;
            let segment = &padded[start..start + self.n_fft];
            for ((slot, &x), &w) in buffer.iter_mut().zip(segment).zip(&self.window) {
                *slot = Complex::new(x * w, 0.0);
            }
            self.fft.process(&mut buffer);
            for (bin, value) in buffer.iter().take(bins).enumerate() {
                power[[bin, frame]] = value.norm_sqr();
            }
        }

        power
    }
}

/// Periodic Hann window of length `n`
pub fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            (0.5 - 0.5 * phase.cos()) as f32
        })
        .collect()
}
