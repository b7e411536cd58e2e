//! Mel-spectrogram feature extraction
//!
//! Both entry points end in the same `(N_MELS, N_FRAMES, 1)` tensor, but
//! they condition the waveform differently:
//!
//! | Path | Peak normalize | Waveform length |
//! |---|---|---|
//! | [`FeatureExtractor::from_wav_bytes`] | yes | fixed to `SAMPLE_RATE * DURATION_SECS` |
//! | [`FeatureExtractor::from_pcm16`] | no | whatever the chunk holds |
//!
//! On the streaming path only the spectrogram's time axis is fixed.

pub mod mel;
pub mod spectrogram;
pub mod stft;
pub mod waveform;

use ndarray::{Array2, Array3, Array4, ArrayView3, Axis};
use tracing::debug;

use crate::audio::{decode_wav_bytes, pcm16le_to_f32, resample_mono};
use crate::error::Result;
use mel::MelFilterBank;
use spectrogram::{fix_frames, power_to_db};
use stft::PowerSpectrogram;
use waveform::{fix_length, peak_normalize};

/// Analysis sample rate in Hz
pub const SAMPLE_RATE: u32 = 16_000;

/// Upload clip duration in seconds
pub const DURATION_SECS: usize = 3;

/// Samples per upload clip after length fixing
pub const CLIP_SAMPLES: usize = SAMPLE_RATE as usize * DURATION_SECS;

/// Mel bands per frame
pub const N_MELS: usize = 128;

/// Time frames per spectrogram after fixing
pub const N_FRAMES: usize = 128;

/// FFT size and window length
pub const N_FFT: usize = 2048;

/// Hop between successive frames
pub const HOP_LENGTH: usize = 512;

/// Number of values in one feature tensor
pub const FEATURE_LEN: usize = N_MELS * N_FRAMES;

/// Classifier input: dB mel energies with a trailing channel axis.
///
/// Shape is always `(N_MELS, N_FRAMES, 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTensor {
    data: Array3<f32>,
}

impl FeatureTensor {
    fn from_spectrogram(spectrogram: Array2<f32>) -> Self {
        Self {
            data: spectrogram.insert_axis(Axis(2)),
        }
    }

    pub fn shape(&self) -> [usize; 3] {
        let (bands, frames, channels) = self.data.dim();
        [bands, frames, channels]
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// Values in row-major `(mel, frame, channel)` order
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    /// Batch of one, shape `(1, N_MELS, N_FRAMES, 1)`
    pub fn to_batch(&self) -> Array4<f32> {
        self.data.clone().insert_axis(Axis(0))
    }
}

/// Feature extractor with the FFT plan and mel basis built once.
pub struct FeatureExtractor {
    stft: PowerSpectrogram,
    mel_bank: MelFilterBank,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self {
            stft: PowerSpectrogram::new(N_FFT, HOP_LENGTH),
            mel_bank: MelFilterBank::slaney(SAMPLE_RATE, N_FFT, N_MELS),
        }
    }

    /// Prepare an uploaded waveform: decode, resample, peak-normalize and fix
    /// the length to [`CLIP_SAMPLES`].
    pub fn prepare_wav_waveform(&self, bytes: &[u8]) -> Result<Vec<f32>> {
        let decoded = decode_wav_bytes(bytes)?;
        let mut samples = resample_mono(&decoded.samples, decoded.sample_rate, SAMPLE_RATE)?;
        peak_normalize(&mut samples);
        Ok(fix_length(samples, CLIP_SAMPLES))
    }

    /// Feature tensor for encoded WAV bytes (upload path)
    pub fn from_wav_bytes(&self, bytes: &[u8]) -> Result<FeatureTensor> {
        let waveform = self.prepare_wav_waveform(bytes)?;
        Ok(self.from_waveform(&waveform))
    }

    /// Feature tensor for a raw little-endian 16-bit PCM chunk (streaming path)
    ///
    /// No peak normalization and no waveform length fixing are applied.
    pub fn from_pcm16(&self, bytes: &[u8]) -> Result<FeatureTensor> {
        let samples = pcm16le_to_f32(bytes)?;
        Ok(self.from_waveform(&samples))
    }

    /// Mel spectrogram in dB with the time axis fixed to [`N_FRAMES`]
    pub fn mel_db(&self, samples: &[f32]) -> Array2<f32> {
        let power = self.stft.compute(samples);
        let mel = self.mel_bank.apply(power.view());
        let db = power_to_db(&mel);

        debug!(
            samples = samples.len(),
            frames = db.ncols(),
            "Computed mel spectrogram"
        );

        fix_frames(&db, N_FRAMES)
    }

    /// Feature tensor for an already conditioned 16 kHz waveform
    pub fn from_waveform(&self, samples: &[f32]) -> FeatureTensor {
        FeatureTensor::from_spectrogram(self.mel_db(samples))
    }
}
