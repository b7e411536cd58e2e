//! Audio input handling
//!
//! Turns the two accepted input forms into mono f32 waveforms:
//! encoded WAV bytes (decoded with symphonia, resampled with rubato) and
//! raw little-endian 16-bit PCM frames from streaming clients.

pub mod decoder;
pub mod pcm;
pub mod resampler;

pub use decoder::{decode_wav_bytes, DecodedAudio};
pub use pcm::{pcm16le_samples, pcm16le_to_f32};
pub use resampler::resample_mono;
