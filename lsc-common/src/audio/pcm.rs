//! Raw PCM frame conversion for the streaming path

use crate::error::{Error, Result};

/// Scale applied to signed 16-bit samples
pub const PCM16_SCALE: f32 = 32768.0;

/// Interpret bytes as little-endian signed 16-bit samples
///
/// # Errors
/// * `Error::InvalidInput` when the buffer holds a trailing half sample
pub fn pcm16le_samples(bytes: &[u8]) -> Result<Vec<i16>> {
    if bytes.len() % 2 != 0 {
        return Err(Error::InvalidInput(format!(
            "PCM buffer length {} is not a multiple of 2 bytes",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Convert little-endian 16-bit PCM bytes to f32 samples in [-1.0, 1.0)
///
/// Each sample is divided by 32768.0. An empty buffer yields an empty
/// waveform.
pub fn pcm16le_to_f32(bytes: &[u8]) -> Result<Vec<f32>> {
    Ok(pcm16le_samples(bytes)?
        .into_iter()
        .map(|s| s as f32 / PCM16_SCALE)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extremes() {
        let bytes: Vec<u8> = [i16::MIN, i16::MAX, 0]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let samples = pcm16le_to_f32(&bytes).unwrap();

        assert_eq!(samples[0], -1.0);
        assert!((samples[1] - 32767.0 / 32768.0).abs() < f32::EPSILON);
        assert_eq!(samples[2], 0.0);
    }

    #[test]
    fn test_little_endian_order() {
        let samples = pcm16le_samples(&[0x01, 0x02]).unwrap();
        assert_eq!(samples, vec![0x0201]);
    }

    #[test]
    fn test_odd_length_rejected() {
        assert!(matches!(pcm16le_samples(&[0, 0, 0]), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_empty_buffer() {
        assert!(pcm16le_to_f32(&[]).unwrap().is_empty());
    }
}
