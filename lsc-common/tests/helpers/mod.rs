//! WAV fixture generation for integration tests

use std::io::Cursor;

/// Encode 16-bit PCM samples into an in-memory WAV file
pub fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Mono tone at `freq` Hz with the given peak amplitude (0.0..=1.0)
pub fn tone(sample_rate: u32, seconds: f64, freq: f32, amplitude: f32) -> Vec<i16> {
    let total = (seconds * sample_rate as f64) as usize;
    (0..total)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (amplitude * (2.0 * std::f32::consts::PI * freq * t).sin() * i16::MAX as f32) as i16
        })
        .collect()
}

/// Little-endian PCM bytes as a streaming producer would send them
pub fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
