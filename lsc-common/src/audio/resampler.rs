//! Audio resampling using rubato
//!
//! Converts decoded uploads to the 16 kHz analysis rate.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::debug;

use crate::error::{Error, Result};

/// Input frames per resampler call
const CHUNK_FRAMES: usize = 1024;

/// Resample a mono waveform from `input_rate` to `output_rate`.
///
/// The output holds `ceil(n * output_rate / input_rate)` samples aligned
/// with the input: the filter delay is trimmed and its tail flushed.
/// Returns a copy when the rates already match, and an empty waveform for
/// empty input.
pub fn resample_mono(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>> {
    if input_rate == output_rate {
        debug!("Sample rate already at {}Hz, skipping resample", output_rate);
        return Ok(input.to_vec());
    }
    if input.is_empty() {
        return Ok(Vec::new());
    }
    if input_rate == 0 || output_rate == 0 {
        return Err(Error::InvalidInput(format!(
            "Cannot resample from {}Hz to {}Hz",
            input_rate, output_rate
        )));
    }

    debug!(
        "Resampling from {}Hz to {}Hz ({} frames)",
        input_rate,
        output_rate,
        input.len()
    );

    let ratio = output_rate as f64 / input_rate as f64;
    let expected = (input.len() as f64 * ratio).ceil() as usize;

    let mut resampler =
        FastFixedIn::<f32>::new(ratio, 1.0, PolynomialDegree::Septic, CHUNK_FRAMES, 1)
            .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))?;
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(delay + expected + resampler.output_frames_max());

    let mut chunks = input.chunks_exact(CHUNK_FRAMES);
    for chunk in &mut chunks {
        let frames = resampler.process(&[chunk], None).map_err(resample_error)?;
        append_channel(&mut output, frames);
    }
    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        let frames = resampler
            .process_partial(Some(&[remainder][..]), None)
            .map_err(resample_error)?;
        append_channel(&mut output, frames);
    }

    // Flush the filter tail until the delayed output covers the whole clip
    while output.len() < delay + expected {
        let frames = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(resample_error)?;
        if frames.first().map_or(true, Vec::is_empty) {
            break;
        }
        append_channel(&mut output, frames);
    }

    output.drain(..delay.min(output.len()));
    output.resize(expected, 0.0);
    Ok(output)
}

fn append_channel(output: &mut Vec<f32>, frames: Vec<Vec<f32>>) {
    if let Some(channel) = frames.into_iter().next() {
        output.extend(channel);
    }
}

fn resample_error(e: rubato::ResampleError) -> Error {
    Error::Decode(format!("Resampling failed: {}", e))
}
