//! Stream capture: raw producer PCM dumped to a WAV file

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hound::{SampleFormat, WavSpec, WavWriter};
use lsc_common::features::SAMPLE_RATE;

fn capture_spec() -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Ownership of the capture file, shared by all producer connections
#[derive(Debug, Clone, Default)]
pub struct CaptureSlot {
    busy: Arc<AtomicBool>,
}

impl CaptureSlot {
    /// Claim the capture file, or `None` while another connection holds it
    pub fn try_claim(&self) -> Option<CaptureClaim> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CaptureClaim {
                busy: self.busy.clone(),
            })
    }
}

/// Released on drop
#[derive(Debug)]
pub struct CaptureClaim {
    busy: Arc<AtomicBool>,
}

impl Drop for CaptureClaim {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// 16-bit mono 16 kHz WAV writer for one producer connection
pub struct StreamCapture {
    path: PathBuf,
    writer: WavWriter<BufWriter<File>>,
    samples_written: u64,
    claim: Option<CaptureClaim>,
}

impl StreamCapture {
    /// Create (or truncate) the capture file
    pub fn create(path: &Path) -> Result<Self, hound::Error> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let writer = WavWriter::create(path, capture_spec())?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            samples_written: 0,
            claim: None,
        })
    }

    /// Create the capture file under `claim`, held until the capture is dropped
    pub fn create_claimed(path: &Path, claim: CaptureClaim) -> Result<Self, hound::Error> {
        let mut capture = Self::create(path)?;
        capture.claim = Some(claim);
        Ok(capture)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, samples: &[i16]) -> Result<(), hound::Error> {
        for &sample in samples {
            self.writer.write_sample(sample)?;
        }
        self.samples_written += samples.len() as u64;
        Ok(())
    }

    /// Write the final header; returns the number of samples captured
    pub fn finish(self) -> Result<u64, hound::Error> {
        let Self {
            writer,
            samples_written,
            claim,
            ..
        } = self;
        writer.finalize()?;
        drop(claim);
        Ok(samples_written)
    }
}

/// Remove a capture file left over from a previous run
///
/// Returns whether a file was removed.
pub fn remove_stale_capture(path: &Path) -> io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_capture_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("capture.wav");

        let mut capture = StreamCapture::create(&path).unwrap();
        capture.append(&[0, 1000, -1000]).unwrap();
        capture.append(&[i16::MAX, i16::MIN]).unwrap();
        assert_eq!(capture.finish().unwrap(), 5);

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(spec.bits_per_sample, 16);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 1000, -1000, i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_new_connection_truncates_previous_capture() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("capture.wav");

        let mut first = StreamCapture::create(&path).unwrap();
        first.append(&[1; 100]).unwrap();
        first.finish().unwrap();

        let mut second = StreamCapture::create(&path).unwrap();
        second.append(&[2; 10]).unwrap();
        second.finish().unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.len(), 10);
    }

    #[test]
    fn test_slot_admits_one_claim_at_a_time() {
        let slot = CaptureSlot::default();

        let first = slot.try_claim();
        assert!(first.is_some());
        assert!(slot.clone().try_claim().is_none());

        drop(first);
        assert!(slot.try_claim().is_some());
    }

    #[test]
    fn test_claim_released_when_capture_finishes() {
        let temp_dir = TempDir::new().unwrap();
        let slot = CaptureSlot::default();
        let claim = slot.try_claim().unwrap();

        let capture = StreamCapture::create_claimed(&temp_dir.path().join("c.wav"), claim).unwrap();
        assert!(slot.try_claim().is_none());

        capture.finish().unwrap();
        assert!(slot.try_claim().is_some());
    }

    #[test]
    fn test_remove_stale_capture() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("capture.wav");

        assert!(!remove_stale_capture(&path).unwrap());

        std::fs::write(&path, b"stale").unwrap();
        assert!(remove_stale_capture(&path).unwrap());
        assert!(!path.exists());
    }
}
