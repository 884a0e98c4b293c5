//! MJPEG encode pipeline
//!
//! Walks the ring oldest to newest, normalizes every stored frame to the even
//! target dimensions, and muxes the result into an MP4 with a single MJPEG
//! video track at the ring's sampling fps. Real capture cadence is not
//! preserved, only ordinal sequence.

use super::mp4::MjpegMp4;
use super::ReplayEncoder;
use crate::buffer::FrameRingBuffer;
use crate::utils::{ReplayError, ReplayResult};
use image::imageops::FilterType;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Pure-Rust MJPEG/MP4 encoder.
///
/// Frames whose dimensions already match the target pass through without
/// re-encoding; mismatched frames (a window resize mid-session) are decoded,
/// rescaled to the target, and re-encoded.
#[derive(Debug, Clone)]
pub struct MjpegEncoder {
    /// JPEG quality used when a frame has to be re-encoded after rescaling
    rescale_quality: u8,
}

impl MjpegEncoder {
    pub fn new(rescale_quality: u8) -> Self {
        Self {
            rescale_quality: rescale_quality.clamp(1, 100),
        }
    }

    /// Decode, rescale to `(width, height)`, and re-encode one payload.
    fn rescale_sample(&self, payload: &[u8], width: u32, height: u32) -> ReplayResult<Vec<u8>> {
        let img = image::load_from_memory_with_format(payload, image::ImageFormat::Jpeg)
            .map_err(|e| ReplayError::Encode(format!("stored frame decode failed: {e}")))?;
        let resized = img.resize_exact(width, height, FilterType::Lanczos3);

        let rgb = resized.to_rgb8();
        let mut buffer = Cursor::new(Vec::new());
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, self.rescale_quality)
            .encode(rgb.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .map_err(|e| ReplayError::Encode(format!("frame re-encode failed: {e}")))?;
        Ok(buffer.into_inner())
    }
}

impl Default for MjpegEncoder {
    fn default() -> Self {
        Self::new(85)
    }
}

impl ReplayEncoder for MjpegEncoder {
    fn encode(&self, ring: &FrameRingBuffer, output: &Path) -> ReplayResult<PathBuf> {
        if ring.is_empty() {
            return Err(ReplayError::Encode("empty buffer".to_string()));
        }

        let (last_w, last_h) = ring.last_dimensions();
        // The container requires even dimensions.
        let (width, height) = (last_w & !1, last_h & !1);
        if width == 0 || height == 0 {
            return Err(ReplayError::Encode(format!(
                "invalid dimensions: {last_w}x{last_h}"
            )));
        }

        let dir = output.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        tracing::info!(
            "Encoding replay: {} frames, {}x{} @ {} fps -> {:?}",
            ring.len(),
            width,
            height,
            ring.fps(),
            output
        );

        let mut mux = MjpegMp4::new(width, height, ring.fps());
        let mut first_error: Option<ReplayError> = None;
        ring.read_in_order(|index, frame| {
            if first_error.is_some() {
                return;
            }
            let sample = if frame.width() == width && frame.height() == height {
                Ok(frame.payload().to_vec())
            } else {
                self.rescale_sample(frame.payload(), width, height)
            };
            match sample {
                Ok(sample) => mux.push_sample(sample),
                Err(e) => {
                    tracing::error!("Encode failed at frame {}: {}", index, e);
                    first_error = Some(e);
                }
            }
        });
        if let Some(e) = first_error {
            return Err(e);
        }

        // Write to a temp name, then rename: a failed encode leaves nothing
        // behind and a reader never sees a half-written file.
        let data = mux.finish()?;
        let part = output.with_extension("mp4.part");
        if let Err(e) = std::fs::write(&part, &data) {
            let _ = std::fs::remove_file(&part);
            return Err(e.into());
        }
        std::fs::rename(&part, output)?;

        tracing::info!("Replay written: {:?} ({} bytes)", output, data.len());
        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::CompressedFrame;
    use crate::capture::{FrameSource, TestPatternSource};
    use crate::sampler::{compress_frame, SamplerConfig};
    use tempfile::tempdir;

    fn jpeg_frame(width: u32, height: u32) -> CompressedFrame {
        let raw = TestPatternSource::new(width, height).capture().unwrap();
        let config = SamplerConfig {
            fps: 30,
            resolution_scale: 1.0,
            jpeg_quality: 85,
        };
        compress_frame(&raw, &config).unwrap()
    }

    fn populated_ring(width: u32, height: u32, frames: usize) -> FrameRingBuffer {
        let mut ring = FrameRingBuffer::new(30, 1);
        for _ in 0..frames {
            ring.push(jpeg_frame(width, height));
        }
        ring
    }

    #[test]
    fn test_empty_buffer_rejected() {
        let ring = FrameRingBuffer::new(30, 1);
        let dir = tempdir().unwrap();
        let result = MjpegEncoder::default().encode(&ring, &dir.path().join("out.mp4"));
        assert!(matches!(result, Err(ReplayError::Encode(_))));
    }

    #[test]
    fn test_encode_writes_mp4() {
        let ring = populated_ring(32, 32, 3);
        let dir = tempdir().unwrap();
        let output = dir.path().join("replay").join("out.mp4");

        let path = MjpegEncoder::default().encode(&ring, &output).unwrap();
        assert_eq!(path, output);

        let data = std::fs::read(&output).unwrap();
        assert_eq!(&data[4..8], b"ftyp");
        // No leftover temp file.
        assert!(!output.with_extension("mp4.part").exists());
    }

    #[test]
    fn test_odd_dimensions_rounded_down() {
        // Last frame is 33x17; the track must be 32x16.
        let ring = populated_ring(33, 17, 2);
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.mp4");

        MjpegEncoder::default().encode(&ring, &output).unwrap();

        let data = std::fs::read(&output).unwrap();
        let tkhd = data
            .windows(4)
            .position(|w| w == b"tkhd")
            .expect("tkhd box");
        // Fixed-point width/height are the last 8 bytes of tkhd content.
        let content_end = tkhd - 4 + u32::from_be_bytes(data[tkhd - 4..tkhd].try_into().unwrap()) as usize;
        let width = u32::from_be_bytes(data[content_end - 8..content_end - 4].try_into().unwrap()) >> 16;
        let height = u32::from_be_bytes(data[content_end - 4..content_end].try_into().unwrap()) >> 16;
        assert_eq!((width, height), (32, 16));
    }

    #[test]
    fn test_heterogeneous_frames_rescaled_to_last() {
        let mut ring = FrameRingBuffer::new(30, 1);
        ring.push(jpeg_frame(64, 64));
        ring.push(jpeg_frame(16, 16));

        let dir = tempdir().unwrap();
        let output = dir.path().join("out.mp4");
        MjpegEncoder::default().encode(&ring, &output).unwrap();
        assert!(output.exists());
    }

    #[test]
    fn test_failed_encode_leaves_ring_intact() {
        let ring = populated_ring(16, 16, 3);
        let dir = tempdir().unwrap();

        // A file where the output directory should be makes create_dir_all fail.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let bad_output = blocker.join("out.mp4");

        let encoder = MjpegEncoder::default();
        assert!(encoder.encode(&ring, &bad_output).is_err());
        assert_eq!(ring.len(), 3);

        // Retry against the untouched ring succeeds.
        let output = dir.path().join("out.mp4");
        encoder.encode(&ring, &output).unwrap();
        assert!(output.exists());
    }

    #[test]
    fn test_encode_does_not_mutate_ring() {
        let ring = populated_ring(16, 16, 5);
        let before = ring.estimated_memory_bytes();

        let dir = tempdir().unwrap();
        MjpegEncoder::default()
            .encode(&ring, &dir.path().join("out.mp4"))
            .unwrap();

        assert_eq!(ring.len(), 5);
        assert_eq!(ring.estimated_memory_bytes(), before);
    }
}
