//! Frame sampling loop
//!
//! Drives periodic capture at the configured rate, compresses each accepted
//! frame to JPEG, and pushes it into the shared ring. Ticks that fire before a
//! full frame interval has elapsed are dropped outright, never queued, so a
//! slow renderer yields fewer stored frames instead of a backlog.

use crate::buffer::{CompressedFrame, FrameRingBuffer};
use crate::capture::{FrameSource, RawFrame};
use crate::utils::{ReplayError, ReplayResult};
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use parking_lot::Mutex;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Log a ring status line every this many stored frames.
const STATUS_LOG_INTERVAL: u64 = 60;

/// Tuning for the sampling loop.
#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    /// Target captures per second
    pub fps: u32,

    /// Downscale factor applied before compression (1.0 = native size)
    pub resolution_scale: f64,

    /// JPEG quality for stored payloads (1-100)
    pub jpeg_quality: u8,
}

/// Scale dimensions by `scale`, rounding each down to the nearest even number.
///
/// Even alignment is required by the downstream video codec.
pub fn scaled_even_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
    let w = ((width as f64 * scale) as u32) & !1;
    let h = ((height as f64 * scale) as u32) & !1;
    (w, h)
}

/// Compress a raw frame to a JPEG payload, downscaling first if configured.
pub fn compress_frame(raw: &RawFrame, config: &SamplerConfig) -> ReplayResult<CompressedFrame> {
    if raw.pixels.len() != raw.expected_len() {
        return Err(ReplayError::Capture(format!(
            "frame size mismatch: got {} bytes, expected {} ({}x{}x4 RGBA)",
            raw.pixels.len(),
            raw.expected_len(),
            raw.width,
            raw.height
        )));
    }

    let img = RgbaImage::from_raw(raw.width, raw.height, raw.pixels.clone())
        .ok_or_else(|| ReplayError::Capture("invalid raw frame dimensions".to_string()))?;
    let mut img = DynamicImage::ImageRgba8(img);

    let (mut width, mut height) = (raw.width, raw.height);
    if (config.resolution_scale - 1.0).abs() > f64::EPSILON {
        let (w, h) = scaled_even_dimensions(raw.width, raw.height, config.resolution_scale);
        if w == 0 || h == 0 {
            return Err(ReplayError::Capture(format!(
                "resolution scale {} collapses {}x{} to zero",
                config.resolution_scale, raw.width, raw.height
            )));
        }
        img = img.resize_exact(w, h, FilterType::Lanczos3);
        width = w;
        height = h;
    }

    let rgb = img.to_rgb8();
    let mut buffer = Cursor::new(Vec::new());
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, config.jpeg_quality)
        .encode(rgb.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .map_err(|e| ReplayError::Capture(format!("JPEG encoding failed: {e}")))?;

    Ok(CompressedFrame::new(buffer.into_inner(), width, height))
}

/// Run the sampling loop until `stop` is raised.
///
/// The ring is shared with the encoder; a `try_lock` miss means an encode is
/// in flight and the frame is dropped, which shows up as a capture gap in the
/// replay rather than a stall here.
pub async fn run_sampler(
    source: Arc<Mutex<Box<dyn FrameSource>>>,
    ring: Arc<Mutex<FrameRingBuffer>>,
    stop: Arc<AtomicBool>,
    config: SamplerConfig,
) {
    let period = Duration::from_secs_f64(1.0 / f64::from(config.fps.max(1)));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut last_capture: Option<Instant> = None;
    let mut captured: u64 = 0;

    tracing::info!(
        "Sampler started: {} fps, scale {}, quality {}",
        config.fps,
        config.resolution_scale,
        config.jpeg_quality
    );

    loop {
        interval.tick().await;

        if stop.load(Ordering::Relaxed) {
            break;
        }

        // Drop early ticks instead of queueing them. Measured tick to tick,
        // not from capture completion, with a jitter allowance so an
        // on-schedule tick is never dropped for the time capture itself took.
        let tick_at = Instant::now();
        if let Some(last) = last_capture {
            if tick_at.duration_since(last) < period.mul_f64(0.9) {
                continue;
            }
        }

        let raw = {
            let mut source = source.lock();
            match source.capture() {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!("Frame capture failed, skipping tick: {}", e);
                    continue;
                }
            }
        };
        last_capture = Some(tick_at);

        let frame = match compress_frame(&raw, &config) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Frame compression failed, skipping tick: {}", e);
                continue;
            }
        };

        let Some(mut ring) = ring.try_lock() else {
            // Encoder holds the ring; this frame becomes a capture gap.
            tracing::debug!("Ring busy during encode, dropping frame");
            continue;
        };
        ring.push(frame);
        captured += 1;

        if captured == 1 {
            let (w, h) = ring.last_dimensions();
            tracing::info!("First replay frame captured: {}x{}", w, h);
        } else if captured % STATUS_LOG_INTERVAL == 0 {
            let (w, h) = ring.last_dimensions();
            tracing::debug!(
                "Replay ring: {}/{} frames, {}x{}, ~{} KiB",
                ring.len(),
                ring.capacity(),
                w,
                h,
                ring.estimated_memory_bytes() / 1024
            );
        }
    }

    tracing::info!("Sampler stopped after {} captures", captured);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::TestPatternSource;

    fn config(fps: u32) -> SamplerConfig {
        SamplerConfig {
            fps,
            resolution_scale: 1.0,
            jpeg_quality: 85,
        }
    }

    #[test]
    fn test_even_rounding_odd_dimensions() {
        assert_eq!(scaled_even_dimensions(641, 361, 1.0), (640, 360));
    }

    #[test]
    fn test_even_rounding_already_even() {
        assert_eq!(scaled_even_dimensions(640, 360, 1.0), (640, 360));
    }

    #[test]
    fn test_even_rounding_with_scale() {
        // 1920 * 0.5 = 960, 1081 * 0.5 = 540.5 -> 540
        assert_eq!(scaled_even_dimensions(1920, 1081, 0.5), (960, 540));
    }

    #[test]
    fn test_compress_produces_jpeg() {
        let mut source = TestPatternSource::new(16, 16);
        let raw = source.capture().unwrap();
        let frame = compress_frame(&raw, &config(30)).unwrap();
        assert_eq!(frame.width(), 16);
        assert_eq!(frame.height(), 16);
        // JPEG SOI marker
        assert_eq!(&frame.payload()[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_compress_applies_downscale() {
        let mut source = TestPatternSource::new(32, 18);
        let raw = source.capture().unwrap();
        let cfg = SamplerConfig {
            fps: 30,
            resolution_scale: 0.5,
            jpeg_quality: 85,
        };
        let frame = compress_frame(&raw, &cfg).unwrap();
        assert_eq!((frame.width(), frame.height()), (16, 8));
    }

    #[test]
    fn test_compress_rejects_short_pixel_buffer() {
        let raw = RawFrame {
            pixels: vec![0; 10],
            width: 16,
            height: 16,
        };
        assert!(compress_frame(&raw, &config(30)).is_err());
    }

    #[tokio::test]
    async fn test_sampler_fills_ring_and_stops() {
        let source: Arc<Mutex<Box<dyn FrameSource>>> =
            Arc::new(Mutex::new(Box::new(TestPatternSource::new(16, 16))));
        let ring = Arc::new(Mutex::new(FrameRingBuffer::new(50, 2)));
        let stop = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(run_sampler(
            Arc::clone(&source),
            Arc::clone(&ring),
            Arc::clone(&stop),
            config(50),
        ));

        tokio::time::sleep(Duration::from_millis(500)).await;
        stop.store(true, Ordering::Relaxed);
        task.await.unwrap();

        let ring = ring.lock();
        assert!(ring.len() >= 5, "expected several frames, got {}", ring.len());
        assert!(ring.len() <= ring.capacity());
        assert_eq!(ring.last_dimensions(), (16, 16));
    }

    #[tokio::test]
    async fn test_sampler_tracks_configured_rate() {
        let source: Arc<Mutex<Box<dyn FrameSource>>> =
            Arc::new(Mutex::new(Box::new(TestPatternSource::new(16, 16))));
        let ring = Arc::new(Mutex::new(FrameRingBuffer::new(20, 5)));
        let stop = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(run_sampler(
            Arc::clone(&source),
            Arc::clone(&ring),
            Arc::clone(&stop),
            config(20),
        ));

        tokio::time::sleep(Duration::from_secs(2)).await;
        stop.store(true, Ordering::Relaxed);
        task.await.unwrap();

        // On-schedule ticks must all be stored: 2 seconds at 20 fps is
        // ~40 captures, not a fraction of them.
        let stored = ring.lock().len();
        assert!(
            (34..=44).contains(&stored),
            "expected ~40 frames at 20 fps over 2s, got {stored}"
        );
    }
}
