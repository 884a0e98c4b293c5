//! Frame sources
//!
//! Platform-agnostic seam between the sampler and whatever produces the
//! window's visual output. Platform capture backends implement [`FrameSource`];
//! the crate itself ships only a synthetic source used by tests and demos.

use crate::utils::ReplayResult;

/// One uncompressed captured frame, tightly packed RGBA.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// RGBA pixel data, `width * height * 4` bytes
    pub pixels: Vec<u8>,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,
}

impl RawFrame {
    /// Expected byte length for the frame's dimensions.
    pub fn expected_len(&self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }
}

/// Produces the current visual output on demand.
///
/// Implementations are driven from the sampler task and must be `Send`. A
/// capture failure is recoverable: the sampler logs it and keeps ticking.
pub trait FrameSource: Send {
    /// Capture the current visual output.
    fn capture(&mut self) -> ReplayResult<RawFrame>;
}

/// Synthetic source emitting a solid color that shifts every frame.
///
/// Deterministic and cheap; used for tests and for exercising the pipeline
/// without a platform capture backend.
#[derive(Debug)]
pub struct TestPatternSource {
    width: u32,
    height: u32,
    tick: u8,
}

impl TestPatternSource {
    /// Create a source producing `width` x `height` frames.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tick: 0,
        }
    }
}

impl FrameSource for TestPatternSource {
    fn capture(&mut self) -> ReplayResult<RawFrame> {
        self.tick = self.tick.wrapping_add(16);
        let mut pixels = Vec::with_capacity((self.width * self.height * 4) as usize);
        for _ in 0..(self.width * self.height) {
            pixels.extend_from_slice(&[self.tick, 64, 255 - self.tick, 255]);
        }
        Ok(RawFrame {
            pixels,
            width: self.width,
            height: self.height,
        })
    }
}
