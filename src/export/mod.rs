//! Replay export
//!
//! Turns the ordered contents of a frame ring into a single playable video
//! file. The concrete backend is injected through [`ReplayEncoder`] so the
//! coordinator never hard-wires a codec.

pub mod mp4;
pub mod pipeline;

use crate::buffer::FrameRingBuffer;
use crate::utils::ReplayResult;
use std::path::{Path, PathBuf};

pub use pipeline::MjpegEncoder;

/// Encodes a populated ring into a video file at `output`.
///
/// Encoding never mutates the ring; a failed call must leave no partial file
/// behind so the caller can retry against the intact buffer.
pub trait ReplayEncoder: Send + Sync {
    /// Encode the ring's frames, oldest first, returning the written path.
    fn encode(&self, ring: &FrameRingBuffer, output: &Path) -> ReplayResult<PathBuf>;
}
