//! Coordinator state and configuration
//!
//! Defines the capture state machine's states, the replay configuration, and
//! the outcome type for save requests.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Current state of the capture system.
///
/// Exactly one state is active at a time; manual recording and replay
/// buffering are mutually exclusive, and `Encoding` is a transient state that
/// re-enters `ReplayBuffering` while the sampling loop is still active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinatorState {
    /// Nothing is being captured
    Idle,
    /// A manual recording session is running via the injected backend
    ManualRecording,
    /// The sampler loop is feeding the replay ring
    ReplayBuffering,
    /// A save request is encoding the ring contents
    Encoding,
}

impl Default for CoordinatorState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Result of a save request.
///
/// Precondition violations surface here as sentinel variants, never as panics:
/// the "not ready yet" bootstrap is deliberately distinct from a rejection so
/// callers can tell "retry shortly" apart from "nothing to save".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The replay was written to this path
    Saved(PathBuf),
    /// The buffer was not running; it has been started, retry shortly
    NotReady,
    /// The request was refused (empty buffer, no encoder, encode in flight,
    /// or encoder failure); details are logged as warnings
    Rejected,
    /// This build has no replay capability
    Unsupported,
}

/// Configuration for the replay buffer and manual recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayConfig {
    /// Target captures per second
    pub fps: u32,

    /// Length of the rolling window in seconds
    pub window_seconds: u32,

    /// Downscale factor applied at capture time (1.0 = native)
    pub resolution_scale: f64,

    /// JPEG quality for stored frames (1-100)
    pub jpeg_quality: u8,

    /// Directory replay and recording files are written to
    pub output_dir: PathBuf,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            window_seconds: 30,
            resolution_scale: 1.0,
            jpeg_quality: 85,
            output_dir: PathBuf::from("replays"),
        }
    }
}

impl ReplayConfig {
    /// Frames the ring will hold (`fps * window_seconds`).
    pub fn ring_capacity(&self) -> usize {
        (self.fps as usize) * (self.window_seconds as usize)
    }
}
