//! Recording system module
//!
//! The capture state machine and its collaborators:
//! - ReplayCapture, the capability trait consumers depend on
//! - RecordingCoordinator, the full implementation (feature "replay")
//! - UnsupportedReplay, the stub used by builds without the capability
//! - RecordingBackend, the injected manual recording collaborator

pub mod backend;
pub mod state;
pub mod stub;

#[cfg(feature = "replay")]
pub mod coordinator;

use async_trait::async_trait;

pub use backend::{NullBackend, RecordingBackend};
pub use state::{CoordinatorState, ReplayConfig, SaveOutcome};
pub use stub::UnsupportedReplay;

#[cfg(feature = "replay")]
pub use coordinator::RecordingCoordinator;

/// Replay buffer capability.
///
/// The rest of an application depends on this trait, not on the concrete
/// coordinator; a build without the `replay` feature substitutes
/// [`UnsupportedReplay`], which reports every operation as unsupported instead
/// of compiling whole types away.
#[async_trait]
pub trait ReplayCapture: Send + Sync {
    /// Start the rolling capture loop. Returns `false` if rejected.
    async fn start_replay_buffer(&self) -> bool;

    /// Stop the capture loop and release the buffered frames. Idempotent.
    async fn stop_replay_buffer(&self);

    /// Encode the current window to a video file.
    async fn save_replay_buffer(&self) -> SaveOutcome;

    /// Whether the sampling loop is currently active.
    fn is_buffering(&self) -> bool;
}
