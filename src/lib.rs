//! Replay Capture - instant replay for window output.
//!
//! Keeps a fixed-duration sliding window of recent frames compressed in
//! memory and encodes it to a playable video file on demand, alongside a
//! mutually exclusive manual recording mode delegated to an injected backend.
//!
//! The composing application constructs one [`RecordingCoordinator`] (or the
//! [`UnsupportedReplay`] stub on builds without the `replay` feature) and
//! drives it through the [`ReplayCapture`] trait.

pub mod buffer;
pub mod capture;
pub mod export;
pub mod recorder;
pub mod sampler;
pub mod utils;

pub use buffer::{CompressedFrame, FrameRingBuffer};
pub use capture::{FrameSource, RawFrame};
pub use export::{MjpegEncoder, ReplayEncoder};
pub use recorder::{
    CoordinatorState, NullBackend, RecordingBackend, ReplayCapture, ReplayConfig, SaveOutcome,
    UnsupportedReplay,
};
pub use utils::{ReplayError, ReplayResult};

#[cfg(feature = "replay")]
pub use recorder::RecordingCoordinator;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging for binaries embedding the crate.
///
/// Respects `RUST_LOG`; defaults to debug output for this crate.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "replay_capture=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
