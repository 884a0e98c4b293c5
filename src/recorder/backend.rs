//! Manual recording backend
//!
//! A manual start/stop recording session is delegated to an injected
//! collaborator; the crate specifies only the contract. Platform encoders
//! implement [`RecordingBackend`].

use crate::utils::ReplayResult;
use async_trait::async_trait;
use std::path::Path;

/// A start/stop video capture session independent of the replay buffer.
#[async_trait]
pub trait RecordingBackend: Send {
    /// Whether a session is currently running.
    fn is_recording(&self) -> bool;

    /// Begin a recording session writing into `dir` with the given file stem.
    async fn start(
        &mut self,
        dir: &Path,
        filename_stem: &str,
        fps: u32,
        resolution_scale: f64,
    ) -> ReplayResult<()>;

    /// End the current session and finalize its output.
    async fn stop(&mut self) -> ReplayResult<()>;
}

/// Backend that records nothing.
///
/// Keeps the coordinator fully usable for replay capture on setups without a
/// manual recording implementation.
#[derive(Debug, Default)]
pub struct NullBackend {
    recording: bool,
}

#[async_trait]
impl RecordingBackend for NullBackend {
    fn is_recording(&self) -> bool {
        self.recording
    }

    async fn start(
        &mut self,
        dir: &Path,
        filename_stem: &str,
        _fps: u32,
        _resolution_scale: f64,
    ) -> ReplayResult<()> {
        tracing::warn!(
            "Null recording backend: discarding session {:?}/{}",
            dir,
            filename_stem
        );
        self.recording = true;
        Ok(())
    }

    async fn stop(&mut self) -> ReplayResult<()> {
        self.recording = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_backend_tracks_session() {
        let mut backend = NullBackend::default();
        assert!(!backend.is_recording());

        backend
            .start(Path::new("/tmp"), "recording", 30, 1.0)
            .await
            .unwrap();
        assert!(backend.is_recording());

        backend.stop().await.unwrap();
        assert!(!backend.is_recording());
    }
}
