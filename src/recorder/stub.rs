//! Unsupported-capability stub
//!
//! Stands in for the coordinator on builds without the `replay` feature so
//! callers keep a uniform surface and get a clear signal instead of a missing
//! type.

use super::state::SaveOutcome;
use super::ReplayCapture;
use async_trait::async_trait;

/// Replay capability placeholder that refuses every operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedReplay;

#[async_trait]
impl ReplayCapture for UnsupportedReplay {
    async fn start_replay_buffer(&self) -> bool {
        tracing::warn!("Replay capture is not supported in this build");
        false
    }

    async fn stop_replay_buffer(&self) {}

    async fn save_replay_buffer(&self) -> SaveOutcome {
        tracing::warn!("Replay capture is not supported in this build");
        SaveOutcome::Unsupported
    }

    fn is_buffering(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_refuses_everything() {
        let stub = UnsupportedReplay;
        assert!(!stub.start_replay_buffer().await);
        assert_eq!(stub.save_replay_buffer().await, SaveOutcome::Unsupported);
        assert!(!stub.is_buffering());
        stub.stop_replay_buffer().await;
    }
}
