//! Recording coordinator
//!
//! Arbitrates between manual recording, replay buffering, and encoding. Owns
//! the single frame ring, the sampler task, and the injected backend/encoder
//! collaborators; every external operation goes through here.

use super::backend::RecordingBackend;
use super::state::{CoordinatorState, ReplayConfig, SaveOutcome};
use super::ReplayCapture;
use crate::buffer::FrameRingBuffer;
use crate::capture::FrameSource;
use crate::export::ReplayEncoder;
use crate::sampler::{run_sampler, SamplerConfig};
use async_trait::async_trait;
use chrono::Local;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Running sampler task plus its stop flag.
struct SamplerHandle {
    stop: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Builder for [`RecordingCoordinator`].
///
/// Collaborators are injected at construction; there are no setters on the
/// built coordinator. A missing backend or encoder is not fatal: the
/// corresponding operations warn and no-op.
pub struct CoordinatorBuilder {
    config: ReplayConfig,
    source: Box<dyn FrameSource>,
    backend: Option<Box<dyn RecordingBackend>>,
    encoder: Option<Box<dyn ReplayEncoder>>,
}

impl CoordinatorBuilder {
    /// Inject the manual recording backend.
    pub fn backend(mut self, backend: Box<dyn RecordingBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Inject the replay encoder.
    pub fn encoder(mut self, encoder: Box<dyn ReplayEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// Build the coordinator. Never fails.
    pub fn build(self) -> RecordingCoordinator {
        RecordingCoordinator {
            config: self.config,
            state: RwLock::new(CoordinatorState::Idle),
            source: Arc::new(Mutex::new(self.source)),
            backend: self.backend.map(tokio::sync::Mutex::new),
            encoder: self.encoder,
            ring: Mutex::new(None),
            sampler: Mutex::new(None),
        }
    }
}

/// The capture state machine.
///
/// Constructed once by the composing application and passed by reference to
/// whoever needs it; there is no global accessor. One ring exists per
/// coordinator, created when replay buffering starts and destroyed when it
/// stops.
pub struct RecordingCoordinator {
    config: ReplayConfig,
    state: RwLock<CoordinatorState>,
    source: Arc<Mutex<Box<dyn FrameSource>>>,
    backend: Option<tokio::sync::Mutex<Box<dyn RecordingBackend>>>,
    encoder: Option<Box<dyn ReplayEncoder>>,
    ring: Mutex<Option<Arc<Mutex<FrameRingBuffer>>>>,
    sampler: Mutex<Option<SamplerHandle>>,
}

impl RecordingCoordinator {
    /// Start building a coordinator around a frame source.
    pub fn builder(config: ReplayConfig, source: Box<dyn FrameSource>) -> CoordinatorBuilder {
        CoordinatorBuilder {
            config,
            source,
            backend: None,
            encoder: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> CoordinatorState {
        *self.state.read()
    }

    /// Replay configuration.
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Frames currently buffered, 0 when the ring does not exist.
    pub fn replay_frame_count(&self) -> usize {
        self.ring
            .lock()
            .as_ref()
            .map_or(0, |ring| ring.lock().len())
    }

    /// Estimated bytes held by the ring, 0 when it does not exist.
    pub fn replay_memory_bytes(&self) -> usize {
        self.ring
            .lock()
            .as_ref()
            .map_or(0, |ring| ring.lock().estimated_memory_bytes())
    }

    /// Start a manual recording session via the injected backend.
    ///
    /// Valid from `Idle` and `ReplayBuffering`; the replay loop is stopped
    /// first because the two modes are mutually exclusive. Returns `false`
    /// (after a warning) when rejected.
    pub async fn start_manual_recording(&self) -> bool {
        match self.state() {
            CoordinatorState::ManualRecording => {
                tracing::warn!("Manual recording already in progress");
                return false;
            }
            CoordinatorState::Encoding => {
                tracing::warn!("Cannot start manual recording while encoding");
                return false;
            }
            CoordinatorState::ReplayBuffering => {
                tracing::info!("Stopping replay buffer: manual recording requested");
                self.stop_replay_buffer().await;
            }
            CoordinatorState::Idle => {}
        }

        let Some(backend) = &self.backend else {
            tracing::warn!("No recording backend registered, ignoring start request");
            return false;
        };

        if let Err(e) = std::fs::create_dir_all(&self.config.output_dir) {
            tracing::warn!("Cannot create output directory: {}", e);
            return false;
        }

        let stem = format!("recording-{}", Local::now().format("%Y%m%d-%H%M%S"));
        let result = backend
            .lock()
            .await
            .start(
                &self.config.output_dir,
                &stem,
                self.config.fps,
                self.config.resolution_scale,
            )
            .await;

        match result {
            Ok(()) => {
                *self.state.write() = CoordinatorState::ManualRecording;
                tracing::info!("Manual recording started: {}", stem);
                true
            }
            Err(e) => {
                tracing::warn!("Recording backend failed to start: {}", e);
                false
            }
        }
    }

    /// Stop the manual recording session. Rejected unless one is running.
    pub async fn stop_manual_recording(&self) -> bool {
        if self.state() != CoordinatorState::ManualRecording {
            tracing::warn!("No manual recording to stop");
            return false;
        }

        if let Some(backend) = &self.backend {
            if let Err(e) = backend.lock().await.stop().await {
                tracing::warn!("Recording backend failed to stop cleanly: {}", e);
            }
        }

        *self.state.write() = CoordinatorState::Idle;
        tracing::info!("Manual recording stopped");
        true
    }

    /// Start or stop manual recording depending on the current state.
    pub async fn toggle_manual_recording(&self) -> bool {
        if self.state() == CoordinatorState::ManualRecording {
            self.stop_manual_recording().await
        } else {
            self.start_manual_recording().await
        }
    }

    /// Transition taken when an encode finishes.
    fn state_after_encode(&self) -> CoordinatorState {
        if self.sampler.lock().is_some() {
            CoordinatorState::ReplayBuffering
        } else {
            CoordinatorState::Idle
        }
    }

    #[cfg(test)]
    pub(crate) fn force_state(&self, state: CoordinatorState) {
        *self.state.write() = state;
    }
}

#[async_trait]
impl ReplayCapture for RecordingCoordinator {
    async fn start_replay_buffer(&self) -> bool {
        match self.state() {
            CoordinatorState::Idle => {}
            CoordinatorState::ReplayBuffering | CoordinatorState::Encoding => {
                tracing::warn!("Replay buffer already running");
                return false;
            }
            CoordinatorState::ManualRecording => {
                tracing::warn!("Cannot start replay buffer during manual recording");
                return false;
            }
        }

        if self.config.fps == 0 || self.config.window_seconds == 0 {
            tracing::warn!(
                "Refusing zero-capacity replay buffer ({} fps, {}s window)",
                self.config.fps,
                self.config.window_seconds
            );
            return false;
        }

        let ring = Arc::new(Mutex::new(FrameRingBuffer::new(
            self.config.fps,
            self.config.window_seconds,
        )));
        let stop = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run_sampler(
            Arc::clone(&self.source),
            Arc::clone(&ring),
            Arc::clone(&stop),
            SamplerConfig {
                fps: self.config.fps,
                resolution_scale: self.config.resolution_scale,
                jpeg_quality: self.config.jpeg_quality,
            },
        ));

        *self.ring.lock() = Some(ring);
        *self.sampler.lock() = Some(SamplerHandle { stop, task });
        *self.state.write() = CoordinatorState::ReplayBuffering;

        tracing::info!(
            "Replay buffer started: {} frame window",
            self.config.ring_capacity()
        );
        true
    }

    async fn stop_replay_buffer(&self) {
        let handle = self.sampler.lock().take();
        if let Some(handle) = handle {
            handle.stop.store(true, Ordering::Relaxed);
            let _ = handle.task.await;
        }

        let ring = self.ring.lock().take();
        if let Some(ring) = ring {
            // Blocks until an in-flight encode releases its snapshot of the
            // ring; memory is never freed out from under the encoder.
            ring.lock().dispose();
            tracing::info!("Replay buffer stopped and released");
        }

        let mut state = self.state.write();
        if *state != CoordinatorState::ManualRecording {
            *state = CoordinatorState::Idle;
        }
    }

    async fn save_replay_buffer(&self) -> SaveOutcome {
        // Check the precondition and claim `Encoding` in one critical
        // section; of two concurrent saves exactly one passes, the other
        // observes `Encoding` and is rejected.
        {
            let mut state = self.state.write();
            match *state {
                CoordinatorState::Encoding => {
                    tracing::warn!("Encode already in flight, ignoring save request");
                    return SaveOutcome::Rejected;
                }
                CoordinatorState::ManualRecording => {
                    tracing::warn!("Cannot save replay during manual recording");
                    return SaveOutcome::Rejected;
                }
                CoordinatorState::Idle | CoordinatorState::ReplayBuffering => {}
            }
            *state = CoordinatorState::Encoding;
        }

        let ring = self.ring.lock().clone();
        let Some(ring) = ring else {
            *self.state.write() = self.state_after_encode();
            // First-call bootstrap: start buffering instead of failing.
            tracing::info!("Replay buffer not running, starting it; retry shortly");
            self.start_replay_buffer().await;
            return SaveOutcome::NotReady;
        };

        let Some(encoder) = &self.encoder else {
            *self.state.write() = self.state_after_encode();
            tracing::warn!("No replay encoder registered, ignoring save request");
            return SaveOutcome::Rejected;
        };

        if ring.lock().is_empty() {
            *self.state.write() = self.state_after_encode();
            tracing::warn!("Replay buffer is empty, nothing to save");
            return SaveOutcome::Rejected;
        }

        let output = self.config.output_dir.join(format!(
            "replay-{}.mp4",
            Local::now().format("%Y%m%d-%H%M%S")
        ));

        // Synchronous by contract: sampling gaps during a long encode are the
        // accepted tradeoff. The ring lock is held for the whole encode and no
        // await happens while it is held.
        let result = {
            let guard = ring.lock();
            encoder.encode(&guard, &output)
        };

        *self.state.write() = self.state_after_encode();

        match result {
            Ok(path) => {
                tracing::info!("Replay saved to {:?}", path);
                SaveOutcome::Saved(path)
            }
            Err(e) => {
                // Ring contents are untouched; the caller may retry.
                tracing::warn!("Replay encode failed: {}", e);
                SaveOutcome::Rejected
            }
        }
    }

    fn is_buffering(&self) -> bool {
        self.sampler.lock().is_some()
    }
}
