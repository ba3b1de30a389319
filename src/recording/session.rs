//! Recording session state machine.
//!
//! `Idle -> Selecting -> Armed -> Recording -> Stopped -> Idle`. The host owns
//! one session and drives it through these methods; front ends learn about
//! transitions through [`RecordingEvent`]s.
//!
//! While recording, the capture thread owns the live buffer. When the loop
//! ends, on request or on its own, the thread hands the buffer back and
//! publishes the `Stopped` (or `Idle`, for a cancel) state itself, so hosts
//! that only listen to events never see a session stuck in `Recording`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use super::buffer::{FrameBuffer, FrameSnapshot};
use super::capture_loop::{CaptureLoop, CaptureLoopHandle, LoopOutcome};
use super::events::{EventHub, RecordingEvent};
use super::state::{RecorderCommand, RecordingProgress};
use super::types::{ExportSummary, RecordingSummary, SessionState, StopReason};
use crate::capture::{FrameSource, Region};
use crate::config::RecordingConfig;
use crate::error::{OpenCutError, OpenCutResult};
use crate::gif_encoder::GifEncoder;

/// State shared between the session and its capture thread.
struct Shared {
    state: SessionState,
    /// Frames of the armed or stopped recording. Empty while the loop owns
    /// the live buffer.
    buffer: FrameBuffer,
}

impl Shared {
    fn transition(&mut self, events: &EventHub, state: SessionState) {
        log::debug!("[SESSION] {} -> {}", self.state, state);
        self.state = state;
        events.emit_state_change(&self.state);
    }

    fn invalid_state(&self, operation: &'static str) -> OpenCutError {
        OpenCutError::InvalidState {
            operation,
            state: self.state.name().to_string(),
        }
    }
}

pub struct RecordingSession {
    config: RecordingConfig,
    source: Arc<dyn FrameSource>,
    shared: Arc<Mutex<Shared>>,
    active: Option<CaptureLoopHandle>,
    progress: Arc<RecordingProgress>,
    events: EventHub,
}

impl RecordingSession {
    pub fn new(mut config: RecordingConfig, source: Arc<dyn FrameSource>) -> Self {
        config.validate();
        let shared = Shared {
            state: SessionState::Idle,
            buffer: FrameBuffer::new(config.max_frame_count),
        };
        Self {
            config,
            source,
            shared: Arc::new(Mutex::new(shared)),
            active: None,
            progress: Arc::new(RecordingProgress::new()),
            events: EventHub::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state.clone()
    }

    /// Region of the armed, running or stopped recording.
    pub fn region(&self) -> Option<Region> {
        match self.state() {
            SessionState::Armed { region }
            | SessionState::Recording { region, .. }
            | SessionState::Stopped { region, .. } => Some(region),
            SessionState::Idle | SessionState::Selecting => None,
        }
    }

    pub fn config(&self) -> &RecordingConfig {
        &self.config
    }

    /// Replace the config. Takes effect at the next `start()`.
    pub fn set_config(&mut self, mut config: RecordingConfig) -> OpenCutResult<()> {
        self.reap()?;
        if self.state().is_recording() {
            return Err(OpenCutError::SessionBusy(
                "cannot change settings while recording".to_string(),
            ));
        }
        config.validate();
        self.config = config;
        Ok(())
    }

    pub fn subscribe(&self) -> Receiver<RecordingEvent> {
        self.events.subscribe()
    }

    /// Live counters of the current (or last) recording.
    pub fn progress(&self) -> Arc<RecordingProgress> {
        Arc::clone(&self.progress)
    }

    pub fn begin_selection(&mut self) -> OpenCutResult<()> {
        self.reap()?;
        let mut guard = self.shared.lock();
        let shared = &mut *guard;
        match shared.state {
            SessionState::Idle => {
                shared.transition(&self.events, SessionState::Selecting);
                Ok(())
            },
            SessionState::Selecting => Ok(()),
            _ => Err(shared.invalid_state("begin selection")),
        }
    }

    pub fn cancel_selection(&mut self) -> OpenCutResult<()> {
        self.reap()?;
        let mut guard = self.shared.lock();
        let shared = &mut *guard;
        match shared.state {
            SessionState::Selecting => {
                shared.transition(&self.events, SessionState::Idle);
                Ok(())
            },
            SessionState::Idle => Ok(()),
            _ => Err(shared.invalid_state("cancel selection")),
        }
    }

    /// Arm the session on `region`.
    ///
    /// An invalid region leaves the state as it was.
    pub fn select_region(&mut self, region: Region) -> OpenCutResult<()> {
        self.reap()?;
        match self.state() {
            SessionState::Recording { .. } => {
                return Err(self.reject(OpenCutError::SessionBusy(
                    "a recording is in progress".to_string(),
                )));
            },
            SessionState::Stopped { .. } => {
                return Err(self.reject(OpenCutError::SessionBusy(
                    "export or discard the current recording first".to_string(),
                )));
            },
            _ => {},
        }

        let displays = self.source.displays().map_err(|e| self.reject(e))?;
        if let Err(e) = region.validate(&displays) {
            return Err(self.reject(e));
        }

        log::debug!("[SESSION] Region selected: {}", region);
        let mut shared = self.shared.lock();
        shared.buffer = FrameBuffer::new(self.config.max_frame_count);
        shared.transition(&self.events, SessionState::Armed { region });
        Ok(())
    }

    /// Launch the capture loop on the armed region.
    pub fn start(&mut self) -> OpenCutResult<()> {
        self.reap()?;
        if self.state().is_armed() {
            self.progress = Arc::new(RecordingProgress::new());
        }

        let region = {
            let mut shared = self.shared.lock();
            let region = match &shared.state {
                SessionState::Armed { region } => *region,
                SessionState::Recording { .. } => {
                    return Err(OpenCutError::SessionBusy(
                        "a capture loop is already running".to_string(),
                    ));
                },
                _ => return Err(shared.invalid_state("start")),
            };
            shared.buffer.clear();
            shared.transition(
                &self.events,
                SessionState::Recording {
                    region,
                    started_at: chrono::Local::now().to_rfc3339(),
                },
            );
            region
        };

        let capture = CaptureLoop {
            source: Arc::clone(&self.source),
            region,
            interval: self.config.frame_interval(),
            buffer: FrameBuffer::new(self.config.max_frame_count),
            progress: Arc::clone(&self.progress),
            events: self.events.clone(),
            progress_event_every: self.config.progress_event_every,
        };

        let shared = Arc::clone(&self.shared);
        let events = self.events.clone();
        let progress = Arc::clone(&self.progress);
        let spawned = capture.spawn(move |outcome| {
            publish_outcome(&shared, &events, &progress, region, outcome);
        });

        match spawned {
            Ok(handle) => {
                log::info!(
                    "[SESSION] Recording started: {} at {:.1} fps, limit {} frames",
                    region,
                    self.config.fps(),
                    self.config.max_frame_count
                );
                self.active = Some(handle);
                Ok(())
            },
            Err(e) => {
                log::error!("[SESSION] Failed to start capture thread: {}", e);
                self.shared
                    .lock()
                    .transition(&self.events, SessionState::Armed { region });
                Err(self.reject(e))
            },
        }
    }

    /// Stop recording and keep the frames. Blocks until the loop has exited.
    ///
    /// Does nothing outside `Recording`.
    pub fn stop(&mut self) -> OpenCutResult<()> {
        self.end_loop(RecorderCommand::Stop)
    }

    /// Stop recording and drop the frames, returning to `Idle`.
    ///
    /// Does nothing outside `Recording`.
    pub fn cancel(&mut self) -> OpenCutResult<()> {
        if !self.state().is_recording() {
            return self.reap();
        }
        self.end_loop(RecorderCommand::Cancel)?;

        // The loop may have stopped on its own before the cancel reached it.
        let mut shared = self.shared.lock();
        if shared.state.is_stopped() {
            shared.buffer.clear();
            shared.transition(&self.events, SessionState::Idle);
        }
        Ok(())
    }

    /// Release a capture thread that has finished and return the state.
    pub fn poll(&mut self) -> OpenCutResult<SessionState> {
        self.reap()?;
        Ok(self.state())
    }

    /// Wait up to `timeout` for the loop to end on its own.
    ///
    /// Returns true once the session has left `Recording`.
    pub fn wait_for_stop(&mut self, timeout: Duration) -> OpenCutResult<bool> {
        let ended = match &self.active {
            Some(handle) => handle.wait(timeout),
            None => return Ok(!self.state().is_recording()),
        };
        if ended {
            self.join_loop()?;
        }
        Ok(ended)
    }

    /// Frames of the stopped recording. Empty while recording.
    pub fn snapshot(&self) -> FrameSnapshot {
        self.shared.lock().buffer.snapshot()
    }

    pub fn summary(&self) -> RecordingSummary {
        self.snapshot().summary(self.progress.get_dropped_ticks())
    }

    /// GIF bytes of the stopped recording, without touching the filesystem.
    pub fn encode(&self) -> OpenCutResult<Vec<u8>> {
        let snapshot = self.stopped_snapshot("encode")?;
        GifEncoder::from_config(&self.config).encode_to_bytes(snapshot.frames())
    }

    /// Encode the stopped recording and write it to `path`.
    ///
    /// On success the session returns to `Idle`. On failure it stays
    /// `Stopped` so the export can be retried or the recording discarded.
    pub fn export(&mut self, path: &Path) -> OpenCutResult<ExportSummary> {
        self.reap()?;
        let snapshot = self.stopped_snapshot("export")?;

        let summary = match self.write_gif(&snapshot, path) {
            Ok(summary) => summary,
            Err(e) => {
                log::error!("[SESSION] Export to {} failed: {}", path.display(), e);
                return Err(self.reject(e));
            },
        };

        log::info!(
            "[SESSION] Exported {} frames to {} ({} bytes)",
            summary.frame_count,
            summary.path.display(),
            summary.file_size_bytes
        );
        self.events.emit(RecordingEvent::Exported {
            path: summary.path.to_string_lossy().into_owned(),
            file_size_bytes: summary.file_size_bytes,
        });

        let mut shared = self.shared.lock();
        shared.buffer.clear();
        shared.transition(&self.events, SessionState::Idle);
        Ok(summary)
    }

    /// Drop an armed region or a stopped recording and return to `Idle`.
    pub fn discard(&mut self) -> OpenCutResult<()> {
        self.reap()?;
        let mut guard = self.shared.lock();
        let shared = &mut *guard;
        match shared.state {
            SessionState::Idle => Ok(()),
            SessionState::Recording { .. } => Err(shared.invalid_state("discard")),
            _ => {
                log::debug!("[SESSION] Discarding {} buffered frames", shared.buffer.len());
                shared.buffer.clear();
                shared.transition(&self.events, SessionState::Idle);
                Ok(())
            },
        }
    }

    fn stopped_snapshot(&self, operation: &'static str) -> OpenCutResult<FrameSnapshot> {
        let shared = self.shared.lock();
        if !shared.state.is_stopped() {
            return Err(shared.invalid_state(operation));
        }
        Ok(shared.buffer.snapshot())
    }

    fn write_gif(&self, snapshot: &FrameSnapshot, path: &Path) -> OpenCutResult<ExportSummary> {
        let document = GifEncoder::from_config(&self.config).encode(snapshot.frames())?;
        let bytes = document.to_bytes()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, &bytes)?;

        Ok(ExportSummary {
            path: path.to_path_buf(),
            frame_count: document.frame_count(),
            file_size_bytes: bytes.len() as u64,
            duration_secs: document.duration().as_secs_f64(),
        })
    }

    fn end_loop(&mut self, command: RecorderCommand) -> OpenCutResult<()> {
        match &self.active {
            Some(handle) => handle.send(command),
            None => return Ok(()),
        }
        self.join_loop()
    }

    /// Join a capture thread that has ended or already published its outcome.
    fn reap(&mut self) -> OpenCutResult<()> {
        let Some(handle) = &self.active else {
            return Ok(());
        };
        // The thread publishes its final state just before it exits.
        let ended = handle.is_finished() || !self.shared.lock().state.is_recording();
        if ended {
            self.join_loop()?;
        }
        Ok(())
    }

    fn join_loop(&mut self) -> OpenCutResult<()> {
        let Some(handle) = self.active.take() else {
            return Ok(());
        };
        if let Err(e) = handle.join() {
            log::error!("[SESSION] {}", e);
            let mut guard = self.shared.lock();
            let shared = &mut *guard;
            if let SessionState::Recording { region, .. } = shared.state {
                shared.buffer = FrameBuffer::new(self.config.max_frame_count);
                shared.transition(
                    &self.events,
                    SessionState::Stopped {
                        region,
                        frame_count: 0,
                        reason: StopReason::CaptureFailed {
                            message: e.to_string(),
                        },
                    },
                );
            }
            return Err(e);
        }
        Ok(())
    }

    /// Report a rejected command to subscribers and hand the error back.
    fn reject(&self, error: OpenCutError) -> OpenCutError {
        log::warn!("[SESSION] {}", error);
        self.events.emit(RecordingEvent::Error {
            message: error.to_string(),
        });
        error
    }
}

/// Take back the loop's buffer and leave `Recording`. Runs on the capture
/// thread.
fn publish_outcome(
    shared: &Mutex<Shared>,
    events: &EventHub,
    progress: &RecordingProgress,
    region: Region,
    outcome: LoopOutcome,
) {
    let LoopOutcome { buffer, reason } = outcome;
    let mut shared = shared.lock();

    if reason == StopReason::Cancelled {
        log::info!("[SESSION] Recording cancelled, {} frames dropped", buffer.len());
        shared.buffer.clear();
        shared.transition(events, SessionState::Idle);
        return;
    }

    log::info!(
        "[SESSION] Recording stopped ({:?}): {} frames, {} dropped ticks",
        reason,
        buffer.len(),
        progress.get_dropped_ticks()
    );
    let frame_count = buffer.len();
    shared.buffer = buffer;
    shared.transition(
        events,
        SessionState::Stopped {
            region,
            frame_count,
            reason,
        },
    );
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.send(RecorderCommand::Stop);
            if let Err(e) = handle.join() {
                log::error!("[SESSION] {}", e);
            }
        }
    }
}
