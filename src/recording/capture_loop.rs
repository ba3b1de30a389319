//! Scheduled capture on a dedicated thread.
//!
//! Ticks fall on `start + k * interval` for k = 1, 2, ... At each tick the
//! loop checks for a stop command, stamps the time, reads the frame source
//! and appends the frame. A capture that overruns its slot causes the missed
//! ticks to be skipped; the loop never bursts to catch up. Waiting between
//! ticks happens on the command channel, so a stop wakes the loop at once.
//!
//! When the loop ends, for any reason, its outcome is handed to an exit hook
//! on the capture thread itself, so owners learn about automatic stops
//! without polling.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use super::buffer::FrameBuffer;
use super::events::{EventHub, RecordingEvent};
use super::state::{RecorderCommand, RecordingProgress};
use super::types::StopReason;
use crate::capture::{Frame, FrameSource, Region};
use crate::error::{OpenCutError, OpenCutResult};

/// Everything the capture thread owns while recording.
pub struct CaptureLoop {
    pub source: Arc<dyn FrameSource>,
    pub region: Region,
    pub interval: Duration,
    pub buffer: FrameBuffer,
    pub progress: Arc<RecordingProgress>,
    pub events: EventHub,
    /// Emit a progress event every N frames (0 disables).
    pub progress_event_every: u64,
}

/// What the capture loop hands back when it ends.
#[derive(Debug)]
pub struct LoopOutcome {
    pub buffer: FrameBuffer,
    pub reason: StopReason,
}

/// Control side of a running capture thread.
pub struct CaptureLoopHandle {
    command_tx: Sender<RecorderCommand>,
    done_rx: Receiver<()>,
    thread: JoinHandle<()>,
}

impl CaptureLoopHandle {
    /// Ask the loop to end at its next tick boundary.
    pub fn send(&self, command: RecorderCommand) {
        // A closed channel means the loop already exited on its own.
        if self.command_tx.send(command).is_err() {
            log::debug!("[CAPTURE] Loop already finished, {:?} not delivered", command);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until the loop ends or `timeout` elapses. Returns true if it ended.
    pub fn wait(&self, timeout: Duration) -> bool {
        match self.done_rx.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => self.is_finished(),
        }
    }

    /// Join the capture thread.
    pub fn join(self) -> OpenCutResult<()> {
        self.thread
            .join()
            .map_err(|_| OpenCutError::Other("Capture thread panicked".to_string()))
    }
}

impl CaptureLoop {
    /// Start the loop on its own thread. `on_exit` runs on that thread with
    /// the outcome before the handle reports the loop as finished.
    pub fn spawn<F>(self, on_exit: F) -> OpenCutResult<CaptureLoopHandle>
    where
        F: FnOnce(LoopOutcome) + Send + 'static,
    {
        let (command_tx, command_rx) = bounded::<RecorderCommand>(10);
        let (done_tx, done_rx) = bounded::<()>(1);

        let thread = std::thread::Builder::new()
            .name("opencut-capture".to_string())
            .spawn(move || {
                on_exit(self.run(&command_rx));
                let _ = done_tx.send(());
            })?;

        Ok(CaptureLoopHandle {
            command_tx,
            done_rx,
            thread,
        })
    }

    /// Run until stopped, the buffer fills, or the source fails.
    pub fn run(mut self, command_rx: &Receiver<RecorderCommand>) -> LoopOutcome {
        log::debug!(
            "[CAPTURE] Starting loop: region={}, interval={:?}, source={}, limit={}",
            self.region,
            self.interval,
            self.source.name(),
            self.buffer.capacity()
        );

        let start = Instant::now();
        let mut next_tick = start + self.interval;

        let reason = loop {
            let now = Instant::now();
            if now < next_tick {
                match command_rx.recv_timeout(next_tick - now) {
                    Ok(command) => break stop_reason(command),
                    Err(RecvTimeoutError::Disconnected) => break StopReason::Requested,
                    Err(RecvTimeoutError::Timeout) => continue,
                }
            }

            // A stop that raced the deadline still wins over a new capture.
            match command_rx.try_recv() {
                Ok(command) => break stop_reason(command),
                Err(TryRecvError::Disconnected) => break StopReason::Requested,
                Err(TryRecvError::Empty) => {},
            }

            if let Some(reason) = self.tick() {
                break reason;
            }

            next_tick += self.interval;
            let now = Instant::now();
            if now >= next_tick {
                let behind = now - next_tick;
                let missed = (behind.as_nanos() / self.interval.as_nanos().max(1)) as u64 + 1;
                next_tick += self.interval * missed as u32;
                self.progress.add_dropped_ticks(missed);
                log::debug!(
                    "[CAPTURE] Capture overran by {:?}, dropped {} tick(s)",
                    behind,
                    missed
                );
            }
        };

        let elapsed = start.elapsed();
        log::debug!(
            "[CAPTURE] Loop ended ({:?}): {} frames in {:.2}s, {} dropped ticks",
            reason,
            self.buffer.len(),
            elapsed.as_secs_f64(),
            self.progress.get_dropped_ticks()
        );

        LoopOutcome {
            buffer: self.buffer,
            reason,
        }
    }

    /// Capture and store one frame. Returns a reason when the loop must end.
    fn tick(&mut self) -> Option<StopReason> {
        let captured_at = Instant::now();

        let captured = match self.source.capture(&self.region) {
            Ok(captured) => captured,
            Err(e) => {
                log::error!("[CAPTURE] Frame source failed: {}", e);
                let message = e.to_string();
                self.events.emit(RecordingEvent::CaptureFailed {
                    message: message.clone(),
                });
                return Some(StopReason::CaptureFailed { message });
            },
        };

        if captured.width != self.region.width || captured.height != self.region.height {
            let message = format!(
                "Frame source returned {}x{} for region {}",
                captured.width, captured.height, self.region
            );
            log::error!("[CAPTURE] {}", message);
            self.events.emit(RecordingEvent::CaptureFailed {
                message: message.clone(),
            });
            return Some(StopReason::CaptureFailed { message });
        }

        match self.buffer.append(Frame::new(captured, captured_at)) {
            Ok(_) => {},
            Err(OpenCutError::BufferLimitReached { limit }) => {
                return Some(self.limit_reached(limit));
            },
            Err(e) => {
                log::error!("[CAPTURE] Aborting recording: {}", e);
                return Some(StopReason::OrderingViolation {
                    message: e.to_string(),
                });
            },
        }

        let frame_count = self.progress.increment_frame();
        if self.progress_event_every > 0 && frame_count % self.progress_event_every == 0 {
            self.events.emit(RecordingEvent::Progress {
                frame_count,
                elapsed_secs: self.progress.elapsed().as_secs_f64(),
            });
        }

        if self.buffer.is_full() {
            return Some(self.limit_reached(self.buffer.capacity()));
        }

        None
    }

    fn limit_reached(&self, limit: usize) -> StopReason {
        log::info!("[CAPTURE] Frame limit of {} reached, stopping", limit);
        self.events.emit(RecordingEvent::BufferLimitReached { limit });
        StopReason::BufferLimitReached { limit }
    }
}

fn stop_reason(command: RecorderCommand) -> StopReason {
    match command {
        RecorderCommand::Stop => StopReason::Requested,
        RecorderCommand::Cancel => StopReason::Cancelled,
    }
}
