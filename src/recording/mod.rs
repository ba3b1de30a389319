//! Region recording: the session state machine, its capture loop and the
//! in-memory frame buffer.

pub mod buffer;
pub mod capture_loop;
pub mod events;
pub mod session;
pub mod state;
pub mod types;


pub use buffer::{FrameBuffer, FrameSnapshot};
pub use capture_loop::{CaptureLoop, CaptureLoopHandle, LoopOutcome};
pub use events::{EventHub, RecordingEvent};
pub use session::RecordingSession;
pub use state::{RecorderCommand, RecordingProgress};
pub use types::{ExportSummary, RecordingSummary, SessionState, StopReason};
