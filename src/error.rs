//! Central error types for OpenCut.
//!
//! Every fallible operation of the capture/encode core returns
//! [`OpenCutResult`]. Errors implement `Serialize` so front ends can forward
//! them verbatim as event payloads.

use serde::Serialize;
use thiserror::Error;

/// Main error type for OpenCut operations.
#[derive(Error, Debug)]
pub enum OpenCutError {
    /// Region is degenerate or not fully on one display
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// A recording is running or waiting to be exported
    #[error("Session busy: {0}")]
    SessionBusy(String),

    /// Operation not allowed in the current session state
    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    /// Screen capture failed
    #[error("Capture failed: {0}")]
    CaptureError(String),

    /// Frame buffer is full
    #[error("Frame buffer limit of {limit} frames reached")]
    BufferLimitReached { limit: usize },

    /// Frame timestamp did not advance past the previous frame
    #[error("Frame timestamp out of order: {attempted_ms}ms is not after {previous_ms}ms")]
    OrderingError { previous_ms: u128, attempted_ms: u128 },

    /// Export attempted with zero frames
    #[error("Recording contains no frames")]
    EmptyRecording,

    /// File write failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// GIF encoder failed
    #[error("Encoder error: {0}")]
    EncoderError(String),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl OpenCutError {
    /// Whether the user can recover by retrying, reselecting or re-recording.
    ///
    /// Ordering violations are programming errors and are never recoverable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, OpenCutError::OrderingError { .. })
    }
}

impl Serialize for OpenCutError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<gif::EncodingError> for OpenCutError {
    fn from(err: gif::EncodingError) -> Self {
        match err {
            gif::EncodingError::Io(io) => OpenCutError::Io(io),
            other => OpenCutError::EncoderError(other.to_string()),
        }
    }
}

impl From<xcap::XCapError> for OpenCutError {
    fn from(err: xcap::XCapError) -> Self {
        match err {
            xcap::XCapError::InvalidCaptureRegion(msg) => OpenCutError::InvalidRegion(msg),
            other => OpenCutError::CaptureError(other.to_string()),
        }
    }
}

/// Type alias for Results using OpenCutError.
pub type OpenCutResult<T> = Result<T, OpenCutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OpenCutError::CaptureError("display gone".to_string());
        assert_eq!(err.to_string(), "Capture failed: display gone");

        let err = OpenCutError::BufferLimitReached { limit: 3 };
        assert_eq!(err.to_string(), "Frame buffer limit of 3 frames reached");
    }

    #[test]
    fn test_invalid_state_display() {
        let err = OpenCutError::InvalidState {
            operation: "start",
            state: "idle".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot start while session is idle");
    }

    #[test]
    fn test_error_serialization() {
        let err = OpenCutError::EmptyRecording;
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Recording contains no frames\"");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: OpenCutError = io_err.into();
        assert!(matches!(err, OpenCutError::Io(_)));
    }

    #[test]
    fn test_from_xcap_error() {
        let err: OpenCutError = xcap::XCapError::Error("no display".to_string()).into();
        assert!(matches!(err, OpenCutError::CaptureError(ref msg) if msg == "no display"));

        let err: OpenCutError = xcap::XCapError::InvalidCaptureRegion("off screen".to_string()).into();
        assert!(matches!(err, OpenCutError::InvalidRegion(_)));
    }

    #[test]
    fn test_ordering_is_not_recoverable() {
        let ordering = OpenCutError::OrderingError {
            previous_ms: 10,
            attempted_ms: 10,
        };
        assert!(!ordering.is_recoverable());
        assert!(OpenCutError::EmptyRecording.is_recoverable());
        assert!(OpenCutError::InvalidRegion("zero width".into()).is_recoverable());
    }
}
