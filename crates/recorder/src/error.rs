//! Recorder error types.

use thiserror::Error;

/// Errors that can occur while starting or running a recording.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecorderError {
    /// The user (or platform) refused microphone access.
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    /// No usable capture device.
    #[error("no microphone available: {0}")]
    DeviceUnavailable(String),

    /// The speech recognizer could not be started.
    #[error("speech recognition failed to start: {0}")]
    RecognitionStart(String),

    /// The speech recognizer reported an error mid-recording.
    #[error("speech recognition error: {0}")]
    Recognition(String),

    /// `start` was called while a recording is running.
    #[error("a recording is already in progress")]
    AlreadyRecording,

    /// The recording task panicked or was cancelled.
    #[error("recording task failed: {0}")]
    Task(String),
}
