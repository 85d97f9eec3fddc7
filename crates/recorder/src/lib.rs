//! Voice clip recorder with live transcription.
//!
//! A recording runs two independent activities side by side:
//!
//! - audio capture from an [`AudioInput`], collected as chunks and joined into
//!   one [`AudioBlob`] when the recording stops
//! - speech-to-text from a [`SpeechRecognizer`], whose running transcript is
//!   reported to the [`RecorderListener`] on every update
//!
//! A one-second ticker counts elapsed time and stops the recording when
//! [`RecorderConfig::max_duration`] is reached. Audio and transcript are only
//! merged at stop time; the order in which their events arrive is not
//! significant.
//!
//! Whether live transcription exists at all is decided once, when the
//! [`TranscriptionProvider`] is chosen, rather than detected per recording.
//!
//! # Example
//!
//! ```rust,ignore
//! let recorder = VoiceRecorder::new(
//!     RecorderConfig::default(),
//!     Arc::new(microphone),
//!     TranscriptionProvider::available(recognizer),
//! );
//!
//! let handle = recorder.start(Arc::new(listener)).await?;
//! // ... user clicks stop
//! let recording = handle.stop().await?;
//! println!("{} bytes, transcript: {}", recording.audio.len(), recording.transcript);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

mod capture;
mod error;
mod recorder;
mod transcription;

pub use capture::{
    AudioCapture, AudioFeed, AudioInput, CaptureConstraints, ChunkStream, TrackHandle,
    audio_channel,
};
pub use error::RecorderError;
pub use recorder::{
    AudioBlob, DEFAULT_MAX_DURATION, RecorderConfig, RecorderListener, RecorderStatus, Recording,
    RecordingHandle, StopReason, VoiceRecorder,
};
pub use transcription::{
    RecognitionEvent, RecognitionFeed, RecognitionResult, RecognitionSession,
    RecognitionSettings, SpeechRecognizer, Transcript, TranscriptionProvider, recognition_channel,
};
