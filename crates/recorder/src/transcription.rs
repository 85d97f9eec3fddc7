//! Live speech-to-text capability.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use tokio::sync::mpsc;

use crate::RecorderError;
use crate::capture::TrackHandle;

/// Recognizer options for a recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionSettings {
    /// Keep listening across pauses instead of stopping after one phrase.
    pub continuous: bool,
    /// Report provisional results while the speaker is mid-phrase.
    pub interim_results: bool,
    /// BCP 47 language tag.
    pub language: String,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            continuous: true,
            interim_results: true,
            language: "en-US".to_string(),
        }
    }
}

/// One recognized phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    pub transcript: String,
    /// `false` for interim results that may still change.
    pub is_final: bool,
}

impl RecognitionResult {
    /// A final result.
    pub fn final_text(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
        }
    }

    /// An interim result.
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
        }
    }
}

/// A recognizer update.
///
/// `results` holds every result of the session so far; entries before
/// `result_index` are unchanged since the previous event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionEvent {
    pub result_index: usize,
    pub results: Vec<RecognitionResult>,
}

/// A running recognizer: its update stream plus the handle that stops it.
pub struct RecognitionSession {
    pub(crate) events: BoxStream<'static, Result<RecognitionEvent, RecorderError>>,
    pub(crate) handle: Box<dyn TrackHandle>,
}

impl RecognitionSession {
    /// Bundle an update stream with its stop handle.
    pub fn new(
        events: BoxStream<'static, Result<RecognitionEvent, RecorderError>>,
        handle: Box<dyn TrackHandle>,
    ) -> Self {
        Self { events, handle }
    }
}

/// A speech-to-text engine.
pub trait SpeechRecognizer: Send + Sync {
    /// Start recognizing with `settings`.
    fn start(
        &self,
        settings: &RecognitionSettings,
    ) -> BoxFuture<'_, Result<RecognitionSession, RecorderError>>;
}

/// Whether live transcription exists on this platform.
///
/// Chosen once at startup and handed to the recorder.
#[derive(Clone, Default)]
pub enum TranscriptionProvider {
    /// Transcribe with this recognizer.
    Available(Arc<dyn SpeechRecognizer>),
    /// Record audio only; the transcript stays empty.
    #[default]
    Unavailable,
}

impl TranscriptionProvider {
    /// Wrap a recognizer.
    pub fn available(recognizer: impl SpeechRecognizer + 'static) -> Self {
        Self::Available(Arc::new(recognizer))
    }

    /// Whether a recognizer is present.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

impl std::fmt::Debug for TranscriptionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available(_) => f.write_str("TranscriptionProvider::Available"),
            Self::Unavailable => f.write_str("TranscriptionProvider::Unavailable"),
        }
    }
}

/// Running transcript of one recording.
///
/// Final results accumulate; interim results are replaced by each update.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    finalized: String,
    interim: String,
}

impl Transcript {
    /// Apply a recognizer update and return the current text.
    pub fn apply(&mut self, event: &RecognitionEvent) -> String {
        self.interim.clear();
        for result in event.results.iter().skip(event.result_index) {
            if result.is_final {
                self.finalized.push_str(&result.transcript);
            } else {
                self.interim.push_str(&result.transcript);
            }
        }
        self.current()
    }

    /// Final text followed by the latest interim text.
    #[must_use]
    pub fn current(&self) -> String {
        format!("{}{}", self.finalized, self.interim)
    }

    /// Text confirmed by the recognizer.
    #[must_use]
    pub fn finalized(&self) -> &str {
        &self.finalized
    }
}

/// Producer side of [`recognition_channel`].
#[derive(Clone)]
pub struct RecognitionFeed {
    tx: mpsc::UnboundedSender<Result<RecognitionEvent, RecorderError>>,
    stopped: Arc<AtomicBool>,
}

impl RecognitionFeed {
    /// Deliver an update. Returns `false` once the session was stopped.
    pub fn push(&self, event: RecognitionEvent) -> bool {
        !self.is_stopped() && self.tx.send(Ok(event)).is_ok()
    }

    /// Deliver a recognizer error (e.g. `no-speech`).
    pub fn push_error(&self, message: impl Into<String>) -> bool {
        !self.is_stopped()
            && self
                .tx
                .send(Err(RecorderError::Recognition(message.into())))
                .is_ok()
    }

    /// Whether the recorder has stopped the session.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

struct ChannelSession {
    stopped: Arc<AtomicBool>,
}

impl TrackHandle for ChannelSession {
    fn stop(&mut self) {
        self.stopped.store(true, Ordering::Release);
    }
}

/// Create a [`RecognitionSession`] fed from another task or thread.
#[must_use]
pub fn recognition_channel() -> (RecognitionFeed, RecognitionSession) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let stopped = Arc::new(AtomicBool::new(false));

    let feed = RecognitionFeed {
        tx,
        stopped: Arc::clone(&stopped),
    };
    let events = Box::pin(stream::poll_fn(move |cx| rx.poll_recv(cx)));
    let session = RecognitionSession::new(events, Box::new(ChannelSession { stopped }));

    (feed, session)
}
