//! Recording session: capture + transcription + duration limit.

use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::RecorderError;
use crate::capture::{AudioCapture, AudioInput, CaptureConstraints};
use crate::transcription::{
    RecognitionEvent, RecognitionSession, RecognitionSettings, Transcript, TranscriptionProvider,
};

/// Default recording limit.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(90);

/// Recorder settings.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Recording stops by itself once this much time has elapsed.
    pub max_duration: Duration,
    pub constraints: CaptureConstraints,
    pub recognition: RecognitionSettings,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            max_duration: DEFAULT_MAX_DURATION,
            constraints: CaptureConstraints::VOICE,
            recognition: RecognitionSettings::default(),
        }
    }
}

impl RecorderConfig {
    /// Config with a custom limit.
    #[must_use]
    pub fn with_max_duration(max_duration: Duration) -> Self {
        Self {
            max_duration,
            ..Self::default()
        }
    }

    /// Limit in whole seconds, never less than one.
    fn max_secs(&self) -> u32 {
        u32::try_from(self.max_duration.as_secs())
            .unwrap_or(u32::MAX)
            .max(1)
    }
}

/// What the record button shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderStatus {
    /// Not recording; the placeholder prompt is visible.
    Idle,
    /// Waiting for microphone and recognizer.
    Starting,
    /// Capturing; `elapsed_secs` counts whole seconds.
    Recording { elapsed_secs: u32 },
    /// Tearing down and assembling the recording.
    Stopping,
}

/// Why a recording ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The user pressed stop (or dropped the handle).
    Requested,
    /// The duration limit was reached.
    MaxDuration,
    /// The audio source closed on its own.
    InputEnded,
}

/// Audio joined from every captured chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBlob {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl AudioBlob {
    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A finished recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub audio: AudioBlob,
    /// Final transcript, including the last interim text.
    pub transcript: String,
    pub duration_secs: u32,
    pub stop_reason: StopReason,
}

/// Callbacks from a running recording.
///
/// Called from the recording task; implementations should return quickly.
pub trait RecorderListener: Send + Sync + 'static {
    /// The transcript changed.
    fn on_transcript(&self, _transcript: &str) {}

    /// Another second elapsed.
    fn on_tick(&self, _elapsed_secs: u32) {}

    /// The recording finished; audio and transcript are delivered together.
    fn on_complete(&self, _recording: &Recording) {}
}

impl RecorderListener for () {}

/// Records voice clips.
///
/// One recording at a time; `start` while recording fails with
/// [`RecorderError::AlreadyRecording`].
pub struct VoiceRecorder {
    config: RecorderConfig,
    input: Arc<dyn AudioInput>,
    transcription: TranscriptionProvider,
    status: Arc<watch::Sender<RecorderStatus>>,
}

impl VoiceRecorder {
    /// Create a recorder with its capabilities.
    pub fn new(
        config: RecorderConfig,
        input: Arc<dyn AudioInput>,
        transcription: TranscriptionProvider,
    ) -> Self {
        let (status, _) = watch::channel(RecorderStatus::Idle);
        Self {
            config,
            input,
            transcription,
            status: Arc::new(status),
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> RecorderStatus {
        *self.status.borrow()
    }

    /// Watch status changes (elapsed seconds, idle/recording).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RecorderStatus> {
        self.status.subscribe()
    }

    /// Whether the "press to record" placeholder should be shown.
    #[must_use]
    pub fn prompt_visible(&self) -> bool {
        self.status() == RecorderStatus::Idle
    }

    /// Whether live transcription will run.
    #[must_use]
    pub const fn transcription_available(&self) -> bool {
        self.transcription.is_available()
    }

    /// Start recording.
    ///
    /// Opens the microphone, then the recognizer if one is available, and
    /// spawns the task that runs until [`RecordingHandle::stop`] or the
    /// duration limit.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::AlreadyRecording`] if a recording is running.
    /// Microphone and recognizer start failures are logged and returned; the
    /// recorder goes back to [`RecorderStatus::Idle`] and nothing is retried.
    pub async fn start(
        &self,
        listener: Arc<dyn RecorderListener>,
    ) -> Result<RecordingHandle, RecorderError> {
        let claimed = self.status.send_if_modified(|status| {
            if *status == RecorderStatus::Idle {
                *status = RecorderStatus::Starting;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(RecorderError::AlreadyRecording);
        }

        let mut capture = match self.input.open(&self.config.constraints).await {
            Ok(capture) => capture,
            Err(e) => {
                tracing::error!(error = %e, "Failed to open microphone");
                self.status.send_replace(RecorderStatus::Idle);
                return Err(e);
            }
        };

        let recognition = match &self.transcription {
            TranscriptionProvider::Available(recognizer) => {
                match recognizer.start(&self.config.recognition).await {
                    Ok(session) => Some(session),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to start speech recognition");
                        capture.tracks.stop();
                        self.status.send_replace(RecorderStatus::Idle);
                        return Err(e);
                    }
                }
            }
            TranscriptionProvider::Unavailable => {
                tracing::debug!("Live transcription unavailable, recording audio only");
                None
            }
        };

        self.status
            .send_replace(RecorderStatus::Recording { elapsed_secs: 0 });
        tracing::info!(
            max_secs = self.config.max_secs(),
            transcription = recognition.is_some(),
            "Recording started"
        );

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run_recording(
            capture,
            recognition,
            self.config.max_secs(),
            stop_rx,
            listener,
            Arc::clone(&self.status),
        ));

        Ok(RecordingHandle {
            stop_tx: Some(stop_tx),
            task,
        })
    }
}

/// Handle to a running recording.
pub struct RecordingHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<Recording>,
}

impl RecordingHandle {
    /// Stop now and return the recording.
    ///
    /// If the duration limit already stopped it, returns that recording.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::Task`] if the recording task panicked.
    pub async fn stop(mut self) -> Result<Recording, RecorderError> {
        if let Some(tx) = self.stop_tx.take() {
            // The task may already be gone after an automatic stop
            let _ = tx.send(());
        }
        self.join().await
    }

    /// Wait for the recording to end by itself (duration limit or input end).
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::Task`] if the recording task panicked.
    pub async fn finished(mut self) -> Result<Recording, RecorderError> {
        // Keep the stop sender alive so waiting does not count as a stop request
        let _keep = self.stop_tx.take();
        self.join().await
    }

    /// Whether the recording task has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    async fn join(self) -> Result<Recording, RecorderError> {
        self.task
            .await
            .map_err(|e| RecorderError::Task(e.to_string()))
    }
}

async fn next_recognition(
    session: Option<&mut RecognitionSession>,
) -> Option<Result<RecognitionEvent, RecorderError>> {
    match session {
        Some(session) => session.events.next().await,
        None => std::future::pending().await,
    }
}

async fn run_recording(
    mut capture: AudioCapture,
    mut recognition: Option<RecognitionSession>,
    max_secs: u32,
    mut stop_rx: oneshot::Receiver<()>,
    listener: Arc<dyn RecorderListener>,
    status: Arc<watch::Sender<RecorderStatus>>,
) -> Recording {
    let mut chunks: Vec<Vec<u8>> = Vec::new();
    let mut transcript = Transcript::default();
    let mut recognition_open = recognition.is_some();
    let mut elapsed_secs: u32 = 0;

    let period = Duration::from_secs(1);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let stop_reason = loop {
        tokio::select! {
            _ = &mut stop_rx => break StopReason::Requested,
            chunk = capture.chunks.next() => match chunk {
                Some(chunk) => chunks.push(chunk),
                None => break StopReason::InputEnded,
            },
            update = next_recognition(recognition.as_mut()), if recognition_open => match update {
                Some(Ok(event)) => {
                    let text = transcript.apply(&event);
                    listener.on_transcript(&text);
                }
                Some(Err(e)) => tracing::warn!(error = %e, "Speech recognition error"),
                None => {
                    tracing::debug!("Speech recognition ended");
                    recognition_open = false;
                }
            },
            _ = ticker.tick() => {
                elapsed_secs += 1;
                status.send_replace(RecorderStatus::Recording { elapsed_secs });
                listener.on_tick(elapsed_secs);
                if elapsed_secs >= max_secs {
                    break StopReason::MaxDuration;
                }
            }
        }
    };

    status.send_replace(RecorderStatus::Stopping);

    if let Some(session) = recognition.as_mut() {
        session.handle.stop();
    }
    capture.tracks.stop();

    // Flush whatever the source had already buffered
    while let Some(Some(chunk)) = capture.chunks.next().now_or_never() {
        chunks.push(chunk);
    }

    let recording = Recording {
        audio: AudioBlob {
            mime_type: capture.mime_type,
            bytes: chunks.concat(),
        },
        transcript: transcript.current(),
        duration_secs: elapsed_secs,
        stop_reason,
    };

    tracing::info!(
        bytes = recording.audio.len(),
        duration_secs = recording.duration_secs,
        reason = ?recording.stop_reason,
        "Recording finished"
    );

    listener.on_complete(&recording);
    status.send_replace(RecorderStatus::Idle);
    recording
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use futures::future::BoxFuture;

    use super::*;
    use crate::capture::{AudioFeed, audio_channel};
    use crate::transcription::{
        RecognitionFeed, RecognitionResult, SpeechRecognizer, recognition_channel,
    };

    /// Microphone that hands out pre-built captures.
    struct FakeMic {
        capture: Mutex<Option<AudioCapture>>,
        deny: bool,
    }

    impl FakeMic {
        fn new() -> (Self, AudioFeed) {
            let (feed, capture) = audio_channel("audio/webm");
            (
                Self {
                    capture: Mutex::new(Some(capture)),
                    deny: false,
                },
                feed,
            )
        }

        fn denied() -> Self {
            Self {
                capture: Mutex::new(None),
                deny: true,
            }
        }
    }

    impl AudioInput for FakeMic {
        fn open(
            &self,
            constraints: &CaptureConstraints,
        ) -> BoxFuture<'_, Result<AudioCapture, RecorderError>> {
            assert_eq!(*constraints, CaptureConstraints::VOICE);
            let result = if self.deny {
                Err(RecorderError::PermissionDenied("NotAllowedError".to_string()))
            } else {
                self.capture
                    .lock()
                    .unwrap()
                    .take()
                    .ok_or_else(|| RecorderError::DeviceUnavailable("busy".to_string()))
            };
            Box::pin(async move { result })
        }
    }

    struct FakeRecognizer {
        session: Mutex<Option<RecognitionSession>>,
    }

    impl FakeRecognizer {
        fn new() -> (Self, RecognitionFeed) {
            let (feed, session) = recognition_channel();
            (
                Self {
                    session: Mutex::new(Some(session)),
                },
                feed,
            )
        }
    }

    impl SpeechRecognizer for FakeRecognizer {
        fn start(
            &self,
            settings: &RecognitionSettings,
        ) -> BoxFuture<'_, Result<RecognitionSession, RecorderError>> {
            assert!(settings.continuous && settings.interim_results);
            let result = self
                .session
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| RecorderError::RecognitionStart("not-allowed".to_string()));
            Box::pin(async move { result })
        }
    }

    #[derive(Default)]
    struct Collector {
        transcripts: Mutex<Vec<String>>,
        ticks: Mutex<Vec<u32>>,
        completed: Mutex<Vec<Recording>>,
    }

    impl RecorderListener for Collector {
        fn on_transcript(&self, transcript: &str) {
            self.transcripts.lock().unwrap().push(transcript.to_string());
        }

        fn on_tick(&self, elapsed_secs: u32) {
            self.ticks.lock().unwrap().push(elapsed_secs);
        }

        fn on_complete(&self, recording: &Recording) {
            self.completed.lock().unwrap().push(recording.clone());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_stop_at_max_duration() {
        let (mic, feed) = FakeMic::new();
        let recorder = VoiceRecorder::new(
            RecorderConfig::with_max_duration(Duration::from_secs(90)),
            Arc::new(mic),
            TranscriptionProvider::Unavailable,
        );
        let collector = Arc::new(Collector::default());

        let handle = recorder.start(collector.clone()).await.unwrap();
        feed.push(vec![0xAA; 4]);

        let recording = handle.finished().await.unwrap();
        assert_eq!(recording.stop_reason, StopReason::MaxDuration);
        assert_eq!(recording.duration_secs, 90);

        let ticks = collector.ticks.lock().unwrap().clone();
        assert_eq!(ticks.len(), 90);
        assert!(ticks.iter().all(|t| *t <= 90));
        assert_eq!(ticks.last(), Some(&90));

        assert_eq!(collector.completed.lock().unwrap().len(), 1);
        assert!(feed.is_stopped());
        assert_eq!(recorder.status(), RecorderStatus::Idle);
        assert!(recorder.prompt_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_merges_audio_and_transcript() {
        let (mic, audio) = FakeMic::new();
        let (recognizer, speech) = FakeRecognizer::new();
        let recorder = VoiceRecorder::new(
            RecorderConfig::default(),
            Arc::new(mic),
            TranscriptionProvider::available(recognizer),
        );
        assert!(recorder.transcription_available());
        let collector = Arc::new(Collector::default());

        let handle = recorder.start(collector.clone()).await.unwrap();
        assert_eq!(
            recorder.status(),
            RecorderStatus::Recording { elapsed_secs: 0 }
        );

        audio.push(vec![1, 2, 3]);
        speech.push(RecognitionEvent {
            result_index: 0,
            results: vec![RecognitionResult::interim("hello")],
        });
        tokio::time::sleep(Duration::from_millis(2500)).await;
        audio.push(vec![4, 5]);
        speech.push(RecognitionEvent {
            result_index: 0,
            results: vec![RecognitionResult::final_text("hello world")],
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let recording = handle.stop().await.unwrap();
        assert_eq!(recording.stop_reason, StopReason::Requested);
        assert_eq!(recording.audio.bytes, vec![1, 2, 3, 4, 5]);
        assert_eq!(recording.audio.mime_type, "audio/webm");
        assert_eq!(recording.transcript, "hello world");
        assert_eq!(recording.duration_secs, 2);

        assert_eq!(
            collector.transcripts.lock().unwrap().as_slice(),
            &["hello".to_string(), "hello world".to_string()]
        );
        assert!(audio.is_stopped());
        assert!(speech.is_stopped());
        assert_eq!(collector.completed.lock().unwrap().first(), Some(&recording));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recognition_errors_do_not_stop_recording() {
        let (mic, audio) = FakeMic::new();
        let (recognizer, speech) = FakeRecognizer::new();
        let recorder = VoiceRecorder::new(
            RecorderConfig::default(),
            Arc::new(mic),
            TranscriptionProvider::available(recognizer),
        );

        let handle = recorder.start(Arc::new(())).await.unwrap();
        speech.push_error("no-speech");
        audio.push(vec![9]);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!handle.is_finished());

        let recording = handle.stop().await.unwrap();
        assert_eq!(recording.audio.bytes, vec![9]);
        assert_eq!(recording.transcript, "");
    }

    #[tokio::test]
    async fn test_permission_denied_stays_idle() {
        let recorder = VoiceRecorder::new(
            RecorderConfig::default(),
            Arc::new(FakeMic::denied()),
            TranscriptionProvider::Unavailable,
        );

        let err = recorder.start(Arc::new(())).await.err().unwrap();
        assert!(matches!(err, RecorderError::PermissionDenied(_)));
        assert_eq!(recorder.status(), RecorderStatus::Idle);
        assert!(recorder.prompt_visible());
    }

    #[tokio::test]
    async fn test_recognizer_start_failure_releases_microphone() {
        let (mic, audio) = FakeMic::new();
        let (recognizer, _speech) = FakeRecognizer::new();
        // Consume the only session so the next start fails
        recognizer.session.lock().unwrap().take();

        let recorder = VoiceRecorder::new(
            RecorderConfig::default(),
            Arc::new(mic),
            TranscriptionProvider::available(recognizer),
        );

        let err = recorder.start(Arc::new(())).await.err().unwrap();
        assert!(matches!(err, RecorderError::RecognitionStart(_)));
        assert!(audio.is_stopped());
        assert_eq!(recorder.status(), RecorderStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_is_rejected() {
        let (mic, _audio) = FakeMic::new();
        let recorder = VoiceRecorder::new(
            RecorderConfig::default(),
            Arc::new(mic),
            TranscriptionProvider::Unavailable,
        );

        let handle = recorder.start(Arc::new(())).await.unwrap();
        assert_eq!(
            recorder.start(Arc::new(())).await.err(),
            Some(RecorderError::AlreadyRecording)
        );
        handle.stop().await.unwrap();
        assert_eq!(recorder.status(), RecorderStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_end_stops_recording() {
        let (mic, audio) = FakeMic::new();
        let recorder = VoiceRecorder::new(
            RecorderConfig::default(),
            Arc::new(mic),
            TranscriptionProvider::Unavailable,
        );

        let handle = recorder.start(Arc::new(())).await.unwrap();
        audio.push(vec![7, 7]);
        drop(audio);

        let recording = handle.finished().await.unwrap();
        assert_eq!(recording.stop_reason, StopReason::InputEnded);
        assert_eq!(recording.audio.bytes, vec![7, 7]);
    }
}
