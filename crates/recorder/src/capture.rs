//! Microphone capture abstraction.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use tokio::sync::mpsc;

use crate::RecorderError;

/// Encoded audio chunks, in arrival order.
pub type ChunkStream = BoxStream<'static, Vec<u8>>;

/// Capture parameters requested from the microphone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    /// Number of channels (1 = mono).
    pub channel_count: u16,
    /// Ask the platform to cancel speaker echo.
    pub echo_cancellation: bool,
    /// Ask the platform to suppress background noise.
    pub noise_suppression: bool,
}

impl CaptureConstraints {
    /// Mono, echo-cancelled, noise-suppressed voice capture.
    pub const VOICE: Self = Self {
        channel_count: 1,
        echo_cancellation: true,
        noise_suppression: true,
    };
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self::VOICE
    }
}

/// Something that can be stopped: media tracks, a recognizer session.
pub trait TrackHandle: Send {
    /// Release the underlying device or session. Must be idempotent.
    fn stop(&mut self);
}

/// An open microphone: chunk stream plus the handle that releases the device.
pub struct AudioCapture {
    pub(crate) chunks: ChunkStream,
    pub(crate) mime_type: String,
    pub(crate) tracks: Box<dyn TrackHandle>,
}

impl AudioCapture {
    /// Bundle a chunk stream with its MIME type and track handle.
    pub fn new(
        chunks: ChunkStream,
        mime_type: impl Into<String>,
        tracks: Box<dyn TrackHandle>,
    ) -> Self {
        Self {
            chunks,
            mime_type: mime_type.into(),
            tracks,
        }
    }

    /// MIME type of the encoded chunks (e.g. `audio/webm`).
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// A microphone source.
pub trait AudioInput: Send + Sync {
    /// Request access and start capturing.
    ///
    /// Fails with [`RecorderError::PermissionDenied`] or
    /// [`RecorderError::DeviceUnavailable`].
    fn open(
        &self,
        constraints: &CaptureConstraints,
    ) -> BoxFuture<'_, Result<AudioCapture, RecorderError>>;
}

/// Producer side of [`audio_channel`], held by the code that owns the device.
#[derive(Clone)]
pub struct AudioFeed {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    stopped: Arc<AtomicBool>,
}

impl AudioFeed {
    /// Deliver one encoded chunk. Returns `false` once the tracks were stopped.
    pub fn push(&self, chunk: Vec<u8>) -> bool {
        if self.is_stopped() {
            return false;
        }
        self.tx.send(chunk).is_ok()
    }

    /// Whether the recorder has stopped the tracks.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

struct ChannelTracks {
    stopped: Arc<AtomicBool>,
}

impl TrackHandle for ChannelTracks {
    fn stop(&mut self) {
        self.stopped.store(true, Ordering::Release);
    }
}

/// Create an [`AudioCapture`] fed from another task or thread.
///
/// Platform integrations (a device callback, a WebSocket from the browser)
/// push chunks into the returned [`AudioFeed`]; the stream ends when every
/// feed is dropped.
#[must_use]
pub fn audio_channel(mime_type: impl Into<String>) -> (AudioFeed, AudioCapture) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let stopped = Arc::new(AtomicBool::new(false));

    let feed = AudioFeed {
        tx,
        stopped: Arc::clone(&stopped),
    };
    let chunks = Box::pin(stream::poll_fn(move |cx| rx.poll_recv(cx)));
    let capture = AudioCapture::new(chunks, mime_type, Box::new(ChannelTracks { stopped }));

    (feed, capture)
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[test]
    fn test_voice_constraints() {
        let c = CaptureConstraints::default();
        assert_eq!(c.channel_count, 1);
        assert!(c.echo_cancellation);
        assert!(c.noise_suppression);
    }

    #[tokio::test]
    async fn test_audio_channel_delivers_and_stops() {
        let (feed, mut capture) = audio_channel("audio/webm");
        assert_eq!(capture.mime_type(), "audio/webm");

        assert!(feed.push(vec![1, 2]));
        assert_eq!(capture.chunks.next().await, Some(vec![1, 2]));

        capture.tracks.stop();
        assert!(feed.is_stopped());
        assert!(!feed.push(vec![3]));

        drop(feed);
        assert_eq!(capture.chunks.next().await, None);
    }
}
