/// Platform media abstraction
///
/// The engine never touches a concrete audio/video element. Presentation
/// shells implement these traits over whatever playback stack they own.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Process-unique identity of a media handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MediaId(u64);

static NEXT_MEDIA_ID: AtomicU64 = AtomicU64::new(1);

impl MediaId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        Self(NEXT_MEDIA_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "media#{}", self.0)
    }
}

/// What a media handle is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaRole {
    /// Main background music
    Bgm,
    /// Background music during questions
    QuestionBgm,
    /// Short click effect
    Click,
    /// Video played after a question is answered
    SceneVideo,
    /// Final video
    FinaleVideo,
    /// Final looping audio
    FinaleAudio,
}

/// Media handle errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    /// The media could not be decoded or loaded
    #[error("Media decode error: {0}")]
    Decode(String),

    /// Playback was refused (autoplay policy or similar)
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),

    /// Readiness was not reached in time
    #[error("Media not ready after {0:?}")]
    Timeout(Duration),
}

/// A playable audio or video object
///
/// Volumes are linear in [0, 1]. Implementations use interior mutability:
/// handles are shared between the director, the fade controller and the
/// presentation shell.
#[async_trait]
pub trait MediaHandle: Send + Sync + fmt::Debug {
    /// Identity used to key per-handle state such as active fades
    fn id(&self) -> MediaId;

    /// Source path the handle was opened with
    fn source(&self) -> &str;

    /// Current volume
    fn volume(&self) -> f32;

    /// Set the volume
    fn set_volume(&self, volume: f32);

    /// Playback rate, 1.0 is normal speed
    fn playback_rate(&self) -> f32 {
        1.0
    }

    /// Total duration, `None` until metadata is known
    fn duration(&self) -> Option<Duration>;

    /// Current playback position
    fn position(&self) -> Duration;

    /// Move the playback position
    fn seek(&self, position: Duration);

    /// Loop at the end instead of stopping
    fn set_looping(&self, looping: bool);

    /// Mute without touching the volume
    fn set_muted(&self, muted: bool);

    /// Pause playback
    fn pause(&self);

    /// Start or resume playback
    ///
    /// # Errors
    /// Returns `PlaybackRejected` when the platform refuses to play
    async fn play(&self) -> Result<(), MediaError>;

    /// Resolve once enough data is buffered to play through
    ///
    /// Returns immediately when already ready.
    ///
    /// # Errors
    /// Returns `Decode` when the media fails to load
    async fn wait_ready(&self) -> Result<(), MediaError>;

    /// Resolve when playback reaches the natural end
    async fn wait_ended(&self);
}

/// Opens media handles for the presentation shell's playback stack
pub trait MediaBackend: Send + Sync {
    /// Open `source` for the given role
    fn open(&self, source: &str, role: MediaRole) -> Arc<dyn MediaHandle>;
}

/// Shared media handle
pub type SharedMedia = Arc<dyn MediaHandle>;
