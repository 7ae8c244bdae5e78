//! Simulated media handles
//!
//! Position advances with the Tokio clock while playing, scaled by the
//! playback rate. Readiness, load failure and play rejection are configured
//! per source through `MediaProfile`.

use crate::media::{MediaBackend, MediaError, MediaHandle, MediaId, MediaRole};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Polling step used while waiting for playback to start or metadata to appear
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Behaviour of a simulated media source
#[derive(Debug, Clone)]
pub struct MediaProfile {
    /// Total duration, `None` for unknown
    pub duration: Option<Duration>,

    /// Time after creation when the media can play through, `None` for never
    pub ready_after: Option<Duration>,

    /// Fail readiness with a decode error instead
    pub load_error: Option<String>,

    /// Refuse every `play` call
    pub reject_play: bool,

    /// Playback rate
    pub playback_rate: f32,
}

impl Default for MediaProfile {
    fn default() -> Self {
        Self {
            duration: Some(Duration::from_secs(10)),
            ready_after: Some(Duration::ZERO),
            load_error: None,
            reject_play: false,
            playback_rate: 1.0,
        }
    }
}

impl MediaProfile {
    /// Profile with the given duration, otherwise default
    pub fn with_duration(duration: Duration) -> Self {
        Self {
            duration: Some(duration),
            ..Self::default()
        }
    }

    /// Profile that never becomes ready
    pub fn never_ready() -> Self {
        Self {
            ready_after: None,
            ..Self::default()
        }
    }

    /// Profile that fails to load
    pub fn broken(reason: impl Into<String>) -> Self {
        Self {
            load_error: Some(reason.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug)]
struct SimState {
    volume: f32,
    muted: bool,
    looping: bool,
    playback_rate: f32,
    playing_since: Option<Instant>,
    offset: Duration,
    volume_history: Vec<f32>,
    play_calls: usize,
    pause_calls: usize,
    seeks: Vec<Duration>,
}

/// Media handle whose playback is simulated on the Tokio clock
#[derive(Debug)]
pub struct SimulatedMedia {
    id: MediaId,
    source: String,
    role: MediaRole,
    created: Instant,
    profile: MediaProfile,
    state: Mutex<SimState>,
}

impl SimulatedMedia {
    /// Create a handle for `source`
    pub fn new(source: impl Into<String>, role: MediaRole, profile: MediaProfile) -> Self {
        let state = SimState {
            volume: 1.0,
            muted: false,
            looping: false,
            playback_rate: profile.playback_rate,
            playing_since: None,
            offset: Duration::ZERO,
            volume_history: Vec::new(),
            play_calls: 0,
            pause_calls: 0,
            seeks: Vec::new(),
        };

        Self {
            id: MediaId::next(),
            source: source.into(),
            role,
            created: Instant::now(),
            profile,
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn position_locked(&self, state: &SimState) -> Duration {
        let played = state.playing_since.map_or(Duration::ZERO, |since| {
            since.elapsed().mul_f32(state.playback_rate.max(0.0))
        });
        let position = state.offset + played;
        match self.profile.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    /// Role the handle was opened for
    pub fn role(&self) -> MediaRole {
        self.role
    }

    /// Whether playback is running
    pub fn is_playing(&self) -> bool {
        self.state().playing_since.is_some()
    }

    /// Whether the handle is muted
    pub fn is_muted(&self) -> bool {
        self.state().muted
    }

    /// Whether the handle loops
    pub fn is_looping(&self) -> bool {
        self.state().looping
    }

    /// Every volume ever set, in order
    pub fn volume_history(&self) -> Vec<f32> {
        self.state().volume_history.clone()
    }

    /// Number of `play` calls
    pub fn play_calls(&self) -> usize {
        self.state().play_calls
    }

    /// Number of `pause` calls
    pub fn pause_calls(&self) -> usize {
        self.state().pause_calls
    }

    /// Every seek target, in order
    pub fn seeks(&self) -> Vec<Duration> {
        self.state().seeks.clone()
    }

    /// Change the playback rate
    pub fn set_playback_rate(&self, rate: f32) {
        let mut state = self.state();
        let position = self.position_locked(&state);
        state.offset = position;
        if state.playing_since.is_some() {
            state.playing_since = Some(Instant::now());
        }
        state.playback_rate = rate;
    }
}

#[async_trait]
impl MediaHandle for SimulatedMedia {
    fn id(&self) -> MediaId {
        self.id
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn volume(&self) -> f32 {
        self.state().volume
    }

    fn set_volume(&self, volume: f32) {
        let mut state = self.state();
        state.volume = volume;
        state.volume_history.push(volume);
    }

    fn playback_rate(&self) -> f32 {
        self.state().playback_rate
    }

    fn duration(&self) -> Option<Duration> {
        self.profile.duration
    }

    fn position(&self) -> Duration {
        let state = self.state();
        self.position_locked(&state)
    }

    fn seek(&self, position: Duration) {
        let mut state = self.state();
        let position = match self.profile.duration {
            Some(duration) => position.min(duration),
            None => position,
        };
        state.offset = position;
        state.seeks.push(position);
        if state.playing_since.is_some() {
            state.playing_since = Some(Instant::now());
        }
    }

    fn set_looping(&self, looping: bool) {
        self.state().looping = looping;
    }

    fn set_muted(&self, muted: bool) {
        self.state().muted = muted;
    }

    fn pause(&self) {
        let mut state = self.state();
        state.pause_calls += 1;
        let position = self.position_locked(&state);
        state.offset = position;
        state.playing_since = None;
    }

    async fn play(&self) -> Result<(), MediaError> {
        let mut state = self.state();
        state.play_calls += 1;
        if self.profile.reject_play {
            return Err(MediaError::PlaybackRejected(format!(
                "{} refused to play",
                self.source
            )));
        }
        if state.playing_since.is_none() {
            state.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    async fn wait_ready(&self) -> Result<(), MediaError> {
        let Some(ready_after) = self.profile.ready_after else {
            std::future::pending::<()>().await;
            return Ok(());
        };
        tokio::time::sleep_until(self.created + ready_after).await;

        match &self.profile.load_error {
            Some(reason) => Err(MediaError::Decode(reason.clone())),
            None => Ok(()),
        }
    }

    async fn wait_ended(&self) {
        loop {
            let wait = {
                let state = self.state();
                match (self.profile.duration, state.playing_since) {
                    (Some(duration), Some(_)) => {
                        let remaining = duration.saturating_sub(self.position_locked(&state));
                        if remaining.is_zero() {
                            return;
                        }
                        let rate = state.playback_rate.max(0.0001);
                        remaining.div_f32(rate).max(Duration::from_millis(1))
                    }
                    _ => POLL_INTERVAL,
                }
            };
            tokio::time::sleep(wait).await;
        }
    }
}

/// Backend handing out `SimulatedMedia`
#[derive(Debug, Default)]
pub struct SimulatedBackend {
    profiles: Mutex<HashMap<String, MediaProfile>>,
    default_profile: MediaProfile,
    opened: Mutex<Vec<Arc<SimulatedMedia>>>,
}

impl SimulatedBackend {
    /// Backend where every source uses `MediaProfile::default()`
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with a different fallback profile
    pub fn with_default_profile(profile: MediaProfile) -> Self {
        Self {
            default_profile: profile,
            ..Self::default()
        }
    }

    /// Configure the profile for a source path
    pub fn set_profile(&self, source: impl Into<String>, profile: MediaProfile) {
        self.profiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(source.into(), profile);
    }

    /// All handles opened so far
    pub fn opened(&self) -> Vec<Arc<SimulatedMedia>> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent handle opened for `source`
    pub fn last_opened(&self, source: &str) -> Option<Arc<SimulatedMedia>> {
        self.opened()
            .into_iter()
            .rev()
            .find(|media| media.source() == source)
    }

    /// Most recent handle opened for `role`
    pub fn last_with_role(&self, role: MediaRole) -> Option<Arc<SimulatedMedia>> {
        self.opened()
            .into_iter()
            .rev()
            .find(|media| media.role() == role)
    }
}

impl MediaBackend for SimulatedBackend {
    fn open(&self, source: &str, role: MediaRole) -> Arc<dyn MediaHandle> {
        let profile = self
            .profiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source)
            .cloned()
            .unwrap_or_else(|| self.default_profile.clone());

        let media = Arc::new(SimulatedMedia::new(source, role, profile));
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&media));
        media
    }
}
