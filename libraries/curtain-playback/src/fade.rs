//! Fade controller
//!
//! Runs at most one volume ramp per media handle. Active ramps live in a map
//! keyed by `MediaId`, owned here rather than by the handles. Each ramp carries
//! a generation number and only writes a volume while its generation is the
//! one registered for its handle, so a replaced ramp never writes again.

use crate::ramp::{clamp_volume, FadeProfile, VolumeRamp};
use curtain_core::{MediaId, SharedMedia};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// Interval between ramp steps, roughly one display frame
pub const FADE_TICK: Duration = Duration::from_millis(16);

struct ActiveRamp {
    generation: u64,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct FadeState {
    ramps: Mutex<HashMap<MediaId, ActiveRamp>>,
    next_generation: AtomicU64,
}

impl FadeState {
    fn ramps(&self) -> MutexGuard<'_, HashMap<MediaId, ActiveRamp>> {
        self.ramps.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Wall-clock volume fades with replace-on-start semantics
///
/// Cheap to clone; clones share the ramp map. Must be used inside a Tokio
/// runtime.
#[derive(Clone, Default)]
pub struct FadeController {
    state: Arc<FadeState>,
}

impl FadeController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ramp `media` from its current volume to `target`
    ///
    /// Replaces any ramp already running on the handle. Returns the effective
    /// wall-clock duration, after rate compensation and the profile's floor,
    /// so callers can schedule follow-up work with a matching timer.
    pub fn fade(
        &self,
        media: &SharedMedia,
        target: f32,
        duration: Duration,
        profile: FadeProfile,
    ) -> Duration {
        let effective = profile.effective_duration(duration, media.playback_rate());
        let ramp = VolumeRamp::new(clamp_volume(media.volume()), target, effective);
        let id = media.id();

        let mut ramps = self.state.ramps();
        let generation = self.state.next_generation.fetch_add(1, Ordering::Relaxed);
        if let Some(previous) = ramps.remove(&id) {
            previous.task.abort();
            debug!(media = %id, "Replacing active fade");
        }

        debug!(
            media = %id,
            from = ramp.start_volume(),
            to = ramp.target_volume(),
            duration_ms = effective.as_millis() as u64,
            "Starting fade"
        );

        let task = tokio::spawn(run_ramp(
            Arc::clone(&self.state),
            Arc::clone(media),
            ramp,
            generation,
        ));
        ramps.insert(id, ActiveRamp { generation, task });

        effective
    }

    /// Set the volume immediately, replacing any active ramp
    pub fn snap(&self, media: &SharedMedia, volume: f32) {
        let mut ramps = self.state.ramps();
        if let Some(previous) = ramps.remove(&media.id()) {
            previous.task.abort();
        }
        media.set_volume(clamp_volume(volume));
    }

    /// Whether a ramp is running on the handle
    pub fn is_fading(&self, id: MediaId) -> bool {
        self.state.ramps().contains_key(&id)
    }

    /// Number of handles with a running ramp
    pub fn active_fades(&self) -> usize {
        self.state.ramps().len()
    }
}

impl std::fmt::Debug for FadeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FadeController")
            .field("active_fades", &self.active_fades())
            .finish()
    }
}

async fn run_ramp(state: Arc<FadeState>, media: SharedMedia, ramp: VolumeRamp, generation: u64) {
    let id = media.id();
    let started = Instant::now();
    let mut ticker = tokio::time::interval(FADE_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let elapsed = started.elapsed();

        let mut ramps = state.ramps();
        match ramps.get(&id) {
            Some(active) if active.generation == generation => {}
            _ => {
                trace!(media = %id, generation, "Superseded fade stopped");
                return;
            }
        }

        media.set_volume(ramp.sample(elapsed));
        if ramp.is_complete(elapsed) {
            ramps.remove(&id);
            trace!(media = %id, "Fade complete");
            return;
        }
    }
}
