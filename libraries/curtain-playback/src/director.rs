//! Scene director
//!
//! Owns the presentation state and runs the choreography of every scene:
//! - Welcome texts revealed one by one, advanced by click or timer
//! - Question options, then the chosen answer's video with volume fades
//! - The finale video and looping audio, started together once both are ready
//! - Fade-to-black transitions between scenes
//!
//! Every scene is prefetched on demand before it renders. Flows run as Tokio
//! tasks on wall-clock timers; intents from the shell are checked against the
//! gate synchronously and never block.

use crate::error::{DirectorError, GateError, Result};
use crate::events::{OptionView, StageEvent};
use crate::fade::{FadeController, FADE_TICK};
use crate::gate::{Focus, Gate, PresentationState};
use crate::intent::{IgnoreReason, Intent, IntentOutcome};
use crate::ramp::{clamp_volume, sanitize_rate, FadeProfile};
use curtain_core::{
    millis, MediaBackend, MediaError, MediaRole, SceneDescriptor, ScenePlan, SharedMedia,
    DEFAULT_FINALE_VIDEO,
};
use curtain_prefetch::ScenePrefetcher;
use futures_util::future::{BoxFuture, FutureExt};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

/// Delay between mounting the transition overlay and starting its fade
const OVERLAY_MOUNT_DELAY: Duration = Duration::from_millis(100);

/// Extra time a reveal keeps input blocked after its fade
const REVEAL_SLACK: Duration = Duration::from_millis(100);

/// Lead added to the video fade-out so it starts before the fade would be cut
const VIDEO_FADE_MARGIN: Duration = Duration::from_millis(250);

/// Fade used when a video ends while still audible
const VIDEO_QUICK_FADE: Duration = Duration::from_millis(180);

/// Volume below which an ending video is silenced without a fade
const AUDIBLE_THRESHOLD: f32 = 0.02;

/// Poll interval while media metadata is unknown
const METADATA_POLL: Duration = Duration::from_millis(50);

/// Message shown when a scene cannot be loaded
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load resources, please refresh and retry";

/// Wall-clock time for `content` of media played at `rate`
fn wall_time(content: Duration, rate: f32) -> Duration {
    let rate = f64::from(sanitize_rate(rate));
    Duration::try_from_secs_f64(content.as_secs_f64() / rate).unwrap_or(Duration::MAX)
}

/// How long a timed welcome text stays before fading out
fn text_dwell(stay_ms: u64, delay_ms: u64) -> Duration {
    millis(stay_ms.saturating_add(delay_ms))
}

/// Length of the fade-out started `remaining` before a video ends
pub fn video_fade_out_duration(remaining: Duration, fade: Duration) -> Duration {
    remaining
        .saturating_sub(Duration::from_millis(40))
        .max(Duration::from_millis(80))
        .min(fade)
        .max(Duration::from_millis(150))
}

/// Resolve once `video` is within `lead` of its end, returning the remaining time
async fn fade_out_trigger(video: &SharedMedia, lead: Duration) -> Duration {
    loop {
        let wait = match video.duration() {
            Some(total) if !total.is_zero() => {
                let remaining = total.saturating_sub(video.position());
                if remaining <= lead {
                    return remaining;
                }
                wall_time(remaining - lead, video.playback_rate()).max(FADE_TICK)
            }
            _ => METADATA_POLL,
        };
        sleep(wait).await;
    }
}

#[derive(Default)]
struct CueHandles {
    bgm: Option<SharedMedia>,
    click: Option<SharedMedia>,
    question_bgm: Option<SharedMedia>,
    finale: Option<SharedMedia>,
}

impl CueHandles {
    fn open(plan: &ScenePlan, backend: &dyn MediaBackend) -> Self {
        let cues = &plan.config().audio;
        let open = |name: &Option<String>, role: MediaRole| {
            name.as_deref()
                .filter(|name| !name.is_empty())
                .map(|name| backend.open(&plan.resolver().resolve(name), role))
        };

        let bgm = open(&cues.bgm, MediaRole::Bgm);
        if let Some(bgm) = &bgm {
            bgm.set_looping(true);
            bgm.set_volume(0.0);
        }

        let click = open(&cues.click, MediaRole::Click);
        if let Some(click) = &click {
            click.set_volume(1.0);
        }

        let question_bgm = open(&cues.question_bgm, MediaRole::QuestionBgm);
        if let Some(question_bgm) = &question_bgm {
            question_bgm.set_looping(true);
            question_bgm.set_volume(0.0);
        }

        let finale = open(&cues.finale, MediaRole::FinaleAudio);
        if let Some(finale) = &finale {
            finale.set_looping(false);
            finale.set_volume(0.0);
        }

        Self {
            bgm,
            click,
            question_bgm,
            finale,
        }
    }
}

struct Inner {
    plan: ScenePlan,
    prefetcher: ScenePrefetcher,
    backend: Arc<dyn MediaBackend>,
    fades: FadeController,
    events: mpsc::UnboundedSender<StageEvent>,
    state: Mutex<PresentationState>,
    audio: CueHandles,
    /// Media owned by the visit on screen, stopped when another scene renders
    scene_media: Mutex<Vec<SharedMedia>>,
    visits: watch::Sender<u64>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, PresentationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: StageEvent) {
        debug!(event = event.event_type(), "Stage event");
        // The shell may have dropped its receiver; playback carries on.
        let _ = self.events.send(event);
    }

    /// Apply a gate transition to locked state, reporting input gate changes
    fn apply_gate<F>(&self, state: &mut PresentationState, op: F) -> std::result::Result<(), GateError>
    where
        F: FnOnce(&mut Gate) -> std::result::Result<(), GateError>,
    {
        let was_animating = state.gate.is_animating();
        let result = op(&mut state.gate);
        match result {
            Ok(()) => {}
            Err(GateError::Halted | GateError::AlreadyTransitioning) => {
                debug!(gate = ?state.gate, "Gate transition ignored");
            }
            Err(e) => warn!(error = %e, gate = ?state.gate, "Rejected gate transition"),
        }

        let animating = state.gate.is_animating();
        if animating != was_animating {
            self.emit(StageEvent::AnimatingChanged { animating });
        }
        result
    }

    fn begin_animation(&self) {
        let mut state = self.lock();
        self.apply_gate(&mut state, Gate::begin_animation).ok();
    }

    fn end_animation(&self) {
        let mut state = self.lock();
        self.apply_gate(&mut state, Gate::end_animation).ok();
    }

    fn end_animation_after(self: &Arc<Self>, delay: Duration) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            sleep(delay).await;
            this.end_animation();
        });
    }

    fn is_current(&self, visit: u64) -> bool {
        self.lock().visit == visit
    }

    /// Resolve once the presentation moved past `visit`
    async fn scene_left(&self, visit: u64) {
        let mut visits = self.visits.subscribe();
        if visits.wait_for(|current| *current != visit).await.is_err() {
            debug!(visit, "Visit watch closed");
        }
    }

    fn scene_media(&self) -> MutexGuard<'_, Vec<SharedMedia>> {
        self.scene_media.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach media to `visit`; false when that visit is already over
    fn adopt_scene_media(&self, visit: u64, media: &SharedMedia) -> bool {
        let state = self.lock();
        if state.visit != visit {
            return false;
        }
        self.scene_media().push(Arc::clone(media));
        true
    }

    /// Silence and pause everything the previous visit left playing
    fn release_scene_media(&self) {
        let released = std::mem::take(&mut *self.scene_media());
        for media in released {
            self.fades.snap(&media, 0.0);
            media.pause();
            debug!(media = %media.id(), source = %media.source(), "Stopped media of the previous scene");
        }
    }

    // ==========================================================================
    // Audio
    // ==========================================================================

    fn fade_media(&self, media: &SharedMedia, target: f32, duration: Duration, profile: FadeProfile) -> Duration {
        let effective = self.fades.fade(media, target, duration, profile);
        self.emit(StageEvent::MediaFade {
            media: media.id(),
            source: media.source().to_string(),
            target: clamp_volume(target),
            duration_ms: effective.as_millis() as u64,
        });
        effective
    }

    fn bgm_fade(&self) -> Duration {
        millis(self.plan.config().timings.bgm_fade)
    }

    async fn start_bgm(&self) {
        let Some(bgm) = &self.audio.bgm else {
            return;
        };
        self.fades.snap(bgm, 0.0);
        if let Err(e) = bgm.play().await {
            warn!(error = %e, "Background music refused to play");
        }
        self.fade_media(bgm, self.plan.config().audio.bgm_volume, self.bgm_fade(), FadeProfile::AUDIO);
    }

    /// Fade the main music out and pause it once silent
    fn fade_out_bgm(&self) {
        let Some(bgm) = self.audio.bgm.clone() else {
            return;
        };
        let effective = self.fade_media(&bgm, 0.0, self.bgm_fade(), FadeProfile::AUDIO);
        tokio::spawn(async move {
            sleep(effective + FADE_TICK).await;
            if bgm.volume() <= 0.0 {
                bgm.pause();
                debug!(media = %bgm.id(), "Background music paused");
            }
        });
    }

    /// Restart the click at full volume and fade it out over its remaining length
    async fn play_click(&self) {
        let Some(click) = &self.audio.click else {
            return;
        };
        self.fades.snap(click, 1.0);
        click.seek(Duration::ZERO);
        if let Err(e) = click.play().await {
            debug!(error = %e, "Click sound refused to play");
        }

        let fade = match click.duration() {
            Some(total) if !total.is_zero() => total.saturating_sub(click.position()),
            _ => self.bgm_fade(),
        };
        self.fade_media(click, 0.0, fade, FadeProfile::AUDIO);
    }

    async fn start_question_bgm(&self) {
        let Some(music) = &self.audio.question_bgm else {
            return;
        };
        music.seek(Duration::ZERO);
        if let Err(e) = music.play().await {
            debug!(error = %e, "Question music refused to play");
        }
        self.fade_media(
            music,
            self.plan.config().audio.question_bgm_volume,
            self.bgm_fade(),
            FadeProfile::AUDIO,
        );
    }

    fn fade_out_question_bgm(&self) {
        if let Some(music) = &self.audio.question_bgm {
            self.fade_media(music, 0.0, self.bgm_fade(), FadeProfile::AUDIO);
        }
    }

    // ==========================================================================
    // Scenes
    // ==========================================================================

    /// Prefetch on demand, then render; halts the presentation on failure
    async fn load_scene(self: &Arc<Self>, index: usize) -> Result<()> {
        match self.prefetcher.ensure_scene(index).await {
            Ok(()) => {
                self.render_scene(index);
                Ok(())
            }
            Err(e) => {
                error!(scene = index, error = %e, "Scene resources failed to load");
                {
                    let mut state = self.lock();
                    self.apply_gate(&mut state, |gate| {
                        gate.halt();
                        Ok(())
                    })
                    .ok();
                    state.focus = Focus::Failed;
                }
                self.emit(StageEvent::LoadFailed {
                    scene: index,
                    message: LOAD_FAILED_MESSAGE.to_string(),
                });
                Err(DirectorError::Prefetch(e))
            }
        }
    }

    fn render_scene(self: &Arc<Self>, index: usize) {
        let Some(scene) = self.plan.scene(index) else {
            warn!(scene = index, "No such scene");
            return;
        };

        let visit = {
            let mut state = self.lock();
            state.scene_index = index;
            state.visit += 1;
            state.visit
        };
        self.release_scene_media();
        self.visits.send_replace(visit);

        info!(scene = index, kind = ?scene.kind(), "Showing scene");
        self.emit(StageEvent::SceneReady {
            scene: index,
            kind: scene.kind(),
        });

        match scene {
            SceneDescriptor::Welcome(_) => {
                tokio::spawn(Arc::clone(self).show_welcome_text(index, 0, visit));
            }
            SceneDescriptor::Question(_) => self.enter_question(index),
            SceneDescriptor::Proposal(_) => self.enter_finale(index, visit),
        }
    }

    // ==========================================================================
    // Welcome
    // ==========================================================================

    fn welcome_text_count(&self, scene: usize) -> usize {
        self.plan
            .scene(scene)
            .and_then(SceneDescriptor::as_welcome)
            .map_or(0, |welcome| welcome.texts.len())
    }

    /// Show texts from `start` on until one waits for a click or none are left
    fn show_welcome_text(self: Arc<Self>, scene: usize, start: usize, visit: u64) -> BoxFuture<'static, ()> {
        async move {
            let Some(welcome) = self.plan.scene(scene).and_then(SceneDescriptor::as_welcome) else {
                return;
            };
            let texts = welcome.texts.clone();
            let timings = self.plan.config().timings.clone();

            let mut index = start;
            while let Some(text) = texts.get(index) {
                if !self.is_current(visit) {
                    return;
                }

                {
                    let mut state = self.lock();
                    self.apply_gate(&mut state, Gate::begin_animation).ok();
                    state.focus = Focus::WelcomeText {
                        index,
                        awaiting_click: false,
                    };
                }
                self.emit(StageEvent::WelcomeTextShown {
                    index,
                    content: text.content.clone(),
                    wait_for_click: text.wait_for_click,
                    fade_in_ms: timings.fade_in,
                });

                if text.wait_for_click {
                    sleep(millis(timings.fade_in) + REVEAL_SLACK).await;
                    let mut state = self.lock();
                    state.focus = Focus::WelcomeText {
                        index,
                        awaiting_click: true,
                    };
                    self.apply_gate(&mut state, Gate::end_animation).ok();
                    return;
                }

                sleep(text_dwell(timings.text_stay, text.delay)).await;
                self.emit(StageEvent::WelcomeTextHidden {
                    index,
                    fade_out_ms: timings.fade_out,
                });
                sleep(millis(timings.fade_out)).await;
                self.end_animation();
                index += 1;
            }

            self.transition_to_next_scene();
        }
        .boxed()
    }

    /// Finish the clicked text, then continue with the next one
    fn welcome_click(self: Arc<Self>, scene: usize, index: usize, visit: u64) -> BoxFuture<'static, ()> {
        async move {
            let fade_out = self.plan.config().timings.fade_out;
            let last = index + 1 >= self.welcome_text_count(scene);

            if last {
                self.play_click().await;
            }
            self.emit(StageEvent::WelcomeTextHidden {
                index,
                fade_out_ms: fade_out,
            });
            if index == 0 {
                self.start_bgm().await;
            } else if last {
                self.fade_out_bgm();
            }

            sleep(millis(fade_out)).await;
            self.end_animation();
            self.show_welcome_text(scene, index + 1, visit).await;
        }
        .boxed()
    }

    // ==========================================================================
    // Questions
    // ==========================================================================

    fn option_count(&self, scene: usize) -> usize {
        self.plan
            .scene(scene)
            .and_then(SceneDescriptor::as_question)
            .map_or(0, |question| question.options.len())
    }

    fn enter_question(self: &Arc<Self>, index: usize) {
        let Some(question) = self.plan.scene(index).and_then(SceneDescriptor::as_question) else {
            return;
        };
        let timings = &self.plan.config().timings;

        let options = question
            .options
            .iter()
            .enumerate()
            .map(|(k, label)| OptionView {
                label: label.clone(),
                icon: self.plan.resolve_option_icon(index, k).map(|icon| icon.path),
            })
            .collect();

        {
            let mut state = self.lock();
            self.apply_gate(&mut state, Gate::begin_animation).ok();
            state.focus = Focus::Question {
                scene: index,
                awaiting_choice: true,
            };
        }
        self.emit(StageEvent::QuestionShown {
            scene: index,
            question: question.question.clone(),
            options,
            background: self.plan.background(index),
            fade_in_ms: timings.question_fade_in,
        });
        self.end_animation_after(millis(timings.question_fade_in) + REVEAL_SLACK);

        self.fade_out_bgm();
        let this = Arc::clone(self);
        tokio::spawn(async move { this.start_question_bgm().await });
    }

    /// Fade the question out, then play the scene video
    fn choose_option(self: Arc<Self>, scene: usize, option: usize, visit: u64) -> BoxFuture<'static, ()> {
        async move {
            let timings = self.plan.config().timings.clone();
            let fade_out = millis(timings.question_fade_out);

            info!(scene, option, "Option chosen");
            self.emit(StageEvent::OptionChosen {
                scene,
                option,
                fade_out_ms: timings.question_fade_out,
            });
            sleep(fade_out).await;

            if self.audio.question_bgm.is_some() {
                self.fade_out_question_bgm();
            } else {
                self.fade_out_bgm();
            }

            let Some(source) = self.plan.video(scene) else {
                warn!(scene, "Question scene has no video");
                self.emit(StageEvent::QuestionHidden { scene });
                self.end_animation();
                self.transition_to_next_scene();
                return;
            };

            let video = self.backend.open(&source, MediaRole::SceneVideo);
            if !self.adopt_scene_media(visit, &video) {
                debug!(scene, "Scene changed before its video started");
                self.end_animation();
                return;
            }
            video.set_muted(false);
            video.seek(Duration::ZERO);
            self.fades.snap(&video, 0.0);
            self.lock().focus = Focus::QuestionVideo { scene };
            self.emit(StageEvent::VideoStarted {
                scene,
                media: video.id(),
                source,
            });

            if let Err(e) = video.play().await {
                warn!(scene, error = %e, "Question video refused to play");
            }
            self.fade_media(&video, 1.0, millis(timings.bgm_fade), FadeProfile::VIDEO);
            tokio::spawn(Arc::clone(&self).supervise_video(scene, visit, video));

            sleep(fade_out).await;
            self.emit(StageEvent::QuestionHidden { scene });
            self.end_animation();
        }
        .boxed()
    }

    /// Fade the video out once near its end, then move on when it ends
    ///
    /// The fade-out starts exactly once: either from the remaining-time
    /// trigger or, if the video ends first, as a quick fade.
    fn supervise_video(self: Arc<Self>, scene: usize, visit: u64, video: SharedMedia) -> BoxFuture<'static, ()> {
        async move {
            let fade = self.bgm_fade();

            let faded_before_end = tokio::select! {
                remaining = fade_out_trigger(&video, fade + VIDEO_FADE_MARGIN) => {
                    let duration = video_fade_out_duration(remaining, fade);
                    debug!(
                        scene,
                        remaining_ms = remaining.as_millis() as u64,
                        fade_ms = duration.as_millis() as u64,
                        "Fading out scene video"
                    );
                    self.fade_media(&video, 0.0, duration, FadeProfile::VIDEO);
                    true
                }
                () = video.wait_ended() => false,
                () = self.scene_left(visit) => {
                    debug!(scene, "Scene changed while its video played");
                    return;
                }
            };

            if faded_before_end {
                tokio::select! {
                    () = video.wait_ended() => {}
                    () = self.scene_left(visit) => {
                        debug!(scene, "Scene changed while its video faded out");
                        return;
                    }
                }
            } else if video.volume() > AUDIBLE_THRESHOLD {
                self.fade_media(&video, 0.0, VIDEO_QUICK_FADE, FadeProfile::VIDEO);
            } else {
                self.fades.snap(&video, 0.0);
            }

            if !self.is_current(visit) {
                debug!(scene, "Scene changed while its video played");
                return;
            }
            self.emit(StageEvent::VideoEnded { scene });
            self.transition_to_next_scene();
        }
        .boxed()
    }

    // ==========================================================================
    // Finale
    // ==========================================================================

    fn enter_finale(self: &Arc<Self>, index: usize, visit: u64) {
        self.fade_out_bgm();
        self.fade_out_question_bgm();

        let source = self
            .plan
            .video(index)
            .unwrap_or_else(|| self.plan.resolver().resolve(DEFAULT_FINALE_VIDEO));
        let video = self.backend.open(&source, MediaRole::FinaleVideo);
        self.adopt_scene_media(visit, &video);
        if let Some(audio) = &self.audio.finale {
            self.adopt_scene_media(visit, audio);
        }
        video.set_muted(true);
        video.set_looping(false);
        video.seek(Duration::ZERO);

        self.lock().focus = Focus::Finale;
        self.emit(StageEvent::FinaleStarted {
            scene: index,
            media: video.id(),
            source,
        });

        tokio::spawn(Arc::clone(self).start_finale_playback(visit, Arc::clone(&video)));
        tokio::spawn(Arc::clone(self).hold_last_frame(index, visit, video));
    }

    /// Wait for video and audio readiness, then start both together
    fn start_finale_playback(self: Arc<Self>, visit: u64, video: SharedMedia) -> BoxFuture<'static, ()> {
        async move {
            let settings = self.plan.config().finale.clone();
            let audio = self.audio.finale.clone();
            let video_timeout = millis(settings.video_ready_timeout_ms);
            let audio_timeout = millis(settings.audio_ready_timeout_ms);

            let video_ready = async {
                match timeout(video_timeout, video.wait_ready()).await {
                    Ok(result) => result,
                    Err(_) => Err(MediaError::Timeout(video_timeout)),
                }
            };
            let audio_ready = async {
                let Some(audio) = &audio else {
                    return;
                };
                match timeout(audio_timeout, audio.wait_ready()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(error = %e, "Finale audio failed to load, continuing"),
                    Err(_) => warn!(timeout = ?audio_timeout, "Finale audio not ready in time, continuing"),
                }
            };
            let (video_result, ()) = tokio::join!(video_ready, audio_ready);
            if !self.is_current(visit) {
                debug!("Finale left before its media was ready");
                return;
            }

            if let Err(e) = video_result {
                error!(error = %e, "Finale video not ready, starting what is available");
                if let Err(e) = video.play().await {
                    debug!(error = %e, "Finale video refused to play");
                }
                if let Some(audio) = &audio {
                    if let Err(e) = audio.play().await {
                        debug!(error = %e, "Finale audio refused to play");
                    }
                }
                return;
            }

            if let Some(audio) = &audio {
                audio.set_looping(true);
                audio.seek(Duration::ZERO);
            }
            let audio_play = async {
                match &audio {
                    Some(audio) => audio.play().await,
                    None => Ok(()),
                }
            };
            let (video_played, audio_played) = tokio::join!(video.play(), audio_play);
            if let Err(e) = video_played.and(audio_played) {
                warn!(error = %e, "Finale playback rejected, starting video only");
                if let Err(e) = video.play().await {
                    warn!(error = %e, "Finale video refused to play");
                }
            }

            if let Some(audio) = &audio {
                if audio.volume() <= 0.0 {
                    self.fade_media(
                        audio,
                        self.plan.config().end.volume,
                        self.bgm_fade(),
                        FadeProfile::AUDIO,
                    );
                }
            }
            info!("Finale playing");
        }
        .boxed()
    }

    /// Pause on the last frame instead of letting the video end
    fn hold_last_frame(self: Arc<Self>, scene: usize, visit: u64, video: SharedMedia) -> BoxFuture<'static, ()> {
        async move {
            let settings = self.plan.config().finale.clone();
            let threshold = millis(settings.hold_threshold_ms);
            let offset = millis(settings.hold_offset_ms);

            loop {
                if !self.is_current(visit) {
                    return;
                }

                let wait = match video.duration() {
                    Some(total) if !total.is_zero() => {
                        let remaining = total.saturating_sub(video.position());
                        if remaining <= threshold {
                            video.pause();
                            video.seek(total.saturating_sub(offset));
                            info!(scene, "Finale held on last frame");
                            self.emit(StageEvent::FinaleHeld { scene });
                            return;
                        }
                        wall_time(remaining - threshold, video.playback_rate()).max(FADE_TICK)
                    }
                    _ => METADATA_POLL,
                };
                sleep(wait).await;
            }
        }
        .boxed()
    }

    // ==========================================================================
    // Transitions
    // ==========================================================================

    /// Start a transition unless one is already running
    fn transition_to_next_scene(self: &Arc<Self>) -> bool {
        {
            let mut state = self.lock();
            if self.apply_gate(&mut state, Gate::begin_transition).is_err() {
                return false;
            }
        }
        tokio::spawn(Arc::clone(self).run_transition());
        true
    }

    fn run_transition(self: Arc<Self>) -> BoxFuture<'static, ()> {
        async move {
            let mask = self.plan.config().timings.black_mask.clone();

            self.emit(StageEvent::OverlayMounted);
            sleep(OVERLAY_MOUNT_DELAY).await;
            self.emit(StageEvent::OverlayFadingIn {
                duration_ms: mask.fade_in,
            });
            sleep(millis(mask.fade_in)).await;

            let next = {
                let mut state = self.lock();
                if state.scene_index + 1 < self.plan.scene_count() {
                    state.scene_index += 1;
                    state.focus = Focus::Loading;
                    Some(state.scene_index)
                } else {
                    None
                }
            };

            match next {
                Some(index) => {
                    if self.load_scene(index).await.is_err() {
                        self.emit(StageEvent::OverlayRemoved);
                        return;
                    }
                }
                None => warn!("Transition requested after the last scene"),
            }

            self.emit(StageEvent::OverlayFadingOut {
                duration_ms: mask.fade_out,
            });
            sleep(millis(mask.fade_out)).await;
            self.emit(StageEvent::OverlayRemoved);

            let mut state = self.lock();
            self.apply_gate(&mut state, Gate::end_transition).ok();
        }
        .boxed()
    }

    // ==========================================================================
    // Intents
    // ==========================================================================

    fn handle(self: &Arc<Self>, intent: Intent) -> IntentOutcome {
        let mut state = self.lock();

        let blocked = match state.gate {
            Gate::Idle => None,
            Gate::Animating { .. } => Some(IgnoreReason::Animating),
            Gate::Transitioning { .. } => Some(IgnoreReason::Transitioning),
            Gate::Halted => Some(IgnoreReason::Halted),
        };
        if let Some(reason) = blocked {
            debug!(?intent, ?reason, "Ignoring intent");
            return IntentOutcome::Ignored(reason);
        }

        match intent {
            Intent::Continue => {
                let Focus::WelcomeText {
                    index,
                    awaiting_click: true,
                } = state.focus
                else {
                    debug!(?intent, focus = ?state.focus, "Nothing to continue");
                    return IntentOutcome::Ignored(IgnoreReason::NotExpected);
                };

                state.focus = Focus::WelcomeText {
                    index,
                    awaiting_click: false,
                };
                self.apply_gate(&mut state, Gate::begin_animation).ok();
                let (scene, visit) = (state.scene_index, state.visit);
                drop(state);

                tokio::spawn(Arc::clone(self).welcome_click(scene, index, visit));
                IntentOutcome::Accepted
            }

            Intent::SelectOption { scene, option } => {
                let expected = matches!(
                    state.focus,
                    Focus::Question { scene: current, awaiting_choice: true } if current == scene
                );
                if !expected || option >= self.option_count(scene) {
                    debug!(?intent, focus = ?state.focus, "Option not selectable");
                    return IntentOutcome::Ignored(IgnoreReason::NotExpected);
                }

                state.focus = Focus::Question {
                    scene,
                    awaiting_choice: false,
                };
                self.apply_gate(&mut state, Gate::begin_animation).ok();
                let visit = state.visit;
                drop(state);

                tokio::spawn(Arc::clone(self).choose_option(scene, option, visit));
                IntentOutcome::Accepted
            }

            Intent::JumpTo { scene } => {
                let count = self.plan.scene_count();
                if scene >= count {
                    debug!(scene, count, "Jump target out of range");
                    return IntentOutcome::Ignored(IgnoreReason::UnknownScene);
                }

                state.scene_index = scene;
                state.focus = Focus::Loading;
                self.apply_gate(&mut state, Gate::begin_animation).ok();
                drop(state);

                info!(scene, "Jumping to scene");
                let this = Arc::clone(self);
                tokio::spawn(async move {
                    if this.load_scene(scene).await.is_ok() {
                        this.end_animation();
                    }
                });
                IntentOutcome::Accepted
            }
        }
    }
}

/// Drives the presentation from the first scene to the finale
///
/// Cheap to clone; clones control the same presentation. All methods must be
/// called inside a Tokio runtime.
#[derive(Clone)]
pub struct SceneDirector {
    inner: Arc<Inner>,
}

impl SceneDirector {
    /// Create a director and the stream of stage events it emits
    ///
    /// Audio cues are opened immediately, silent and paused.
    pub fn new(
        prefetcher: ScenePrefetcher,
        backend: Arc<dyn MediaBackend>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<StageEvent>)> {
        let plan = prefetcher.plan().clone();
        if plan.scene_count() == 0 {
            return Err(DirectorError::EmptyPresentation);
        }

        let (events, receiver) = mpsc::unbounded_channel();
        let (visits, _) = watch::channel(0);
        let audio = CueHandles::open(&plan, backend.as_ref());

        let inner = Inner {
            plan,
            prefetcher,
            backend,
            fades: FadeController::new(),
            events,
            state: Mutex::new(PresentationState::new()),
            audio,
            scene_media: Mutex::new(Vec::new()),
            visits,
        };

        Ok((
            Self {
                inner: Arc::new(inner),
            },
            receiver,
        ))
    }

    /// Prefetch the opening scene and show it
    ///
    /// A failed opening prefetch is logged and the scene shown anyway.
    pub fn start(&self) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.begin_animation();
            if let Err(e) = inner.prefetcher.ensure_scene(0).await {
                warn!(error = %e, "Opening scene prefetch failed, starting anyway");
            }
            inner.render_scene(0);
            inner.end_animation();
        })
    }

    /// Hand an intent from the shell to the state machine
    ///
    /// Returns immediately; accepted intents run their flows in the background.
    pub fn handle(&self, intent: Intent) -> IntentOutcome {
        self.inner.handle(intent)
    }

    /// Start the fade-to-black transition to the next scene
    ///
    /// Returns `false` without doing anything while a transition is running.
    pub fn transition_to_next_scene(&self) -> bool {
        self.inner.transition_to_next_scene()
    }

    /// Snapshot of the presentation state
    pub fn state(&self) -> PresentationState {
        self.inner.lock().clone()
    }

    pub fn scene_index(&self) -> usize {
        self.inner.lock().scene_index
    }

    pub fn is_animating(&self) -> bool {
        self.inner.lock().is_animating()
    }

    pub fn is_transitioning(&self) -> bool {
        self.inner.lock().is_transitioning()
    }

    /// The fade controller shared by all flows
    pub fn fades(&self) -> &FadeController {
        &self.inner.fades
    }

    /// The plan scenes are rendered from
    pub fn plan(&self) -> &ScenePlan {
        &self.inner.plan
    }
}

impl std::fmt::Debug for SceneDirector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneDirector")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
