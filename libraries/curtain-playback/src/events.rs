//! Stage Events
//!
//! Render callbacks for presentation shells. The director emits them on an
//! unbounded channel at every point where something must appear, disappear,
//! start playing or change volume:
//! - Gate changes (input blocked/unblocked)
//! - Scene readiness after prefetch
//! - Welcome text, question and video lifecycle
//! - Transition overlay phases
//! - Terminal load failure

use curtain_core::{MediaId, SceneKind};
use serde::{Deserialize, Serialize};

/// One option as the shell should render it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionView {
    /// Option label
    pub label: String,
    /// Resolved icon path, if any step of the icon chain found one
    pub icon: Option<String>,
}

/// Events emitted by the scene director
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StageEvent {
    /// Input was blocked or unblocked
    AnimatingChanged { animating: bool },

    /// Scene resources are ready and its content may be built
    SceneReady { scene: usize, kind: SceneKind },

    /// A welcome text starts fading in
    WelcomeTextShown {
        index: usize,
        content: String,
        wait_for_click: bool,
        fade_in_ms: u64,
    },

    /// A welcome text starts fading out
    WelcomeTextHidden { index: usize, fade_out_ms: u64 },

    /// Question UI starts fading in
    QuestionShown {
        scene: usize,
        question: String,
        options: Vec<OptionView>,
        background: Option<String>,
        fade_in_ms: u64,
    },

    /// An option was accepted; question UI and background start fading out
    OptionChosen {
        scene: usize,
        option: usize,
        fade_out_ms: u64,
    },

    /// Question UI faded out and can be removed
    QuestionHidden { scene: usize },

    /// A media handle starts a volume fade
    MediaFade {
        media: MediaId,
        source: String,
        target: f32,
        duration_ms: u64,
    },

    /// The video following a choice starts
    VideoStarted {
        scene: usize,
        media: MediaId,
        source: String,
    },

    /// That video reached its end
    VideoEnded { scene: usize },

    /// Finale video and audio are being prepared
    FinaleStarted {
        scene: usize,
        media: MediaId,
        source: String,
    },

    /// Finale video paused on its last frame
    FinaleHeld { scene: usize },

    /// Transition overlay inserted, fully transparent
    OverlayMounted,

    /// Overlay starts fading to opaque
    OverlayFadingIn { duration_ms: u64 },

    /// Overlay starts fading back to transparent
    OverlayFadingOut { duration_ms: u64 },

    /// Overlay removed
    OverlayRemoved,

    /// A scene could not be loaded; the presentation is stopped
    LoadFailed { scene: usize, message: String },
}

impl StageEvent {
    /// Get event type name for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            StageEvent::AnimatingChanged { .. } => "animating_changed",
            StageEvent::SceneReady { .. } => "scene_ready",
            StageEvent::WelcomeTextShown { .. } => "welcome_text_shown",
            StageEvent::WelcomeTextHidden { .. } => "welcome_text_hidden",
            StageEvent::QuestionShown { .. } => "question_shown",
            StageEvent::OptionChosen { .. } => "option_chosen",
            StageEvent::QuestionHidden { .. } => "question_hidden",
            StageEvent::MediaFade { .. } => "media_fade",
            StageEvent::VideoStarted { .. } => "video_started",
            StageEvent::VideoEnded { .. } => "video_ended",
            StageEvent::FinaleStarted { .. } => "finale_started",
            StageEvent::FinaleHeld { .. } => "finale_held",
            StageEvent::OverlayMounted => "overlay_mounted",
            StageEvent::OverlayFadingIn { .. } => "overlay_fading_in",
            StageEvent::OverlayFadingOut { .. } => "overlay_fading_out",
            StageEvent::OverlayRemoved => "overlay_removed",
            StageEvent::LoadFailed { .. } => "load_failed",
        }
    }
}
