//! Scene descriptors
//!
//! One descriptor per scene, indexed contiguously from 0. Media references are
//! logical names resolved against the manifest when they are used.

use serde::{Deserialize, Serialize};

/// A single scene of the presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SceneDescriptor {
    /// Opening sequence of text cards
    Welcome(WelcomeScene),

    /// Question with selectable options followed by a video
    Question(QuestionScene),

    /// Final looping video with audio
    #[serde(alias = "finale")]
    Proposal(FinaleScene),
}

/// Kind of scene, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneKind {
    Welcome,
    Question,
    Finale,
}

/// Welcome scene payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeScene {
    /// Text cards shown one after another
    #[serde(default)]
    pub texts: Vec<WelcomeText>,

    /// Extra resources listed by older configurations
    #[serde(default)]
    pub resources: Vec<String>,
}

/// One welcome text card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeText {
    /// Text content
    pub content: String,

    /// Extra stay time before auto-advance, in milliseconds
    #[serde(default)]
    pub delay: u64,

    /// Wait for a click instead of advancing automatically
    #[serde(default = "default_wait_for_click")]
    pub wait_for_click: bool,
}

impl WelcomeText {
    /// Card that waits for a click
    pub fn click(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            delay: 0,
            wait_for_click: true,
        }
    }

    /// Card that advances on its own after `delay` extra milliseconds
    pub fn timed(content: impl Into<String>, delay: u64) -> Self {
        Self {
            content: content.into(),
            delay,
            wait_for_click: false,
        }
    }
}

fn default_wait_for_click() -> bool {
    true
}

/// Question scene payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionScene {
    /// Video played after an option is chosen
    pub video: String,

    /// Prompt text
    #[serde(default)]
    pub question: String,

    /// Background image
    #[serde(default)]
    pub bg: Option<String>,

    /// Option labels
    #[serde(default)]
    pub options: Vec<String>,

    /// Option icons, positionally matched to `options`
    #[serde(default, alias = "optionsfont")]
    pub option_icons: Vec<String>,
}

/// Finale scene payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinaleScene {
    /// Final video, `end.mp4` when absent
    #[serde(default)]
    pub video: Option<String>,
}

/// Video used by the finale when none is configured
pub const DEFAULT_FINALE_VIDEO: &str = "end.mp4";

impl SceneDescriptor {
    /// Scene kind
    pub fn kind(&self) -> SceneKind {
        match self {
            SceneDescriptor::Welcome(_) => SceneKind::Welcome,
            SceneDescriptor::Question(_) => SceneKind::Question,
            SceneDescriptor::Proposal(_) => SceneKind::Finale,
        }
    }

    /// Logical name of the scene video, if the scene plays one
    pub fn video(&self) -> Option<&str> {
        match self {
            SceneDescriptor::Welcome(_) => None,
            SceneDescriptor::Question(q) => Some(q.video.as_str()).filter(|v| !v.is_empty()),
            SceneDescriptor::Proposal(f) => {
                Some(f.video.as_deref().unwrap_or(DEFAULT_FINALE_VIDEO))
            }
        }
    }

    /// Logical name of the background image
    pub fn background(&self) -> Option<&str> {
        match self {
            SceneDescriptor::Question(q) => q.bg.as_deref().filter(|bg| !bg.is_empty()),
            _ => None,
        }
    }

    /// Explicit option icon names
    pub fn option_icons(&self) -> &[String] {
        match self {
            SceneDescriptor::Question(q) => &q.option_icons,
            _ => &[],
        }
    }

    /// Every media reference the scene makes
    pub fn media_references(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = Vec::new();
        refs.extend(self.video());
        refs.extend(self.background());
        refs.extend(
            self.option_icons()
                .iter()
                .map(String::as_str)
                .filter(|icon| !icon.is_empty()),
        );
        if let SceneDescriptor::Welcome(w) = self {
            refs.extend(w.resources.iter().map(String::as_str));
        }
        refs
    }

    /// Question payload, if this is a question scene
    pub fn as_question(&self) -> Option<&QuestionScene> {
        match self {
            SceneDescriptor::Question(q) => Some(q),
            _ => None,
        }
    }

    /// Welcome payload, if this is a welcome scene
    pub fn as_welcome(&self) -> Option<&WelcomeScene> {
        match self {
            SceneDescriptor::Welcome(w) => Some(w),
            _ => None,
        }
    }
}
