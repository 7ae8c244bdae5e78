//! User intents sent by presentation shells

use serde::{Deserialize, Serialize};

/// Something the viewer asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    /// Click to move past the current welcome text
    Continue,

    /// Option `option` chosen on scene `scene`
    SelectOption { scene: usize, option: usize },

    /// Go straight to scene `scene`, prefetching it first
    JumpTo { scene: usize },
}

/// Why an intent had no effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// An animation is running
    Animating,
    /// A scene transition is running
    Transitioning,
    /// The presentation stopped after a load failure
    Halted,
    /// The current scene is not waiting for this intent
    NotExpected,
    /// The scene index does not exist
    UnknownScene,
}

/// Outcome of handing an intent to the director
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum IntentOutcome {
    Accepted,
    Ignored(IgnoreReason),
}

impl IntentOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, IntentOutcome::Accepted)
    }
}
