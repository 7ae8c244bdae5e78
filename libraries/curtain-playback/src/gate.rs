//! Input gate and presentation state
//!
//! The gate replaces free-standing "animating" and "transitioning" flags with
//! one state machine. Animations nest: each `begin_animation` needs a matching
//! `end_animation`, and the gate only reopens once every animation and the
//! transition around them have finished.

use crate::error::GateError;
use serde::{Deserialize, Serialize};

/// Input gate state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Gate {
    /// Accepting intents
    #[default]
    Idle,

    /// `depth` visual animations are running
    Animating { depth: u32 },

    /// A scene transition is running, with `depth` nested animations
    Transitioning { depth: u32 },

    /// A scene failed to load; nothing is accepted any more
    Halted,
}

impl Gate {
    /// Whether input is currently blocked by an animation, transition or halt
    pub fn is_animating(&self) -> bool {
        !matches!(self, Gate::Idle)
    }

    /// Whether a scene transition is in progress
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Gate::Transitioning { .. })
    }

    /// Whether the presentation stopped after a load failure
    pub fn is_halted(&self) -> bool {
        matches!(self, Gate::Halted)
    }

    /// Start a visual animation
    pub fn begin_animation(&mut self) -> Result<(), GateError> {
        *self = match *self {
            Gate::Idle => Gate::Animating { depth: 1 },
            Gate::Animating { depth } => Gate::Animating { depth: depth + 1 },
            Gate::Transitioning { depth } => Gate::Transitioning { depth: depth + 1 },
            Gate::Halted => return Err(GateError::Halted),
        };
        Ok(())
    }

    /// Finish the innermost animation
    pub fn end_animation(&mut self) -> Result<(), GateError> {
        *self = match *self {
            Gate::Animating { depth: 1 } => Gate::Idle,
            Gate::Animating { depth } => Gate::Animating { depth: depth - 1 },
            Gate::Transitioning { depth } if depth > 0 => Gate::Transitioning { depth: depth - 1 },
            Gate::Idle | Gate::Transitioning { .. } => return Err(GateError::NoActiveAnimation),
            Gate::Halted => return Err(GateError::Halted),
        };
        Ok(())
    }

    /// Start a scene transition; running animations carry over into it
    pub fn begin_transition(&mut self) -> Result<(), GateError> {
        *self = match *self {
            Gate::Idle => Gate::Transitioning { depth: 0 },
            Gate::Animating { depth } => Gate::Transitioning { depth },
            Gate::Transitioning { .. } => return Err(GateError::AlreadyTransitioning),
            Gate::Halted => return Err(GateError::Halted),
        };
        Ok(())
    }

    /// Finish the transition; animations still running keep the gate closed
    pub fn end_transition(&mut self) -> Result<(), GateError> {
        *self = match *self {
            Gate::Transitioning { depth: 0 } => Gate::Idle,
            Gate::Transitioning { depth } => Gate::Animating { depth },
            Gate::Idle | Gate::Animating { .. } => return Err(GateError::NotTransitioning),
            Gate::Halted => return Err(GateError::Halted),
        };
        Ok(())
    }

    /// Stop accepting anything, permanently
    pub fn halt(&mut self) {
        *self = Gate::Halted;
    }
}

/// What the presentation is currently showing or waiting for
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "focus", rename_all = "snake_case")]
pub enum Focus {
    /// A scene is being prefetched
    #[default]
    Loading,

    /// A welcome text is on screen
    WelcomeText { index: usize, awaiting_click: bool },

    /// Question options are on screen
    Question { scene: usize, awaiting_choice: bool },

    /// The video following a choice is playing
    QuestionVideo { scene: usize },

    /// The finale is playing
    Finale,

    /// A scene failed to load
    Failed,
}

/// Presentation state owned by the scene director
///
/// Shells read snapshots of it and never write it; they send intents instead.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PresentationState {
    pub scene_index: usize,
    pub gate: Gate,
    pub focus: Focus,
    #[serde(skip)]
    pub(crate) visit: u64,
}

impl PresentationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Input is blocked
    pub fn is_animating(&self) -> bool {
        self.gate.is_animating()
    }

    /// A scene transition is in progress
    pub fn is_transitioning(&self) -> bool {
        self.gate.is_transitioning()
    }
}
