//! Curtain Playback - Scene state machine and choreography
//!
//! Provides:
//! - `SceneDirector` driving welcome, question and finale scenes
//! - `Gate` input gating for animations and transitions
//! - `FadeController` wall-clock volume ramps, one per media handle
//! - `StageEvent` render callbacks and `Intent` user input for shells

pub mod director;
pub mod error;
pub mod events;
pub mod fade;
pub mod gate;
pub mod intent;
pub mod ramp;

pub use director::{video_fade_out_duration, SceneDirector, LOAD_FAILED_MESSAGE};
pub use error::{DirectorError, GateError, Result};
pub use events::{OptionView, StageEvent};
pub use fade::{FadeController, FADE_TICK};
pub use gate::{Focus, Gate, PresentationState};
pub use intent::{IgnoreReason, Intent, IntentOutcome};
pub use ramp::{clamp_volume, sanitize_rate, FadeProfile, VolumeRamp};
