//! Error types for scene playback

use curtain_prefetch::ScenePrefetchError;
use thiserror::Error;

/// Rejected gate transitions
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    #[error("A scene transition is already in progress")]
    AlreadyTransitioning,

    #[error("No scene transition is in progress")]
    NotTransitioning,

    #[error("No animation is running")]
    NoActiveAnimation,

    #[error("Presentation halted after a load failure")]
    Halted,
}

/// Scene director errors
#[derive(Error, Debug, Clone)]
pub enum DirectorError {
    /// The presentation has no scenes
    #[error("Presentation has no scenes")]
    EmptyPresentation,

    /// A scene could not be prefetched before rendering
    #[error(transparent)]
    Prefetch(#[from] ScenePrefetchError),

    /// The input gate refused a transition
    #[error(transparent)]
    Gate(#[from] GateError),
}

/// Result type for scene director operations
pub type Result<T> = std::result::Result<T, DirectorError>;
