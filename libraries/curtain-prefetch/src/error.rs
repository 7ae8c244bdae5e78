//! Error types for asset prefetching.
//!
//! Every error here is `Clone`: scene outcomes are shared between all callers
//! awaiting the same memoized prefetch.

use std::time::Duration;
use thiserror::Error;

/// Failure reported by an `AssetLoader`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Server answered with a non-success status
    #[error("HTTP status {0}")]
    Status(u16),

    /// Connection or body stream failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Content could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => LoadError::Status(status.as_u16()),
            None => LoadError::Transport(err.to_string()),
        }
    }
}

/// Fatal failure of a single asset. Only essential (video) assets produce one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrefetchError {
    /// Readiness was not reached within the timeout
    #[error("Timed out after {after:?} waiting for {path}")]
    Timeout { path: String, after: Duration },

    /// The asset failed to load or decode
    #[error("Failed to load {path}: {reason}")]
    Decode { path: String, reason: String },
}

impl PrefetchError {
    /// Path of the failed asset
    pub fn path(&self) -> &str {
        match self {
            PrefetchError::Timeout { path, .. } | PrefetchError::Decode { path, .. } => path,
        }
    }
}

/// Failure of a whole scene prefetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScenePrefetchError {
    /// An essential asset of the scene failed
    #[error("Scene {scene} prefetch failed: {source}")]
    Asset {
        scene: usize,
        #[source]
        source: PrefetchError,
    },

    /// The scene index is not part of the presentation
    #[error("Scene {scene} does not exist (scene count {count})")]
    UnknownScene { scene: usize, count: usize },

    /// The prefetch task was cancelled or panicked
    #[error("Scene {scene} prefetch aborted: {reason}")]
    Aborted { scene: usize, reason: String },
}

impl ScenePrefetchError {
    /// Index of the scene that failed
    pub fn scene(&self) -> usize {
        match self {
            ScenePrefetchError::Asset { scene, .. }
            | ScenePrefetchError::UnknownScene { scene, .. }
            | ScenePrefetchError::Aborted { scene, .. } => *scene,
        }
    }
}

/// Result type for scene prefetch operations.
pub type Result<T> = std::result::Result<T, ScenePrefetchError>;
