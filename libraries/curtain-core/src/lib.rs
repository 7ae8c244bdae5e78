//! Curtain Core - Configuration model, asset resolution and media traits
//!
//! This crate holds everything the scene engine shares:
//! - The presentation configuration and its defaults
//! - Scene descriptors and per-scene resource planning
//! - Asset name resolution against the manifest
//! - The media handle abstraction implemented by presentation shells

pub mod config;
pub mod error;
pub mod kind;
pub mod manifest;
pub mod media;
pub mod plan;
pub mod scene;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{
    millis, AudioCues, BlackMask, EndSettings, FinaleSettings, PrefetchSettings,
    PresentationConfig, Timings,
};
pub use error::{CurtainError, Result};
pub use kind::AssetKind;
pub use manifest::{AssetManifest, AssetResolver, DEFAULT_ASSET_PREFIX};
pub use media::{MediaBackend, MediaError, MediaHandle, MediaId, MediaRole, SharedMedia};
pub use plan::{IconSource, ResolvedIcon, ScenePlan, UnresolvedReference};
pub use scene::{
    FinaleScene, QuestionScene, SceneDescriptor, SceneKind, WelcomeScene, WelcomeText,
    DEFAULT_FINALE_VIDEO,
};
