//! Curtain Prefetch - Warming scene media before it is needed
//!
//! Provides:
//! - `AssetLoader` with an HTTP implementation and shared cache
//! - `Prefetcher` applying the per-kind failure policy to one asset
//! - `ScenePrefetcher` holding memoized per-scene records, the eager
//!   background sequence and the on-demand retry path

pub mod error;
pub mod loader;
pub mod prefetcher;
pub mod sequencer;

pub use error::{LoadError, PrefetchError, Result, ScenePrefetchError};
pub use loader::{AssetCache, AssetLoader, HttpAssetLoader};
pub use prefetcher::{Prefetcher, DEFAULT_VIDEO_TIMEOUT};
pub use sequencer::{PrefetchStatus, SceneFuture, ScenePrefetcher, SequenceReport};
