//! Single-asset prefetch with per-kind failure policy.

use crate::error::PrefetchError;
use crate::loader::AssetLoader;
use curtain_core::{AssetKind, PrefetchSettings};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Default readiness timeout for video assets
pub const DEFAULT_VIDEO_TIMEOUT: Duration = Duration::from_secs(30);

/// Default deadline for image and other assets
pub const DEFAULT_SOFT_TIMEOUT: Duration = Duration::from_secs(30);

/// Warms one asset at a time.
///
/// Video assets are essential: a load error or exceeding the timeout is
/// reported as a `PrefetchError`. Image and other assets are best effort and
/// always succeed: their failures are only logged, and a load still running
/// after the soft deadline is dropped.
#[derive(Clone)]
pub struct Prefetcher {
    loader: Arc<dyn AssetLoader>,
    video_timeout: Duration,
    soft_timeout: Duration,
}

impl Prefetcher {
    /// Create a prefetcher with the default video timeout
    pub fn new(loader: Arc<dyn AssetLoader>) -> Self {
        Self {
            loader,
            video_timeout: DEFAULT_VIDEO_TIMEOUT,
            soft_timeout: DEFAULT_SOFT_TIMEOUT,
        }
    }

    /// Create a prefetcher from configured settings
    pub fn from_settings(loader: Arc<dyn AssetLoader>, settings: &PrefetchSettings) -> Self {
        Self::new(loader)
            .with_video_timeout(Duration::from_millis(settings.video_timeout_ms))
            .with_soft_timeout(Duration::from_millis(settings.soft_timeout_ms))
    }

    /// Override the video readiness timeout
    #[must_use]
    pub fn with_video_timeout(mut self, timeout: Duration) -> Self {
        self.video_timeout = timeout;
        self
    }

    /// Override the image and other asset deadline
    #[must_use]
    pub fn with_soft_timeout(mut self, timeout: Duration) -> Self {
        self.soft_timeout = timeout;
        self
    }

    /// The video readiness timeout
    pub fn video_timeout(&self) -> Duration {
        self.video_timeout
    }

    /// The image and other asset deadline
    pub fn soft_timeout(&self) -> Duration {
        self.soft_timeout
    }

    /// Prefetch a single asset.
    ///
    /// When the timeout fires the load future is dropped, which releases the
    /// attempt and discards anything partially received.
    pub async fn prefetch_asset(&self, path: &str) -> Result<(), PrefetchError> {
        let kind = AssetKind::classify(path);
        debug!(asset = %path, kind = ?kind, "Prefetching asset");

        match kind {
            AssetKind::Video => {
                match tokio::time::timeout(self.video_timeout, self.loader.load(path, kind)).await {
                    Ok(Ok(())) => {
                        debug!(asset = %path, "Video ready to play through");
                        Ok(())
                    }
                    Ok(Err(e)) => {
                        error!(asset = %path, error = %e, "Video prefetch failed");
                        Err(PrefetchError::Decode {
                            path: path.to_string(),
                            reason: e.to_string(),
                        })
                    }
                    Err(_) => {
                        error!(asset = %path, timeout = ?self.video_timeout, "Video prefetch timed out");
                        Err(PrefetchError::Timeout {
                            path: path.to_string(),
                            after: self.video_timeout,
                        })
                    }
                }
            }
            AssetKind::Image | AssetKind::Other => {
                match tokio::time::timeout(self.soft_timeout, self.loader.load(path, kind)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        warn!(asset = %path, kind = ?kind, error = %e, "Asset prefetch failed, continuing without it");
                    }
                    Err(_) => {
                        warn!(asset = %path, kind = ?kind, timeout = ?self.soft_timeout, "Asset prefetch timed out, continuing without it");
                    }
                }
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for Prefetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prefetcher")
            .field("video_timeout", &self.video_timeout)
            .field("soft_timeout", &self.soft_timeout)
            .finish_non_exhaustive()
    }
}
