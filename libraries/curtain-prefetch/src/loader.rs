//! Asset loaders.
//!
//! A loader performs one retrieval attempt for one path. Timeouts and the
//! fatal/soft policy live in `Prefetcher`; loaders only report what happened.

use crate::error::LoadError;
use async_trait::async_trait;
use bytes::Bytes;
use curtain_core::AssetKind;
use futures_util::StreamExt;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;

/// Upper bound on the body buffer reserved from an advertised Content-Length
const MAX_PREALLOCATION: usize = 1 << 20;

/// One retrieval attempt for an asset.
///
/// Dropping the returned future must release everything the attempt holds,
/// which is how timeouts cancel a slow download.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetLoader: Send + Sync {
    /// Retrieve `path` until it is ready for use.
    ///
    /// For video assets "ready" means enough data to play through.
    async fn load(&self, path: &str, kind: AssetKind) -> Result<(), LoadError>;
}

/// Shared in-memory store of completely downloaded assets.
#[derive(Debug, Clone, Default)]
pub struct AssetCache {
    entries: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl AssetCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached body for `path`
    pub fn get(&self, path: &str) -> Option<Bytes> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// Whether `path` is cached
    pub fn contains(&self, path: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }

    /// Store a complete body
    pub fn insert(&self, path: impl Into<String>, body: Bytes) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), body);
    }

    /// Number of cached assets
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total cached bytes
    pub fn total_bytes(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Bytes::len)
            .sum()
    }
}

/// Loader that downloads assets over HTTP relative to a base URL.
///
/// A body only reaches the cache once it was received completely; partial
/// bodies are dropped with the attempt.
#[derive(Debug, Clone)]
pub struct HttpAssetLoader {
    http: Client,
    base_url: String,
    cache: AssetCache,
}

impl HttpAssetLoader {
    /// Create a loader for `base_url` with its own cache
    pub fn new(base_url: impl Into<String>) -> Result<Self, LoadError> {
        Self::with_timeouts(base_url, None)
    }

    /// Create a loader with an optional per-request timeout
    pub fn with_timeouts(
        base_url: impl Into<String>,
        request_timeout: Option<Duration>,
    ) -> Result<Self, LoadError> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("Curtain/{}", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: AssetCache::new(),
        })
    }

    /// Share an existing cache instead of the loader's own
    #[must_use]
    pub fn with_cache(mut self, cache: AssetCache) -> Self {
        self.cache = cache;
        self
    }

    /// The cache completed downloads are stored in
    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    /// Absolute URL for an asset path
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl AssetLoader for HttpAssetLoader {
    async fn load(&self, path: &str, kind: AssetKind) -> Result<(), LoadError> {
        if self.cache.contains(path) {
            debug!(asset = %path, "Asset already cached");
            return Ok(());
        }

        let url = self.url_for(path);
        debug!(url = %url, asset = %path, kind = ?kind, "Fetching asset");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status(status.as_u16()));
        }

        let advertised = response.content_length().unwrap_or(0);
        let mut body = Vec::with_capacity(
            usize::try_from(advertised).map_or(MAX_PREALLOCATION, |len| len.min(MAX_PREALLOCATION)),
        );
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| LoadError::Transport(e.to_string()))?;
            body.extend_from_slice(&chunk);
        }

        debug!(asset = %path, size = body.len(), "Asset downloaded");
        self.cache.insert(path, Bytes::from(body));
        Ok(())
    }
}
