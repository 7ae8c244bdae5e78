//! Asset manifest and name resolution
//!
//! The manifest is an ordered list of per-scene groups of logical filenames.
//! Group `i` lists what scene `i` needs before it can render. The resolver maps
//! a bare logical name to the prefixed path the media layer can retrieve.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Prefix applied to every asset path
pub const DEFAULT_ASSET_PREFIX: &str = "asset/";

/// Ordered per-scene groups of logical asset names
///
/// Groups are immutable once built. Empty names are dropped and duplicates
/// within a group are collapsed, keeping the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Vec<String>>", into = "Vec<Vec<String>>")]
pub struct AssetManifest {
    groups: Vec<Vec<String>>,
}

impl AssetManifest {
    /// Build a manifest from raw groups
    pub fn new<G, N>(groups: G) -> Self
    where
        G: IntoIterator<Item = N>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        let groups = groups
            .into_iter()
            .map(|group| {
                let mut seen = HashSet::new();
                group
                    .into_iter()
                    .map(Into::into)
                    .filter(|name: &String| !name.is_empty() && seen.insert(name.clone()))
                    .collect()
            })
            .collect();

        Self { groups }
    }

    /// All groups in scene order
    pub fn groups(&self) -> &[Vec<String>] {
        &self.groups
    }

    /// Group for a scene, empty when the manifest has no entry for it
    pub fn group(&self, scene_index: usize) -> &[String] {
        self.groups.get(scene_index).map_or(&[][..], Vec::as_slice)
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the manifest has no groups
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl From<Vec<Vec<String>>> for AssetManifest {
    fn from(groups: Vec<Vec<String>>) -> Self {
        Self::new(groups)
    }
}

impl From<AssetManifest> for Vec<Vec<String>> {
    fn from(manifest: AssetManifest) -> Self {
        manifest.groups
    }
}

/// Best-effort resolver from logical names to retrievable paths
///
/// Never fails: names missing from the manifest are returned with the
/// standard prefix applied.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    manifest: Arc<AssetManifest>,
    prefix: String,
}

impl AssetResolver {
    /// Create a resolver over a shared manifest
    pub fn new(manifest: Arc<AssetManifest>, prefix: impl Into<String>) -> Self {
        Self {
            manifest,
            prefix: prefix.into(),
        }
    }

    /// The manifest this resolver searches
    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    /// The prefix applied to resolved paths
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Apply the standard prefix unless the name already carries it
    pub fn prefixed(&self, name: &str) -> String {
        if name.starts_with(&self.prefix) {
            name.to_string()
        } else {
            format!("{}{}", self.prefix, name)
        }
    }

    /// Search the manifest groups in order for an exact or suffix match
    ///
    /// Returns the canonical prefixed path of the first matching entry.
    pub fn find(&self, name: &str) -> Option<String> {
        if name.is_empty() {
            return None;
        }

        self.manifest
            .groups()
            .iter()
            .flatten()
            .find(|entry| entry.as_str() == name || entry.ends_with(name))
            .map(|entry| self.prefixed(entry))
    }

    /// Resolve a logical name, falling back to the prefixed input
    ///
    /// An empty name resolves to an empty path.
    pub fn resolve(&self, name: &str) -> String {
        if name.is_empty() {
            return String::new();
        }
        self.find(name).unwrap_or_else(|| self.prefixed(name))
    }
}
