//! Per-scene resource planning
//!
//! Turns the configuration into the concrete, prefixed paths each scene needs:
//! the deduplicated prefetch set, the scene video and background, and the
//! option icons chosen by an explicit resolution chain.

use crate::config::PresentationConfig;
use crate::kind::AssetKind;
use crate::manifest::AssetResolver;
use crate::scene::SceneDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Which step of the icon chain produced a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconSource {
    /// Named in the scene's option icon list
    Explicit,
    /// Found by scanning the scene's manifest group
    Manifest,
    /// Guessed from the configured naming pattern
    Convention,
}

/// An option icon path and how it was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIcon {
    pub path: String,
    pub source: IconSource,
}

/// A scene media reference the manifest does not list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    pub scene: usize,
    pub name: String,
}

/// Read-only view of the configuration answering "what does scene N need"
#[derive(Debug, Clone)]
pub struct ScenePlan {
    config: Arc<PresentationConfig>,
    resolver: AssetResolver,
}

impl ScenePlan {
    /// Create a plan over a shared configuration
    pub fn new(config: Arc<PresentationConfig>) -> Self {
        let resolver = AssetResolver::new(
            Arc::new(config.assets.clone()),
            config.prefetch.asset_prefix.clone(),
        );
        Self { config, resolver }
    }

    /// The configuration
    pub fn config(&self) -> &PresentationConfig {
        &self.config
    }

    /// Shared handle to the configuration
    pub fn config_arc(&self) -> Arc<PresentationConfig> {
        Arc::clone(&self.config)
    }

    /// The asset resolver
    pub fn resolver(&self) -> &AssetResolver {
        &self.resolver
    }

    /// Number of scenes
    pub fn scene_count(&self) -> usize {
        self.config.scenes.len()
    }

    /// Scene descriptor by index
    pub fn scene(&self, index: usize) -> Option<&SceneDescriptor> {
        self.config.scenes.get(index)
    }

    /// Deduplicated resources to prefetch before `index` renders
    ///
    /// The manifest group comes first, then the background and option icons
    /// named directly by the scene. Empty for an unknown scene.
    pub fn resources_for_scene(&self, index: usize) -> Vec<String> {
        let Some(scene) = self.scene(index) else {
            return Vec::new();
        };

        let group = self.config.assets.group(index).iter().map(String::as_str);
        let extras = scene.background().into_iter().chain(
            scene
                .option_icons()
                .iter()
                .map(String::as_str)
                .filter(|icon| !icon.is_empty()),
        );

        let mut seen = HashSet::new();
        group
            .chain(extras)
            .map(|name| self.resolver.prefixed(name))
            .filter(|path| seen.insert(path.clone()))
            .collect()
    }

    /// Resolved path of the scene video
    pub fn video(&self, index: usize) -> Option<String> {
        self.scene(index)
            .and_then(SceneDescriptor::video)
            .map(|name| self.resolver.resolve(name))
    }

    /// Resolved path of the scene background
    pub fn background(&self, index: usize) -> Option<String> {
        self.scene(index)
            .and_then(SceneDescriptor::background)
            .map(|name| self.resolver.prefixed(name))
    }

    /// Resolve an option icon
    ///
    /// Tries, in order: the explicit icon list, a scan of the scene's manifest
    /// group for an image named `*_{option}`, then the configured naming
    /// pattern. Gives up with `None` when every step comes up empty.
    pub fn resolve_option_icon(&self, scene_index: usize, option_index: usize) -> Option<ResolvedIcon> {
        let scene = self.scene(scene_index)?.as_question()?;
        let ordinal = option_index + 1;

        if let Some(name) = scene.option_icons.get(option_index).filter(|n| !n.is_empty()) {
            return Some(ResolvedIcon {
                path: self.resolver.resolve(name),
                source: IconSource::Explicit,
            });
        }

        let suffix = format!("_{}", ordinal);
        let scanned = self.config.assets.group(scene_index).iter().find(|name| {
            AssetKind::classify(name) == AssetKind::Image
                && name
                    .rsplit_once('.')
                    .is_some_and(|(stem, _)| stem.ends_with(&suffix))
        });
        if let Some(name) = scanned {
            return Some(ResolvedIcon {
                path: self.resolver.prefixed(name),
                source: IconSource::Manifest,
            });
        }

        let pattern = self.config.prefetch.icon_pattern.as_deref()?;
        let guessed = pattern
            .replace("{scene}", &scene_index.to_string())
            .replace("{option}", &ordinal.to_string());
        Some(ResolvedIcon {
            path: self.resolver.resolve(&guessed),
            source: IconSource::Convention,
        })
    }

    /// Scene media references that do not appear in the manifest
    pub fn unresolved_references(&self) -> Vec<UnresolvedReference> {
        let resolver = &self.resolver;
        self.config
            .scenes
            .iter()
            .enumerate()
            .flat_map(move |(scene, descriptor)| {
                descriptor
                    .media_references()
                    .into_iter()
                    .filter(move |name| resolver.find(name).is_none())
                    .map(move |name| UnresolvedReference {
                        scene,
                        name: name.to_string(),
                    })
            })
            .collect()
    }
}
