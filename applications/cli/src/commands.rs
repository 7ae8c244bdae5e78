//! Subcommand implementations
//!
//! Each command builds a plain report so the binary only decides how to print
//! it and which exit status to use.

use crate::settings::CliSettings;
use curtain_core::{ResolvedIcon, SceneKind, ScenePlan, UnresolvedReference};
use curtain_prefetch::{HttpAssetLoader, Prefetcher, ScenePrefetcher, SequenceReport};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Referential integrity of a presentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub scenes: usize,
    pub groups: usize,
    pub unresolved: Vec<UnresolvedReference>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// List every scene media reference the manifest does not contain
pub fn check(plan: &ScenePlan) -> CheckReport {
    CheckReport {
        scenes: plan.scene_count(),
        groups: plan.config().assets.len(),
        unresolved: plan.unresolved_references(),
    }
}

/// One option and the icon it would be shown with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionIcon {
    pub option: String,
    pub icon: Option<ResolvedIcon>,
}

/// What a scene needs and shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneSummary {
    pub scene: usize,
    pub kind: SceneKind,
    pub resources: Vec<String>,
    pub video: Option<String>,
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub icons: Vec<OptionIcon>,
}

/// Summarize every scene of the plan in order
pub fn summarize(plan: &ScenePlan) -> Vec<SceneSummary> {
    (0..plan.scene_count())
        .filter_map(|index| {
            let scene = plan.scene(index)?;
            let icons = scene
                .as_question()
                .map(|question| {
                    question
                        .options
                        .iter()
                        .enumerate()
                        .map(|(option, label)| OptionIcon {
                            option: label.clone(),
                            icon: plan.resolve_option_icon(index, option),
                        })
                        .collect()
                })
                .unwrap_or_default();

            Some(SceneSummary {
                scene: index,
                kind: scene.kind(),
                resources: plan.resources_for_scene(index),
                video: plan.video(index),
                background: plan.background(index),
                icons,
            })
        })
        .collect()
}

/// Outcome of an eager prefetch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchOutcome {
    pub report: SequenceReport,
    pub cached_assets: usize,
    pub cached_bytes: usize,
}

/// Run the eager prefetch sequence against the configured asset server
pub async fn prefetch(plan: ScenePlan, settings: &CliSettings) -> anyhow::Result<PrefetchOutcome> {
    let loader = HttpAssetLoader::with_timeouts(&settings.base_url, settings.request_timeout())?;
    let cache = loader.cache().clone();
    let prefetcher = Prefetcher::from_settings(Arc::new(loader), &plan.config().prefetch);

    info!(base_url = %settings.base_url, scenes = plan.scene_count(), "Prefetching presentation");
    let report = ScenePrefetcher::new(plan, prefetcher)
        .run_full_sequence()
        .await?;

    Ok(PrefetchOutcome {
        report,
        cached_assets: cache.len(),
        cached_bytes: cache.total_bytes(),
    })
}
