/// Presentation configuration
///
/// Mirrors the content/timing object an external collaborator authors. Every
/// optional section falls back to documented defaults.
use crate::error::{CurtainError, Result};
use crate::manifest::{AssetManifest, DEFAULT_ASSET_PREFIX};
use crate::scene::SceneDescriptor;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Convert a millisecond setting to a `Duration`
pub const fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationConfig {
    /// Per-scene asset groups
    #[serde(default)]
    pub assets: AssetManifest,

    /// Scenes in presentation order
    pub scenes: Vec<SceneDescriptor>,

    #[serde(default)]
    pub timings: Timings,

    #[serde(default)]
    pub audio: AudioCues,

    #[serde(default)]
    pub end: EndSettings,

    #[serde(default)]
    pub prefetch: PrefetchSettings,

    #[serde(default)]
    pub finale: FinaleSettings,
}

/// Durations in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timings {
    pub fade_in: u64,
    pub fade_out: u64,
    pub bgm_fade: u64,
    pub black_mask: BlackMask,
    pub text_stay: u64,
    pub click_animation: u64,
    pub question_fade_in: u64,
    pub question_fade_out: u64,
    pub proposal_fade_in: u64,
    pub proposal_fade_out: u64,
}

/// Scene transition overlay durations in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlackMask {
    pub fade_in: u64,
    pub hold: u64,
    pub fade_out: u64,
}

/// Background music and sound effect names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioCues {
    #[serde(default = "default_bgm")]
    pub bgm: Option<String>,

    #[serde(default = "default_click")]
    pub click: Option<String>,

    #[serde(default = "default_question_bgm")]
    pub question_bgm: Option<String>,

    #[serde(default = "default_finale_audio")]
    pub finale: Option<String>,

    #[serde(default = "default_music_volume")]
    pub bgm_volume: f32,

    #[serde(default = "default_music_volume")]
    pub question_bgm_volume: f32,
}

/// Finale audio settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSettings {
    /// Target volume of the finale audio
    #[serde(default = "default_end_volume")]
    pub volume: f32,
}

/// Prefetch policy settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefetchSettings {
    #[serde(default = "default_asset_prefix")]
    pub asset_prefix: String,

    /// Readiness timeout for video-class assets
    #[serde(default = "default_video_timeout_ms")]
    pub video_timeout_ms: u64,

    /// Deadline for image and other assets, after which they are skipped
    #[serde(default = "default_soft_timeout_ms")]
    pub soft_timeout_ms: u64,

    /// Conventional icon name, `{scene}` and `{option}` are substituted
    #[serde(default = "default_icon_pattern")]
    pub icon_pattern: Option<String>,
}

/// Finale readiness and hold settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinaleSettings {
    #[serde(default = "default_video_ready_timeout_ms")]
    pub video_ready_timeout_ms: u64,

    #[serde(default = "default_audio_ready_timeout_ms")]
    pub audio_ready_timeout_ms: u64,

    /// Pause when this close to the end of the finale video
    #[serde(default = "default_hold_threshold_ms")]
    pub hold_threshold_ms: u64,

    /// Pin the position this far before the end once paused
    #[serde(default = "default_hold_offset_ms")]
    pub hold_offset_ms: u64,
}

impl PresentationConfig {
    /// Build a configuration from scenes and manifest, all other sections default
    pub fn new(assets: AssetManifest, scenes: Vec<SceneDescriptor>) -> Self {
        Self {
            assets,
            scenes,
            timings: Timings::default(),
            audio: AudioCues::default(),
            end: EndSettings::default(),
            prefetch: PrefetchSettings::default(),
            finale: FinaleSettings::default(),
        }
    }

    /// Load from a JSON or TOML file, chosen by extension
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&text)?,
            Some("json") => Self::from_json_str(&text)?,
            other => {
                return Err(CurtainError::config(format!(
                    "Unsupported configuration format {:?} for {}",
                    other,
                    path.display()
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse from JSON
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse from TOML
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CurtainError::config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.scenes.is_empty() {
            return Err(CurtainError::config("At least one scene is required"));
        }

        if self.assets.len() > self.scenes.len() {
            warn!(
                groups = self.assets.len(),
                scenes = self.scenes.len(),
                "Manifest has more asset groups than scenes; extra groups are never prefetched"
            );
        }

        for (name, volume) in [
            ("audio.bgmVolume", self.audio.bgm_volume),
            ("audio.questionBgmVolume", self.audio.question_bgm_volume),
            ("end.volume", self.end.volume),
        ] {
            if !(0.0..=1.0).contains(&volume) {
                return Err(CurtainError::config(format!(
                    "{} must be within [0, 1], got {}",
                    name, volume
                )));
            }
        }

        Ok(())
    }

    /// Number of scenes
    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// Scene descriptor by index
    pub fn scene(&self, index: usize) -> Result<&SceneDescriptor> {
        self.scenes.get(index).ok_or(CurtainError::SceneOutOfRange {
            index,
            count: self.scenes.len(),
        })
    }
}

// Default values
impl Default for Timings {
    fn default() -> Self {
        Self {
            fade_in: 1000,
            fade_out: 1000,
            bgm_fade: 2000,
            black_mask: BlackMask::default(),
            text_stay: 500,
            click_animation: 120,
            question_fade_in: 1200,
            question_fade_out: 1200,
            proposal_fade_in: 1000,
            proposal_fade_out: 1000,
        }
    }
}

impl Default for BlackMask {
    fn default() -> Self {
        Self {
            fade_in: 1000,
            hold: 500,
            fade_out: 1000,
        }
    }
}

impl Default for AudioCues {
    fn default() -> Self {
        Self {
            bgm: default_bgm(),
            click: default_click(),
            question_bgm: default_question_bgm(),
            finale: default_finale_audio(),
            bgm_volume: default_music_volume(),
            question_bgm_volume: default_music_volume(),
        }
    }
}

impl Default for EndSettings {
    fn default() -> Self {
        Self {
            volume: default_end_volume(),
        }
    }
}

impl Default for PrefetchSettings {
    fn default() -> Self {
        Self {
            asset_prefix: default_asset_prefix(),
            video_timeout_ms: default_video_timeout_ms(),
            soft_timeout_ms: default_soft_timeout_ms(),
            icon_pattern: default_icon_pattern(),
        }
    }
}

impl Default for FinaleSettings {
    fn default() -> Self {
        Self {
            video_ready_timeout_ms: default_video_ready_timeout_ms(),
            audio_ready_timeout_ms: default_audio_ready_timeout_ms(),
            hold_threshold_ms: default_hold_threshold_ms(),
            hold_offset_ms: default_hold_offset_ms(),
        }
    }
}

fn default_bgm() -> Option<String> {
    Some("bgm.mp3".to_string())
}

fn default_click() -> Option<String> {
    Some("click.mp3".to_string())
}

fn default_question_bgm() -> Option<String> {
    Some("questionbgm.mp3".to_string())
}

fn default_finale_audio() -> Option<String> {
    Some("end.mp3".to_string())
}

fn default_music_volume() -> f32 {
    0.7
}

fn default_end_volume() -> f32 {
    0.5
}

fn default_asset_prefix() -> String {
    DEFAULT_ASSET_PREFIX.to_string()
}

fn default_video_timeout_ms() -> u64 {
    30_000
}

fn default_soft_timeout_ms() -> u64 {
    30_000
}

fn default_icon_pattern() -> Option<String> {
    Some("Q{scene}_{option}.svg".to_string())
}

fn default_video_ready_timeout_ms() -> u64 {
    30_000
}

fn default_audio_ready_timeout_ms() -> u64 {
    5_000
}

fn default_hold_threshold_ms() -> u64 {
    50
}

fn default_hold_offset_ms() -> u64 {
    20
}
