//! Asset classification by file extension

use serde::{Deserialize, Serialize};

/// Class of an asset, which decides its prefetch policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Essential to playback; failures are fatal
    Video,

    /// Cosmetic; failures are logged only
    Image,

    /// Audio and anything unrecognized; fetched best-effort
    Other,
}

const VIDEO_EXTENSIONS: &[&str] = &["mp4"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg"];

impl AssetKind {
    /// Classify a path by its extension, ignoring any query string
    pub fn classify(path: &str) -> Self {
        let path = path.split('?').next().unwrap_or_default();
        let file = path.rsplit('/').next().unwrap_or_default();

        let Some((_, ext)) = file.rsplit_once('.') else {
            return AssetKind::Other;
        };
        let ext = ext.to_ascii_lowercase();

        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            AssetKind::Video
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            AssetKind::Image
        } else {
            AssetKind::Other
        }
    }

    /// Whether a failure of this kind aborts the scene
    pub fn is_essential(&self) -> bool {
        matches!(self, AssetKind::Video)
    }
}
