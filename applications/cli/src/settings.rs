/// CLI runtime settings
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Settings file looked up in the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "curtain.toml";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CliSettings {
    /// Where assets are downloaded from
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout for asset downloads
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// `tracing` filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: None,
            log_filter: default_log_filter(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_log_filter() -> String {
    "curtain=info".to_string()
}

impl CliSettings {
    /// Load settings from defaults, file and environment
    ///
    /// An explicit `path` must exist; otherwise `curtain.toml` is read when
    /// present. Variables prefixed `CURTAIN_` override file values, with `__`
    /// separating nested keys.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = config::Config::builder()
            .set_default("base_url", default_base_url())?
            .set_default("log_filter", default_log_filter())?;

        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
            }
            None => {
                let fallback = PathBuf::from(DEFAULT_SETTINGS_FILE);
                if fallback.exists() {
                    builder = builder.add_source(config::File::from(fallback));
                }
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CURTAIN")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(SettingsError::Invalid(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(SettingsError::Invalid(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
