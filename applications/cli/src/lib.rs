//! Curtain CLI - checking, planning and prefetching presentations

pub mod commands;
pub mod settings;

pub use commands::{check, prefetch, summarize, CheckReport, PrefetchOutcome, SceneSummary};
pub use settings::{CliSettings, SettingsError, DEFAULT_SETTINGS_FILE};
