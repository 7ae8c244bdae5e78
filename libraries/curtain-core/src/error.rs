/// Core error types for Curtain
use thiserror::Error;

/// Result type alias using `CurtainError`
pub type Result<T> = std::result::Result<T, CurtainError>;

/// Core error type for Curtain
#[derive(Error, Debug)]
pub enum CurtainError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Scene index outside the configured scene list
    #[error("Scene index out of range: {index} (scene count {count})")]
    SceneOutOfRange { index: usize, count: usize },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CurtainError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
