//! Error types for configuration loading.

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading or validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to parse remote settings: {0}")]
    RemoteParse(#[from] serde_json::Error),

    #[error("minContainers ({min}) must not exceed maxContainers ({max})")]
    BoundsInverted { min: u32, max: u32 },

    #[error("containersPerStep must be at least 1")]
    ZeroStep,

    #[error("source endpoint is required")]
    MissingSourceEndpoint,
}
