use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashguardError {
    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error(
        "No usable collision estimate: {requested} requested, {rejected} rejected, {failed} failed"
    )]
    InsufficientSamples {
        requested: usize,
        rejected: usize,
        failed: usize,
    },

    #[error("Invalid video duration: {duration}")]
    InvalidDuration { duration: f64 },

    #[error("Failed to read video {path}: {source}")]
    VideoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not determine duration of {video_path}: {reason}")]
    DurationProbeFailed { video_path: PathBuf, reason: String },

    #[error("Run {generation} was superseded by a newer run")]
    Superseded { generation: u64 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl DashguardError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Errors that are raised before any oracle call is attempted.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingApiKey { .. } | Self::InvalidConfig { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DashguardError>;
