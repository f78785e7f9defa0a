//! CLI error types.

use trellis_config::ConfigError;
use trellis_engine::{SaveError, SnapshotError, TreeError};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Snapshot(#[from] SnapshotError),

    #[error("{0}")]
    Save(#[from] SaveError),

    #[error("{0}")]
    Tree(#[from] TreeError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("Menu not found: {0}")]
    MenuNotFound(String),

    #[error("{0}")]
    Validation(String),
}
