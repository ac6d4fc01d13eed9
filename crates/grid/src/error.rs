use std::path::PathBuf;

use gridspace_common::EntityId;

/// Membership and construction errors reported by cells and the grid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("entity {id} already exists in cell")]
    AlreadyExists { id: EntityId },
    #[error("entity {id} not found in cell")]
    NotFound { id: EntityId },
    #[error("invalid grid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors from loading or validating a [`GridConfig`](crate::GridConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),
    #[error("grid layout too large: {0} overflows i32")]
    TooLarge(&'static str),
    #[error("{field} must not be negative, got {value}")]
    Invalid { field: &'static str, value: i32 },
}

impl From<ConfigError> for GridError {
    fn from(err: ConfigError) -> Self {
        GridError::InvalidConfig(err.to_string())
    }
}
