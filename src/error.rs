use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CirunError {
    #[error("Invalid workflow {path}: {reason}")]
    Workflow { path: PathBuf, reason: String },

    #[error("Provisioning failed: {0}")]
    Provision(String),

    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CirunError>;
