//! Error types for promptlab-core.

use thiserror::Error;

use crate::models::OperationType;

#[derive(Error, Debug)]
pub enum PlaygroundError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("A playground needs at least one instance")]
    EmptyInstances,

    #[error("Duplicate playground instance id: {0}")]
    DuplicateInstanceId(u64),

    #[error("Instance {id} has a {found} template but the playground operation type is {expected}")]
    TemplateMismatch {
        id: u64,
        expected: OperationType,
        found: OperationType,
    },

    #[error("Unsupported file extension: {0} (expected .yaml, .yml or .json)")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, PlaygroundError>;
