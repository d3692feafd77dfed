//! Local provider error types

use snowpipe_graph::GraphError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocalError {
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("{kind} '{name}' does not exist")]
    NotFound { kind: &'static str, name: String },

    #[error("Invalid input for {resource}: {message}")]
    InvalidInput { resource: String, message: String },

    #[error("{kind} '{name}' is not empty")]
    NotEmpty { kind: &'static str, name: String },

    #[error("Injected failure for {0}")]
    Injected(String),

    #[error("Unsupported resource type: {0}")]
    UnsupportedType(String),

    #[error("Inventory lock poisoned")]
    Poisoned,
}

impl LocalError {
    pub fn invalid(resource: &str, message: impl Into<String>) -> Self {
        LocalError::InvalidInput {
            resource: resource.to_string(),
            message: message.into(),
        }
    }
}

impl From<LocalError> for GraphError {
    fn from(e: LocalError) -> Self {
        match e {
            LocalError::AlreadyExists { .. } => GraphError::ResourceAlreadyExists(e.to_string()),
            LocalError::NotFound { .. } => GraphError::ResourceNotFound(e.to_string()),
            other => GraphError::ApiError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, LocalError>;
