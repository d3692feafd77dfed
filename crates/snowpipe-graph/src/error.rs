//! Resource graph error types

use thiserror::Error;

/// Errors raised while declaring, validating or applying a resource graph
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Resource already declared: {0}")]
    DuplicateResource(String),

    #[error("Resource '{resource}' references undeclared resource '{target}'")]
    UnknownReference { resource: String, target: String },

    #[error("Resource '{resource}' references '{target}.{attribute}', which {target} does not export")]
    UnknownAttribute {
        resource: String,
        target: String,
        attribute: String,
    },

    #[error("Resource '{resource}' ({resource_type}) has no property '{property}'")]
    UnknownProperty {
        resource: String,
        resource_type: String,
        property: String,
    },

    #[error("Resource '{resource}' ({resource_type}) is missing required property '{property}'")]
    MissingProperty {
        resource: String,
        resource_type: String,
        property: String,
    },

    #[error("Resource '{resource}': property '{property}' expects {expected}, got {found}")]
    TypeMismatch {
        resource: String,
        property: String,
        expected: String,
        found: String,
    },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Dependency failed for '{resource}': {reason}")]
    DependencyFailed { resource: String, reason: String },

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Resource already exists: {0}")]
    ResourceAlreadyExists(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GraphError {
    /// Whether the error was raised before any provider call was made
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GraphError::DuplicateResource(_)
                | GraphError::UnknownReference { .. }
                | GraphError::UnknownAttribute { .. }
                | GraphError::UnknownProperty { .. }
                | GraphError::MissingProperty { .. }
                | GraphError::TypeMismatch { .. }
                | GraphError::CircularDependency(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
