use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error(transparent)]
    Graph(#[from] snowpipe_graph::GraphError),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Invalid file pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid {kind} identifier: {value:?}")]
    InvalidIdentifier { kind: &'static str, value: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] snowpipe_config::ConfigError),
}

pub type Result<T> = std::result::Result<T, StackError>;
