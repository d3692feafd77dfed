use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error(
        "Stack config file not found. Looked in:\n\
        - current directory: snowpipe.local.yaml, snowpipe.yaml\n\
        - ./.snowpipe/ directory\n\
        - ~/.config/snowpipe/snowpipe.yaml\n\
        The SNOWPIPE_CONFIG_PATH environment variable can point at a file directly"
    )]
    ConfigFileNotFound,

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
