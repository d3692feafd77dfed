pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_PATH_ENV: &str = "SNOWPIPE_CONFIG_PATH";
const STACK_ENV: &str = "SNOWPIPE_STACK";
const REGION_ENV: &str = "SNOWPIPE_AWS_REGION";

/// Stack configuration
///
/// Every field has a default, so an empty file (or no file at all) describes
/// the stock S3 → Snowpipe demo stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackConfig {
    /// Stack name, used to derive auto-generated physical names
    pub stack: String,

    pub aws: AwsConfig,

    pub snowflake: SnowflakeConfig,

    pub names: ResourceNames,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            stack: "dev".to_string(),
            aws: AwsConfig::default(),
            snowflake: SnowflakeConfig::default(),
            names: ResourceNames::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AwsConfig {
    pub region: String,

    /// Account the local provider reports from the caller identity lookup
    pub account_id: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            account_id: "123456789012".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SnowflakeConfig {
    /// Snowflake account locator
    pub account: String,

    /// AWS account that hosts the Snowflake deployment (owner of the
    /// integration's IAM user and the pipe's notification queue)
    pub aws_account_id: String,
}

impl Default for SnowflakeConfig {
    fn default() -> Self {
        Self {
            account: "SNOWPIPE_DEMO".to_string(),
            aws_account_id: "210987654321".to_string(),
        }
    }
}

/// Names of the declared resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceNames {
    /// Logical name of the landing bucket (physical name is auto-generated)
    pub bucket: String,

    /// Fixed IAM role name the storage integration assumes
    pub role: String,

    /// Logical name of the database
    pub database: String,

    /// Schema name
    pub schema: String,

    /// Table name
    pub table: String,
}

impl Default for ResourceNames {
    fn default() -> Self {
        Self {
            bucket: "pulumi-snowflake-blog-demo".to_string(),
            role: "snowflake-storage-integration".to_string(),
            database: "pulumi-snowflake-demo".to_string(),
            schema: "JAFFLE_SHOP".to_string(),
            table: "CUSTOMERS".to_string(),
        }
    }
}

impl StackConfig {
    /// Parse a YAML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: StackConfig = if content.trim().is_empty() {
            StackConfig::default()
        } else {
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        };
        tracing::debug!(path = %path.display(), stack = %config.stack, "Loaded stack config");
        Ok(config)
    }

    /// Apply SNOWPIPE_STACK / SNOWPIPE_AWS_REGION overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(stack) = std::env::var(STACK_ENV) {
            self.stack = stack;
        }
        if let Ok(region) = std::env::var(REGION_ENV) {
            self.aws.region = region;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("stack", &self.stack),
            ("aws.region", &self.aws.region),
            ("aws.account_id", &self.aws.account_id),
            ("snowflake.account", &self.snowflake.account),
            ("names.bucket", &self.names.bucket),
            ("names.role", &self.names.role),
            ("names.database", &self.names.database),
            ("names.schema", &self.names.schema),
            ("names.table", &self.names.table),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(format!("{} must not be empty", field)));
            }
        }

        for (field, value) in [
            ("aws.account_id", &self.aws.account_id),
            ("snowflake.aws_account_id", &self.snowflake.aws_account_id),
        ] {
            if value.len() != 12 || !value.chars().all(|c| c.is_ascii_digit()) {
                return Err(ConfigError::InvalidConfig(format!(
                    "{} must be a 12-digit AWS account id, got '{}'",
                    field, value
                )));
            }
        }

        Ok(())
    }
}

/// Get the snowpipe config directory
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("snowpipe");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Find the stack config file
///
/// Search order:
/// 1. SNOWPIPE_CONFIG_PATH environment variable
/// 2. current directory: snowpipe.local.yaml, snowpipe.yaml
/// 3. ./.snowpipe/ directory, same order
/// 4. ~/.config/snowpipe/snowpipe.yaml
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("{} points at missing file {}", CONFIG_PATH_ENV, path.display());
    }

    let current_dir = std::env::current_dir()?;
    let candidates = ["snowpipe.local.yaml", "snowpipe.yaml"];

    for filename in &candidates {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let state_dir = current_dir.join(".snowpipe");
    if state_dir.is_dir() {
        for filename in &candidates {
            let path = state_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("snowpipe").join("snowpipe.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Load the stack config
///
/// An explicit path must exist. Without one, the search of
/// [`find_config_file`] runs and falls back to the defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<StackConfig> {
    let config = match explicit {
        Some(path) => StackConfig::from_file(path)?,
        None => match find_config_file() {
            Ok(path) => StackConfig::from_file(&path)?,
            Err(ConfigError::ConfigFileNotFound) => {
                tracing::info!("No stack config file found, using defaults");
                StackConfig::default()
            }
            Err(e) => return Err(e),
        },
    };

    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_defaults_match_demo_stack() {
        let config = StackConfig::default();
        assert_eq!(config.names.bucket, "pulumi-snowflake-blog-demo");
        assert_eq!(config.names.role, "snowflake-storage-integration");
        assert_eq!(config.names.schema, "JAFFLE_SHOP");
        assert_eq!(config.names.table, "CUSTOMERS");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("snowpipe.yaml");
        fs::write(&path, "stack: prod\nnames:\n  table: ORDERS\n").unwrap();

        let config = StackConfig::from_file(&path).unwrap();
        assert_eq!(config.stack, "prod");
        assert_eq!(config.names.table, "ORDERS");
        assert_eq!(config.names.schema, "JAFFLE_SHOP");
        assert_eq!(config.aws.region, "us-east-1");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("snowpipe.yaml");
        fs::write(&path, "stak: prod\n").unwrap();

        assert!(matches!(
            StackConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_empty_file_is_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("snowpipe.yaml");
        fs::write(&path, "\n").unwrap();

        assert_eq!(StackConfig::from_file(&path).unwrap(), StackConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_account() {
        let mut config = StackConfig::default();
        config.aws.account_id = "12345".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfig(_))
        ));

        let mut config = StackConfig::default();
        config.names.role = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_find_config_file_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("snowpipe.yaml"), "stack: shared\n").unwrap();
        fs::write(temp_dir.path().join("snowpipe.local.yaml"), "stack: local\n").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_config_file().unwrap();
        assert!(result.ends_with("snowpipe.local.yaml"));

        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_state_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        let state_dir = temp_dir.path().join(".snowpipe");
        fs::create_dir(&state_dir).unwrap();
        fs::write(state_dir.join("snowpipe.yaml"), "stack: nested\n").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_config_file().unwrap();
        assert!(result.ends_with(".snowpipe/snowpipe.yaml"));

        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "stack: custom\n").unwrap();

        temp_env::with_var(CONFIG_PATH_ENV, Some(config_path.as_os_str()), || {
            let result = find_config_file().unwrap();
            assert_eq!(result, config_path);
        });
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        temp_env::with_vars(
            [(STACK_ENV, Some("staging")), (REGION_ENV, Some("eu-west-1"))],
            || {
                let config = StackConfig::default().with_env_overrides();
                assert_eq!(config.stack, "staging");
                assert_eq!(config.aws.region, "eu-west-1");
            },
        );
    }

    #[test]
    #[serial]
    fn test_load_config_explicit_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = load_config(Some(&temp_dir.path().join("nope.yaml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
