//! State management for provisioned resources
//!
//! Manages the `.snowpipe/state.json` file which records the inputs and
//! outputs of every resource the last run provisioned.

use crate::error::{GraphError, Result};
use crate::output::OutputContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".snowpipe";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";

/// State of a whole stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackState {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Resources indexed by logical name
    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for StackState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl StackState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a resource
    pub fn set_resource(&mut self, name: impl Into<String>, state: ResourceState) {
        self.resources.insert(name.into(), state);
        self.updated_at = Utc::now();
    }

    /// Remove a resource
    pub fn remove_resource(&mut self, name: &str) -> Option<ResourceState> {
        let result = self.resources.remove(name);
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }

    /// Get a resource by logical name
    pub fn get_resource(&self, name: &str) -> Option<&ResourceState> {
        self.resources.get(name)
    }

    /// Outputs of every successfully provisioned resource
    pub fn output_context(&self) -> OutputContext {
        let mut ctx = OutputContext::new();
        for (name, resource) in &self.resources {
            if resource.status == ResourceStatus::Ready {
                ctx.set_ready(name.clone(), resource.outputs.clone());
            }
        }
        ctx
    }

    /// Recorded resources in reverse dependency order (dependents first)
    pub fn deletion_order(&self) -> Vec<String> {
        let mut remaining: BTreeMap<&str, BTreeSet<&str>> = self
            .resources
            .iter()
            .map(|(name, resource)| {
                let deps = resource
                    .dependencies
                    .iter()
                    .map(String::as_str)
                    .filter(|d| self.resources.contains_key(*d))
                    .collect();
                (name.as_str(), deps)
            })
            .collect();

        let mut order = Vec::new();
        while !remaining.is_empty() {
            // Leaves of the reversed graph: nothing remaining depends on them
            let mut leaves: Vec<&str> = remaining
                .keys()
                .filter(|name| !remaining.values().any(|deps| deps.contains(*name)))
                .copied()
                .collect();

            if leaves.is_empty() {
                // A recorded cycle cannot come from a validated graph; fall back to name order
                tracing::warn!("State contains a dependency cycle, deleting in name order");
                leaves = remaining.keys().copied().collect();
            }

            for name in &leaves {
                remaining.remove(name);
                order.push(name.to_string());
            }
        }
        order
    }
}

/// State of a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Type token (e.g. "aws:s3:Bucket")
    pub resource_type: String,

    /// Current status
    pub status: ResourceStatus,

    /// Inputs the resource was last provisioned with
    pub inputs: BTreeMap<String, Value>,

    /// Output attributes reported by the provider (ARN, name, ...)
    pub outputs: BTreeMap<String, Value>,

    /// Logical names of the resources this one depended on
    #[serde(default)]
    pub dependencies: BTreeSet<String>,

    /// Read-only lookup; never deleted
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub data_source: bool,

    /// Last failure reason, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the resource was created
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(resource_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            resource_type: resource_type.into(),
            status: ResourceStatus::Unknown,
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            dependencies: BTreeSet::new(),
            data_source: false,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_inputs(mut self, inputs: BTreeMap<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: BTreeMap<String, Value>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_dependencies(mut self, dependencies: BTreeSet<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_data_source(mut self, data_source: bool) -> Self {
        self.data_source = data_source;
        self
    }

    pub fn set_output(&mut self, key: impl Into<String>, value: Value) {
        self.outputs.insert(key.into(), value);
        self.updated_at = Utc::now();
    }

    pub fn get_output<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.outputs
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Status of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Provisioned and outputs recorded
    Ready,
    /// Last create/update was rejected by the provider
    Failed,
    /// Status is unknown
    Unknown,
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Ready => write!(f, "ready"),
            ResourceStatus::Failed => write!(f, "failed"),
            ResourceStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// State manager for reading/writing state files
pub struct StateManager {
    /// Project root directory
    project_root: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    /// Get the state directory path
    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    /// Get the state file path
    pub fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    /// Get the backup file path
    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    /// Ensure the state directory exists
    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the current state
    pub async fn load(&self) -> Result<StackState> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, returning empty state");
            return Ok(StackState::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: StackState = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(GraphError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} resources", state.resources.len());
        Ok(state)
    }

    /// Save the state
    pub async fn save(&self, state: &StackState) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let backup = self.backup_path();

        // Keep the previous state around
        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created state backup");
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state with {} resources", state.resources.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_state_save_load() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let mut state = StackState::new();
        let mut bucket = ResourceState::new("aws:s3:Bucket").with_status(ResourceStatus::Ready);
        bucket.set_output("arn", json!("arn:aws:s3:::demo"));
        state.set_resource("demo-bucket", bucket);

        manager.save(&state).await.unwrap();

        let loaded = manager.load().await.unwrap();
        assert_eq!(loaded.resources.len(), 1);
        let bucket = loaded.get_resource("demo-bucket").unwrap();
        assert_eq!(
            bucket.get_output::<String>("arn").as_deref(),
            Some("arn:aws:s3:::demo")
        );
    }

    #[tokio::test]
    async fn test_empty_state() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let state = manager.load().await.unwrap();
        assert!(state.resources.is_empty());
    }

    #[tokio::test]
    async fn test_save_keeps_backup() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        manager.save(&StackState::new()).await.unwrap();
        manager.save(&StackState::new()).await.unwrap();

        assert!(temp_dir.path().join(".snowpipe/state.json.backup").exists());
    }

    #[tokio::test]
    async fn test_newer_version_rejected() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let mut state = StackState::new();
        state.version = STATE_VERSION + 1;
        manager.save(&state).await.unwrap();

        assert!(matches!(
            manager.load().await.unwrap_err(),
            GraphError::StateError(_)
        ));
    }

    #[test]
    fn test_deletion_order_puts_dependents_first() {
        let mut state = StackState::new();
        state.set_resource("db", ResourceState::new("snowflake:Database"));
        state.set_resource(
            "schema",
            ResourceState::new("snowflake:Schema").with_dependencies(BTreeSet::from(["db".to_string()])),
        );
        state.set_resource(
            "table",
            ResourceState::new("snowflake:Table")
                .with_dependencies(BTreeSet::from(["db".to_string(), "schema".to_string()])),
        );

        assert_eq!(state.deletion_order(), vec!["table", "schema", "db"]);
    }

    #[test]
    fn test_output_context_skips_failed_resources() {
        let mut state = StackState::new();
        state.set_resource(
            "ok",
            ResourceState::new("aws:s3:Bucket")
                .with_status(ResourceStatus::Ready)
                .with_outputs(BTreeMap::from([("arn".to_string(), json!("a"))])),
        );
        state.set_resource(
            "broken",
            ResourceState::new("aws:s3:Bucket").with_status(ResourceStatus::Failed),
        );

        let ctx = state.output_context();
        assert!(ctx.outcome("ok").is_some());
        assert!(ctx.outcome("broken").is_none());
    }
}
