//! Provider trait definition
//!
//! The provider is the boundary to the external provisioning engine: it is
//! handed one fully-resolved resource at a time and reports back the output
//! attributes the cloud assigned.

use crate::error::{GraphError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Input or output attributes of a resource
pub type Attributes = BTreeMap<String, Value>;

/// Provider abstraction trait
///
/// One provider serves one package of type tokens (e.g. "aws" serves
/// `aws:s3:Bucket` and `aws:iam:Role`).
#[async_trait]
pub trait Provider: Send + Sync {
    /// Package name served by this provider (e.g. "aws", "snowflake")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Check if the provider is properly configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Evaluate a read-only data source
    async fn read(&self, request: &ResourceRequest) -> Result<Attributes>;

    /// Create a resource and return its outputs
    async fn create(&self, request: &ResourceRequest) -> Result<Attributes>;

    /// Update a resource in place and return its new outputs
    async fn update(&self, request: &ResourceRequest, current: &Attributes) -> Result<Attributes>;

    /// Delete a resource
    async fn delete(&self, request: &ResourceRequest, current: &Attributes) -> Result<()>;
}

/// A single resolved resource handed to a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRequest {
    /// Logical name
    pub name: String,

    /// Type token
    pub resource_type: String,

    /// Fully resolved inputs
    pub inputs: Attributes,
}

impl ResourceRequest {
    pub fn new(name: impl Into<String>, resource_type: impl Into<String>, inputs: Attributes) -> Self {
        Self {
            name: name.into(),
            resource_type: resource_type.into(),
            inputs,
        }
    }

    /// Get an input value as a specific type
    pub fn get_input<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.inputs
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Get a required string input
    pub fn require_str(&self, key: &str) -> Result<String> {
        self.get_input::<String>(key).ok_or_else(|| {
            GraphError::ApiError(format!(
                "{} ({}) requires string input '{}'",
                self.name, self.resource_type, key
            ))
        })
    }
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/user information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// Providers indexed by package name
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        tracing::debug!(provider = provider.name(), "Registered provider");
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn with(mut self, provider: Arc<dyn Provider>) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, package: &str) -> Result<Arc<dyn Provider>> {
        self.providers
            .get(package)
            .cloned()
            .ok_or_else(|| GraphError::ProviderNotFound(package.to_string()))
    }

    /// Provider for a type token such as "aws:s3:Bucket"
    pub fn for_type(&self, resource_type: &str) -> Result<Arc<dyn Provider>> {
        let package = resource_type.split(':').next().unwrap_or(resource_type);
        self.get(package)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.providers.values()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.providers.keys().collect();
        names.sort();
        f.debug_struct("ProviderRegistry")
            .field("providers", &names)
            .finish()
    }
}
