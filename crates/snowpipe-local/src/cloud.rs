//! Shared inventory of simulated cloud objects

use crate::error::{LocalError, Result};
use snowpipe_graph::{Attributes, StackState};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inventory {
    /// `<type token>/<identity>` → logical name of the owner
    objects: BTreeMap<String, String>,
    /// Logical names whose create/update calls fail
    fail_on: HashSet<String>,
}

/// In-memory account shared by the AWS and Snowflake providers
#[derive(Debug, Clone, Default)]
pub struct LocalCloud {
    inner: Arc<Mutex<Inventory>>,
}

fn key(resource_type: &str, identity: &str) -> String {
    format!("{}/{}", resource_type, identity)
}

impl LocalCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inventory pre-populated with every resource recorded in `state`
    pub fn from_state(state: &StackState) -> Self {
        let cloud = Self::new();
        if let Ok(mut inventory) = cloud.lock() {
            for (name, resource) in &state.resources {
                if resource.data_source {
                    continue;
                }
                if let Some(identity) = identity_of(&resource.resource_type, &resource.outputs) {
                    inventory
                        .objects
                        .insert(key(&resource.resource_type, &identity), name.clone());
                }
            }
            tracing::debug!(objects = inventory.objects.len(), "Adopted recorded resources");
        }
        cloud
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inventory>> {
        self.inner.lock().map_err(|_| LocalError::Poisoned)
    }

    /// Make every create/update of `logical` fail
    pub fn fail_on(&self, logical: impl Into<String>) {
        if let Ok(mut inventory) = self.lock() {
            inventory.fail_on.insert(logical.into());
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut inventory) = self.lock() {
            inventory.fail_on.clear();
        }
    }

    pub(crate) fn check_fault(&self, logical: &str) -> Result<()> {
        if self.lock()?.fail_on.contains(logical) {
            return Err(LocalError::Injected(logical.to_string()));
        }
        Ok(())
    }

    /// Claim a physical identity for `logical`. Re-claiming one's own
    /// identity is allowed.
    pub(crate) fn claim(
        &self,
        kind: &'static str,
        resource_type: &str,
        identity: &str,
        logical: &str,
    ) -> Result<()> {
        let mut inventory = self.lock()?;
        let k = key(resource_type, identity);
        match inventory.objects.get(&k) {
            Some(owner) if owner != logical => Err(LocalError::AlreadyExists {
                kind,
                name: identity.to_string(),
            }),
            _ => {
                inventory.objects.insert(k, logical.to_string());
                Ok(())
            }
        }
    }

    /// Track an existing object again, e.g. after a failed replacement
    pub(crate) fn adopt(&self, resource_type: &str, outputs: &Attributes, logical: &str) {
        let Some(identity) = identity_of(resource_type, outputs) else {
            return;
        };
        if let Ok(mut inventory) = self.lock() {
            inventory
                .objects
                .insert(key(resource_type, &identity), logical.to_string());
        }
    }

    pub(crate) fn release(&self, resource_type: &str, identity: &str) -> Result<()> {
        if self.lock()?.objects.remove(&key(resource_type, identity)).is_none() {
            tracing::warn!(resource_type, identity, "Released an object that was not tracked");
        }
        Ok(())
    }

    pub fn exists(&self, resource_type: &str, identity: &str) -> bool {
        self.lock()
            .map(|inventory| inventory.objects.contains_key(&key(resource_type, identity)))
            .unwrap_or(false)
    }

    /// Whether any object of `resource_type` has an identity starting with `prefix`
    pub(crate) fn has_children(&self, resource_type: &str, prefix: &str) -> bool {
        let start = key(resource_type, prefix);
        self.lock()
            .map(|inventory| inventory.objects.keys().any(|k| k.starts_with(&start)))
            .unwrap_or(false)
    }

    /// Number of tracked objects
    pub fn len(&self) -> usize {
        self.lock().map(|inventory| inventory.objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identity under which a provisioned resource is tracked
pub(crate) fn identity_of(resource_type: &str, outputs: &Attributes) -> Option<String> {
    let attribute = if resource_type.starts_with("aws:") {
        "id"
    } else if outputs.contains_key("qualified_name") {
        "qualified_name"
    } else {
        "name"
    };
    outputs
        .get(attribute)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use snowpipe_graph::ResourceState;

    #[test]
    fn test_claim_conflict() {
        let cloud = LocalCloud::new();
        cloud.claim("bucket", "aws:s3:Bucket", "demo", "a").unwrap();
        cloud.claim("bucket", "aws:s3:Bucket", "demo", "a").unwrap();
        assert!(matches!(
            cloud.claim("bucket", "aws:s3:Bucket", "demo", "b"),
            Err(LocalError::AlreadyExists { .. })
        ));
        cloud.release("aws:s3:Bucket", "demo").unwrap();
        assert!(cloud.is_empty());
    }

    #[test]
    fn test_from_state_adopts_resources() {
        let mut state = StackState::new();
        state.set_resource(
            "landing",
            ResourceState::new("aws:s3:Bucket")
                .with_outputs(BTreeMap::from([("id".to_string(), json!("landing-abc"))])),
        );
        state.set_resource(
            "caller",
            ResourceState::new("aws:index:getCallerIdentity")
                .with_outputs(BTreeMap::from([("account_id".to_string(), json!("1"))]))
                .with_data_source(true),
        );

        let cloud = LocalCloud::from_state(&state);
        assert_eq!(cloud.len(), 1);
        assert!(cloud.exists("aws:s3:Bucket", "landing-abc"));
    }

    #[test]
    fn test_fault_injection() {
        let cloud = LocalCloud::new();
        cloud.fail_on("pipe");
        assert!(cloud.check_fault("pipe").is_err());
        assert!(cloud.check_fault("stage").is_ok());
        cloud.clear_failures();
        assert!(cloud.check_fault("pipe").is_ok());
    }
}
