//! Action types for resource graph runs

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Represents a planned action for a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action
    pub id: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Resource type token (e.g. "aws:s3:Bucket")
    pub resource_type: String,

    /// Logical resource name
    pub resource_name: String,

    /// Description of the action
    pub description: String,

    /// Input properties whose value changes
    pub changed: BTreeSet<String>,

    /// Input properties that stay unknown until upstream resources are applied
    pub unknown: BTreeSet<String>,
}

impl Action {
    pub fn new(
        action_type: ActionType,
        resource_type: impl Into<String>,
        resource_name: impl Into<String>,
    ) -> Self {
        let resource_type = resource_type.into();
        let resource_name = resource_name.into();
        Self {
            id: format!("{}-{}", action_type, resource_name),
            description: format!("{} {} ({})", action_type, resource_name, resource_type),
            action_type,
            resource_type,
            resource_name,
            changed: BTreeSet::new(),
            unknown: BTreeSet::new(),
        }
    }

    pub fn with_changed(mut self, changed: BTreeSet<String>) -> Self {
        self.changed = changed;
        self
    }

    pub fn with_unknown(mut self, unknown: BTreeSet<String>) -> Self {
        self.unknown = unknown;
        self
    }

    /// Whether applying this action modifies infrastructure
    pub fn is_change(&self) -> bool {
        self.action_type.is_change()
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Update an existing resource
    Update,
    /// Delete a resource
    Delete,
    /// Read a data source
    Read,
    /// No changes needed
    NoOp,
}

impl ActionType {
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            ActionType::Create | ActionType::Update | ActionType::Delete
        )
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::Read => write!(f, "read"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Result of applying actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Successfully applied actions
    pub succeeded: Vec<ActionResult>,

    /// Actions rejected by a provider
    pub failed: Vec<ActionResult>,

    /// Actions not attempted because an upstream resource failed
    pub skipped: Vec<ActionResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    pub fn add_success(&mut self, action_id: String, message: String) {
        self.succeeded.push(ActionResult {
            action_id,
            success: true,
            message,
            error: None,
        });
    }

    pub fn add_failure(&mut self, action_id: String, error: String) {
        self.failed.push(ActionResult {
            action_id,
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }

    pub fn add_skipped(&mut self, action_id: String, reason: String) {
        self.skipped.push(ActionResult {
            action_id,
            success: false,
            message: String::new(),
            error: Some(reason),
        });
    }
}

impl Default for ApplyResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// ID of the action
    pub action_id: String,

    /// Whether the action succeeded
    pub success: bool,

    /// Success message
    pub message: String,

    /// Error message if failed or skipped
    pub error: Option<String>,
}

/// Plan containing all actions to be applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// List of actions to perform
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(Action::is_change);
        Self {
            actions,
            has_changes,
        }
    }

    pub fn empty() -> Self {
        Self {
            actions: Vec::new(),
            has_changes: false,
        }
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Action planned for a resource
    pub fn action_for(&self, resource_name: &str) -> Option<&Action> {
        self.actions
            .iter()
            .find(|a| a.resource_name == resource_name)
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            read: self.actions_by_type(ActionType::Read).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub read: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_without_changes() {
        let plan = Plan::new(vec![
            Action::new(ActionType::NoOp, "aws:s3:Bucket", "bucket"),
            Action::new(ActionType::Read, "aws:getCallerIdentity", "identity"),
        ]);
        assert!(!plan.has_changes);
        assert_eq!(
            plan.summary().to_string(),
            "0 to create, 0 to update, 0 to delete, 1 unchanged"
        );
    }

    #[test]
    fn test_plan_summary_counts() {
        let plan = Plan::new(vec![
            Action::new(ActionType::Create, "aws:s3:Bucket", "bucket"),
            Action::new(ActionType::Update, "aws:iam:Policy", "policy"),
            Action::new(ActionType::Delete, "aws:iam:Role", "old-role"),
        ]);
        assert!(plan.has_changes);
        let summary = plan.summary();
        assert_eq!((summary.create, summary.update, summary.delete), (1, 1, 1));
        assert_eq!(plan.action_for("policy").unwrap().id, "update-policy");
    }
}
