//! Plan and apply a resource graph against recorded state
//!
//! `preview` is pure: it diffs the declared inputs against the state file.
//! `up` walks the graph level by level, dispatching the members of a level
//! concurrently, and records what the providers report back. A provider
//! error fails only the resource it concerns; every resource downstream of
//! it is skipped as "dependency failed", independent branches carry on.

use crate::action::{Action, ActionType, ApplyResult, Plan};
use crate::error::Result;
use crate::graph::ResourceGraph;
use crate::output::{OutputContext, ResourceOutcome};
use crate::provider::{Attributes, ProviderRegistry, ResourceRequest};
use crate::resource::{PartialInputs, ResourceDecl};
use crate::state::{ResourceState, ResourceStatus, StackState};
use futures_util::future::join_all;
use std::collections::{BTreeSet, HashSet};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Decide what to do with one declaration
fn plan_resource(decl: &ResourceDecl, recorded: Option<&ResourceState>, inputs: &PartialInputs) -> Action {
    let resource_type = decl.resource_type();

    if decl.schema.data_source {
        return Action::new(ActionType::Read, resource_type, &decl.name);
    }

    let mut unknown = inputs.unknown.clone();
    unknown.extend(inputs.failed.keys().cloned());

    let Some(recorded) = recorded else {
        return Action::new(ActionType::Create, resource_type, &decl.name).with_unknown(unknown);
    };

    let mut changed: BTreeSet<String> = inputs
        .known
        .iter()
        .filter(|(key, value)| recorded.inputs.get(*key) != Some(*value))
        .map(|(key, _)| key.clone())
        .collect();
    // Properties that were removed from the declaration
    changed.extend(
        recorded
            .inputs
            .keys()
            .filter(|key| !decl.properties.contains_key(*key))
            .cloned(),
    );

    if changed.is_empty() && unknown.is_empty() && recorded.status == ResourceStatus::Ready {
        Action::new(ActionType::NoOp, resource_type, &decl.name)
    } else {
        Action::new(ActionType::Update, resource_type, &decl.name)
            .with_changed(changed)
            .with_unknown(unknown)
    }
}

/// Result of running one resource
enum NodeOutcome {
    Applied {
        action: Action,
        inputs: Attributes,
        outputs: Attributes,
    },
    Unchanged {
        outputs: Attributes,
    },
    Failed {
        action: Action,
        error: String,
    },
    Skipped {
        action_id: String,
        reason: String,
    },
}

/// Evaluation driver over a set of providers
pub struct Engine {
    providers: ProviderRegistry,
}

impl Engine {
    pub fn new(providers: ProviderRegistry) -> Self {
        Self { providers }
    }

    /// Compute the actions a run would take, without calling any provider
    pub fn preview(graph: &ResourceGraph, state: &StackState) -> Result<Plan> {
        graph.validate()?;
        let ctx = state.output_context();

        let mut actions = Vec::new();
        for name in graph.topological_order()? {
            let Some(decl) = graph.get(&name) else {
                continue;
            };
            let inputs = decl.resolve_partial(&ctx);
            for (key, reason) in &inputs.failed {
                warn!(resource = %name, property = %key, "Input cannot be resolved: {}", reason);
            }
            decl.check_resolved(&inputs.known)?;
            actions.push(plan_resource(decl, state.get_resource(&name), &inputs));
        }

        for name in state.deletion_order() {
            if graph.contains(&name) {
                continue;
            }
            if let Some(recorded) = state.get_resource(&name) {
                if !recorded.data_source {
                    actions.push(Action::new(ActionType::Delete, &recorded.resource_type, &name));
                }
            }
        }

        let plan = Plan::new(actions);
        debug!(summary = %plan.summary(), "Computed plan");
        Ok(plan)
    }

    /// Provision the graph and record the results in `state`
    pub async fn up(&self, graph: &ResourceGraph, state: &mut StackState) -> Result<ApplyResult> {
        graph.validate()?;
        let start = Instant::now();
        let mut result = ApplyResult::new();
        let mut ctx = OutputContext::new();

        for level in graph.levels()? {
            let runs = level.iter().filter_map(|name| graph.get(name)).map(|decl| {
                self.run_resource(graph, decl, state.get_resource(&decl.name), &ctx)
            });
            let outcomes = join_all(runs).await;

            for (name, outcome) in level.iter().zip(outcomes) {
                let Some(decl) = graph.get(name) else {
                    continue;
                };
                self.record(decl, graph.dependencies_of(name), outcome, state, &mut ctx, &mut result);
            }
        }

        let orphans: Vec<String> = state
            .deletion_order()
            .into_iter()
            .filter(|name| !graph.contains(name))
            .collect();
        self.delete_resources(&orphans, state, &mut result).await;

        result.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            skipped = result.skipped.len(),
            "Apply finished in {}ms",
            result.duration_ms
        );
        Ok(result)
    }

    /// Delete every recorded resource, dependents first
    pub async fn destroy(&self, state: &mut StackState) -> Result<ApplyResult> {
        let start = Instant::now();
        let mut result = ApplyResult::new();

        let order = state.deletion_order();
        self.delete_resources(&order, state, &mut result).await;

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    async fn run_resource(
        &self,
        graph: &ResourceGraph,
        decl: &ResourceDecl,
        recorded: Option<&ResourceState>,
        ctx: &OutputContext,
    ) -> NodeOutcome {
        let id_hint = format!("skip-{}", decl.name);

        // Explicit edges carry no data, so check upstream outcomes directly
        for dep in graph.dependencies_of(&decl.name) {
            if let Some(ResourceOutcome::Failed(reason)) = ctx.outcome(&dep) {
                return NodeOutcome::Skipped {
                    action_id: id_hint,
                    reason: format!("dependency {} failed: {}", dep, reason),
                };
            }
        }

        let inputs = decl.resolve_partial(ctx);
        if let Some((key, reason)) = inputs.failed.iter().next() {
            return NodeOutcome::Skipped {
                action_id: id_hint,
                reason: format!("input '{}' failed: {}", key, reason),
            };
        }

        let action = plan_resource(decl, recorded, &inputs);
        // Derivations are only type-checked once they produce a value
        if let Err(e) = decl.check_resolved(&inputs.known) {
            return NodeOutcome::Failed {
                action,
                error: e.to_string(),
            };
        }
        if !inputs.unknown.is_empty() {
            // Every upstream resource ran in an earlier level, so this is a wiring bug
            return NodeOutcome::Failed {
                error: format!("inputs still unknown: {:?}", inputs.unknown),
                action,
            };
        }

        if let (ActionType::NoOp, Some(recorded)) = (action.action_type, recorded) {
            return NodeOutcome::Unchanged {
                outputs: recorded.outputs.clone(),
            };
        }

        let provider = match self.providers.for_type(decl.resource_type()) {
            Ok(provider) => provider,
            Err(e) => {
                return NodeOutcome::Failed {
                    action,
                    error: e.to_string(),
                };
            }
        };

        let request = ResourceRequest::new(&decl.name, decl.resource_type(), inputs.known);
        let response = match (action.action_type, recorded) {
            (ActionType::Read, _) => provider.read(&request).await,
            (ActionType::Update, Some(recorded)) => {
                info!(resource = %decl.name, changed = ?action.changed, "Updating {}", decl.resource_type());
                provider.update(&request, &recorded.outputs).await
            }
            _ => {
                info!(resource = %decl.name, "Creating {}", decl.resource_type());
                provider.create(&request).await
            }
        };

        match response {
            Ok(outputs) => NodeOutcome::Applied {
                action,
                inputs: request.inputs,
                outputs,
            },
            Err(e) => NodeOutcome::Failed {
                action,
                error: e.to_string(),
            },
        }
    }

    fn record(
        &self,
        decl: &ResourceDecl,
        dependencies: BTreeSet<String>,
        outcome: NodeOutcome,
        state: &mut StackState,
        ctx: &mut OutputContext,
        result: &mut ApplyResult,
    ) {
        let name = decl.name.as_str();
        match outcome {
            NodeOutcome::Applied {
                action,
                inputs,
                outputs,
            } => {
                let mut resource = ResourceState::new(decl.resource_type())
                    .with_status(ResourceStatus::Ready)
                    .with_inputs(inputs)
                    .with_outputs(outputs.clone())
                    .with_dependencies(dependencies)
                    .with_data_source(decl.schema.data_source);
                if let Some(previous) = state.get_resource(name) {
                    resource.created_at = previous.created_at;
                }
                state.set_resource(name, resource);
                ctx.set_ready(name, outputs);
                result.add_success(action.id.clone(), action.description);
            }
            NodeOutcome::Unchanged { outputs } => {
                if let Some(recorded) = state.resources.get_mut(name) {
                    recorded.dependencies = dependencies;
                }
                ctx.set_ready(name, outputs);
            }
            NodeOutcome::Failed { action, error } => {
                error!(resource = %name, "{} failed: {}", action.action_type, error);
                if let Some(recorded) = state.resources.get_mut(name) {
                    recorded.status = ResourceStatus::Failed;
                    recorded.error = Some(error.clone());
                }
                ctx.set_failed(name, error.clone());
                result.add_failure(action.id, error);
            }
            NodeOutcome::Skipped { action_id, reason } => {
                warn!(resource = %name, "Skipped: {}", reason);
                ctx.set_failed(name, format!("dependency failed ({})", reason));
                result.add_skipped(action_id, reason);
            }
        }
    }

    async fn delete_resources(&self, order: &[String], state: &mut StackState, result: &mut ApplyResult) {
        // Resources whose dependents could not be deleted must stay
        let mut blocked: HashSet<String> = HashSet::new();

        for name in order {
            let Some(recorded) = state.get_resource(name).cloned() else {
                continue;
            };
            let action = Action::new(ActionType::Delete, &recorded.resource_type, name);

            if blocked.contains(name) {
                result.add_skipped(action.id, "a dependent resource could not be deleted".to_string());
                blocked.extend(recorded.dependencies.iter().cloned());
                continue;
            }

            if recorded.data_source {
                state.remove_resource(name);
                continue;
            }

            let request = ResourceRequest::new(name, &recorded.resource_type, recorded.inputs.clone());
            let outcome = match self.providers.for_type(&recorded.resource_type) {
                Ok(provider) => {
                    info!(resource = %name, "Deleting {}", recorded.resource_type);
                    provider.delete(&request, &recorded.outputs).await
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => {
                    state.remove_resource(name);
                    result.add_success(action.id, action.description);
                }
                Err(e) => {
                    error!(resource = %name, "delete failed: {}", e);
                    blocked.extend(recorded.dependencies.iter().cloned());
                    result.add_failure(action.id, e.to_string());
                }
            }
        }
    }
}
