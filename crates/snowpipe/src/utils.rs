use colored::Colorize;
use snowpipe_config::StackConfig;
use snowpipe_graph::{Action, ActionType, ApplyResult, Engine, Plan, StackState, StateManager};
use snowpipe_local::{LocalCloud, registry_for};
use snowpipe_stack::Stack;
use std::path::PathBuf;

/// Where a command finds its config and state
pub struct Project {
    pub root: PathBuf,
    pub config_path: Option<PathBuf>,
}

impl Project {
    pub fn new(root: PathBuf, config_path: Option<PathBuf>) -> Self {
        Self { root, config_path }
    }

    pub fn load_config(&self) -> anyhow::Result<StackConfig> {
        Ok(snowpipe_config::load_config(self.config_path.as_deref())?)
    }

    pub fn state_manager(&self) -> StateManager {
        StateManager::new(&self.root)
    }

    /// Load config, declare the stack and read the recorded state
    pub async fn open(&self) -> anyhow::Result<(StackConfig, Stack, StackState)> {
        let config = self.load_config()?;
        let stack = snowpipe_stack::declare(&config)?;
        let state = self.state_manager().load().await?;
        Ok((config, stack, state))
    }
}

/// Engine over the local providers, seeded with what `state` already holds
pub async fn engine_for(config: &StackConfig, state: &StackState) -> anyhow::Result<Engine> {
    let cloud = LocalCloud::from_state(state);
    let registry = registry_for(&cloud, config);

    for provider in registry.iter() {
        let status = provider.check_auth().await?;
        if !status.authenticated {
            anyhow::bail!(
                "{} is not authenticated: {}",
                provider.display_name(),
                status.error.unwrap_or_default()
            );
        }
        tracing::debug!(
            provider = provider.name(),
            account = status.account_info.as_deref().unwrap_or("-"),
            "Provider ready"
        );
    }

    Ok(Engine::new(registry))
}

fn action_line(action: &Action) -> Option<String> {
    let (symbol, verb) = match action.action_type {
        ActionType::Create => ("+".green(), "create".green()),
        ActionType::Update => ("~".yellow(), "update".yellow()),
        ActionType::Delete => ("-".red(), "delete".red()),
        ActionType::Read => ("=".blue(), "read".blue()),
        ActionType::NoOp => return None,
    };

    let mut line = format!(
        "  {} {} {} ({})",
        symbol,
        verb,
        action.resource_name.cyan(),
        action.resource_type.dimmed()
    );
    if !action.changed.is_empty() {
        let changed: Vec<&str> = action.changed.iter().map(String::as_str).collect();
        line.push_str(&format!(" changed: {}", changed.join(", ")));
    }
    if !action.unknown.is_empty() {
        let unknown: Vec<&str> = action.unknown.iter().map(String::as_str).collect();
        line.push_str(&format!(" {}", format!("known after apply: {}", unknown.join(", ")).dimmed()));
    }
    Some(line)
}

/// Print the planned actions and their summary
pub fn print_plan(plan: &Plan) {
    for line in plan.actions.iter().filter_map(action_line) {
        println!("{}", line);
    }
    if !plan.has_changes {
        println!("{}", "No changes. The stack is up to date.".green());
        return;
    }
    println!();
    println!("Plan: {}", plan.summary());
}

/// Print the outcome of an apply or destroy run
pub fn print_result(result: &ApplyResult) {
    for failure in &result.failed {
        eprintln!(
            "  {} {}: {}",
            "✗".red(),
            failure.action_id,
            failure.error.as_deref().unwrap_or("unknown error")
        );
    }
    for skipped in &result.skipped {
        eprintln!(
            "  {} {}: {}",
            "-".yellow(),
            skipped.action_id,
            skipped.error.as_deref().unwrap_or("skipped")
        );
    }
    println!(
        "{} succeeded, {} failed, {} skipped ({}ms)",
        result.succeeded.len(),
        result.failed.len(),
        result.skipped.len(),
        result.duration_ms
    );
}
