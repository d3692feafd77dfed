use crate::commands::outputs;
use crate::utils::{self, Project};
use colored::Colorize;
use snowpipe_graph::Engine;

pub async fn handle(project: &Project, yes: bool) -> anyhow::Result<()> {
    let (config, stack, mut state) = project.open().await?;

    println!("Stack: {}", stack.name().cyan());
    println!();

    let plan = Engine::preview(stack.graph(), &state)?;
    utils::print_plan(&plan);
    if !plan.has_changes {
        return Ok(());
    }

    if !yes {
        println!();
        println!("Re-run with --yes to apply these changes");
        return Ok(());
    }

    println!();
    println!("{}", "Applying...".blue());
    let engine = utils::engine_for(&config, &state).await?;
    let result = engine.up(stack.graph(), &mut state).await?;

    // Partial progress is recorded too
    let manager = project.state_manager();
    manager.save(&state).await?;
    tracing::debug!(path = %manager.state_path().display(), "Saved state");

    utils::print_result(&result);
    if !result.is_success() {
        anyhow::bail!("{} resource(s) failed to provision", result.failed.len());
    }

    println!("{}", "✓ Stack is up".green().bold());
    println!();
    outputs::print_exports(&stack, &state);
    Ok(())
}
