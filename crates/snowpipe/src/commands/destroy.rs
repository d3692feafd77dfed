use crate::utils::{self, Project};
use colored::Colorize;

pub async fn handle(project: &Project, yes: bool) -> anyhow::Result<()> {
    let (config, stack, mut state) = project.open().await?;

    let doomed: Vec<String> = state
        .deletion_order()
        .into_iter()
        .filter(|name| state.get_resource(name).is_some_and(|r| !r.data_source))
        .collect();
    if doomed.is_empty() {
        println!("Nothing to destroy in stack {}", stack.name().cyan());
        return Ok(());
    }

    println!("Stack: {}", stack.name().cyan());
    println!();
    for name in &doomed {
        if let Some(resource) = state.get_resource(name) {
            println!(
                "  {} {} {} ({})",
                "-".red(),
                "delete".red(),
                name.cyan(),
                resource.resource_type.dimmed()
            );
        }
    }

    if !yes {
        println!();
        println!(
            "{}",
            "Warning: this deletes the bucket, the database and everything in them.".yellow()
        );
        println!("Re-run with --yes to destroy the stack");
        return Ok(());
    }

    println!();
    println!("{}", "Destroying...".blue());
    let engine = utils::engine_for(&config, &state).await?;
    let result = engine.destroy(&mut state).await?;
    project.state_manager().save(&state).await?;

    utils::print_result(&result);
    if !result.is_success() {
        anyhow::bail!("{} resource(s) could not be deleted", result.failed.len());
    }

    println!("{}", "✓ Stack destroyed".green().bold());
    Ok(())
}
