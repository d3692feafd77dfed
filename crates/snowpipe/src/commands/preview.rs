use crate::utils::{self, Project};
use colored::Colorize;
use snowpipe_graph::Engine;

pub async fn handle(project: &Project) -> anyhow::Result<()> {
    let (_, stack, state) = project.open().await?;

    println!("Previewing stack {}", stack.name().cyan());
    println!();

    let plan = Engine::preview(stack.graph(), &state)?;
    utils::print_plan(&plan);
    Ok(())
}
