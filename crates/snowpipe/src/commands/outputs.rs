use crate::utils::Project;
use colored::Colorize;
use serde_json::Value;
use snowpipe_graph::{Resolution, StackState};
use snowpipe_stack::Stack;

pub async fn handle(project: &Project, json: bool) -> anyhow::Result<()> {
    let (_, stack, state) = project.open().await?;

    if json {
        let exports = stack.resolve_exports(&state.output_context());
        let known: serde_json::Map<String, Value> = exports
            .into_iter()
            .filter_map(|(name, value)| match value {
                Resolution::Known(value) => Some((name, value)),
                _ => None,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&known)?);
        return Ok(());
    }

    print_exports(&stack, &state);
    Ok(())
}

/// Print every export with its resolved value
pub fn print_exports(stack: &Stack, state: &StackState) {
    println!("Outputs:");
    for (name, value) in stack.resolve_exports(&state.output_context()) {
        match value {
            Resolution::Known(Value::String(text)) if text.contains('\n') => {
                println!("  {}:", name.cyan());
                for line in text.trim_matches('\n').lines() {
                    println!("    {}", line);
                }
            }
            Resolution::Known(Value::String(text)) => println!("  {}: {}", name.cyan(), text),
            Resolution::Known(other) => println!("  {}: {}", name.cyan(), other),
            Resolution::Pending => {
                println!("  {}: {}", name.cyan(), "(not provisioned yet)".dimmed())
            }
            Resolution::Failed(reason) => {
                println!("  {}: {}", name.cyan(), format!("(error: {})", reason).red())
            }
        }
    }
}
