use crate::utils::Project;
use colored::Colorize;

pub fn handle(project: &Project) -> anyhow::Result<()> {
    println!("{}", "Validating stack...".blue());

    let config = match project.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ Config error".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    match snowpipe_stack::declare(&config) {
        Ok(stack) => {
            println!("{}", "✓ Stack is valid".green().bold());
            println!();
            println!("Stack: {}", stack.name().cyan());
            println!("  Resources: {}", stack.graph().len());
            for level in stack.graph().levels()? {
                for name in level {
                    if let Some(decl) = stack.graph().get(&name) {
                        println!("    - {} ({})", name.cyan(), decl.resource_type());
                    }
                }
            }
            println!("  Exports: {}", stack.exports().len());
            for name in stack.exports().keys() {
                println!("    - {}", name.cyan());
            }
        }
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ Stack declaration error".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
