mod commands;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "snowpipe")]
#[command(about = "Land files in S3, load them into Snowflake.", long_about = None)]
struct Cli {
    /// Directory holding the stack state (.snowpipe/state.json)
    #[arg(short = 'C', long, global = true, env = "SNOWPIPE_PROJECT_DIR", default_value = ".")]
    project_dir: PathBuf,

    /// Stack config file (skips the config search)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the config and the declared resource graph
    Validate,
    /// Show what `up` would change
    Preview,
    /// Provision the stack
    Up {
        /// Apply without stopping at the plan
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete every provisioned resource
    Destroy {
        /// Delete without stopping at the plan
        #[arg(short, long)]
        yes: bool,
    },
    /// Print the stack exports
    Outputs {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries command output, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if matches!(cli.command, Commands::Version) {
        println!("snowpipe {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let project = utils::Project::new(cli.project_dir, cli.config);

    match cli.command {
        Commands::Validate => commands::validate::handle(&project)?,
        Commands::Preview => commands::preview::handle(&project).await?,
        Commands::Up { yes } => commands::up::handle(&project, yes).await?,
        Commands::Destroy { yes } => commands::destroy::handle(&project, yes).await?,
        Commands::Outputs { json } => commands::outputs::handle(&project, json).await?,
        Commands::Version => unreachable!("Version is handled before loading the project"),
    }

    Ok(())
}
