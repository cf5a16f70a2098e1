use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;
mod command;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging: --verbose wins, then RUST_LOG, then info
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Chat { project }) => {
            command::run_chat(cli.generator.to_config()?, project).await?;
        }
        Some(Commands::Apply {
            response,
            project,
            out,
            prompt,
        }) => {
            command::run_apply(response, project, out, prompt, cli.generator.model()).await?;
        }
        Some(Commands::Preview { project, out, open }) => {
            command::run_preview(project, out, open).await?;
        }
        None => {
            // No command specified, show help
            eprintln!("No command specified. Use --help for usage information.");
            eprintln!("Use 'sitecraft chat' to start building a site.");
        }
    }

    Ok(())
}
