use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use sitecraft::config::{
    API_KEY_ENV, API_URL_ENV, DEFAULT_API_URL, DEFAULT_MODEL, DEFAULT_REFERER,
    DEFAULT_TIMEOUT_SECS, MODEL_ENV, REFERER_ENV, TIMEOUT_ENV,
};
use sitecraft::GeneratorConfig;

/// sitecraft - build websites by describing them
#[derive(Parser)]
#[command(name = "sitecraft")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub generator: GeneratorArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Relay settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GeneratorArgs {
    /// Generate endpoint of the completion relay
    #[arg(long, env = API_URL_ENV, default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// Bearer token sent to the relay
    #[arg(long, env = API_KEY_ENV, hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Model identifier
    #[arg(short = 'm', long, env = MODEL_ENV, default_value = DEFAULT_MODEL, global = true)]
    pub model: String,

    /// Referer forwarded to the model provider
    #[arg(long, env = REFERER_ENV, default_value = DEFAULT_REFERER, global = true)]
    pub referer: String,

    /// Whole-request timeout in seconds
    #[arg(long, env = TIMEOUT_ENV, default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    pub timeout_secs: u64,
}

impl GeneratorArgs {
    /// Model identifier as recorded on versions; needs no relay settings.
    pub fn model(&self) -> &str {
        self.model.trim()
    }

    pub fn to_config(&self) -> Result<GeneratorConfig> {
        GeneratorConfig::new(
            &self.api_url,
            self.api_key.clone(),
            &self.model,
            &self.referer,
            self.timeout_secs,
        )
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive build session: each line is a prompt, `:help` lists commands
    Chat {
        /// Directory to import as the starting project
        #[arg(short, long)]
        project: Option<PathBuf>,
    },
    /// Replay a saved model response against a project, offline
    Apply {
        /// File holding the raw response text
        #[arg(short, long)]
        response: PathBuf,

        /// Directory to import as the starting project
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// Directory to export the resulting project to
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Prompt recorded with the version
        #[arg(long, default_value = "replayed response")]
        prompt: String,
    },
    /// Compose the preview document for a project directory
    Preview {
        /// Directory to import (defaults to the current directory)
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// Output file, `-` for stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Open the written preview in the browser
        #[arg(long)]
        open: bool,
    },
}
