use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use sitecraft::stream::BlockRenderer;
use sitecraft::{run_generation, CancelToken, GenerationError, ScriptedTokens};

use super::report::print_generation;
use super::{export_project, load_project};
use crate::cli::resolve_project_dir;

/// Characters per replayed token; small enough to exercise incremental parsing.
const REPLAY_CHUNK_CHARS: usize = 16;

/// Replay a saved response through the generation pipeline without a relay.
pub async fn run_apply(
    response: PathBuf,
    project: Option<PathBuf>,
    out: Option<PathBuf>,
    prompt: String,
    model: &str,
) -> Result<()> {
    let text = tokio::fs::read_to_string(&response)
        .await
        .with_context(|| format!("Failed to read response file: {}", response.display()))?;

    let project = resolve_project_dir(project)?;
    let mut ctx = load_project(project.as_deref()).await?;
    let mut renderer = BlockRenderer::new();
    let mut source = ScriptedTokens::from_response(&text, REPLAY_CHUNK_CHARS);
    let mut cancel = CancelToken::never();

    info!("Replaying {} ({} chars)", response.display(), text.len());
    let report = match run_generation(
        &mut ctx,
        &mut renderer,
        &mut source,
        &prompt,
        model,
        &mut cancel,
        |_| {},
    )
    .await
    {
        Ok(report) => report,
        Err(GenerationError::EmptyResponse) => {
            anyhow::bail!("Response file is empty: {}", response.display())
        }
        Err(e) => return Err(e.into()),
    };

    print_generation(&report, &renderer);

    match out {
        Some(dir) => export_project(&ctx.files, &dir).await?,
        None => {
            println!("\nFiles:");
            for path in ctx.files.paths() {
                println!("  {}", path);
            }
            println!("\nUse --out DIR to write the project.");
        }
    }

    Ok(())
}
