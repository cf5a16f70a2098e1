use anyhow::{Context, Result};
use std::path::PathBuf;

use super::load_project;
use crate::cli::{is_stdout, project_dir_or_current, DEFAULT_PREVIEW_FILE};

/// Compose the preview document for a project directory.
pub async fn run_preview(
    project: Option<PathBuf>,
    out: Option<PathBuf>,
    open_browser: bool,
) -> Result<()> {
    let root_path = project_dir_or_current(project)?;
    let ctx = load_project(Some(&root_path)).await?;
    let document = ctx.preview();

    let out = out.unwrap_or_else(|| PathBuf::from(DEFAULT_PREVIEW_FILE));
    if is_stdout(&out) {
        print!("{}", document);
        return Ok(());
    }

    tokio::fs::write(&out, &document)
        .await
        .with_context(|| format!("Failed to write preview to {}", out.display()))?;

    // Format size
    let size_str = if document.len() >= 1024 {
        format!("{:.1} KB", document.len() as f64 / 1024.0)
    } else {
        format!("{} bytes", document.len())
    };
    println!("🖼  Preview written to {} ({})", out.display(), size_str);

    if open_browser {
        println!("🌐 Opening preview in your browser...");
        if open::that(&out).is_err() {
            println!("⚠️  Could not open browser automatically.");
        }
    }

    Ok(())
}
