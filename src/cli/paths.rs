use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Default file name for a written preview.
pub const DEFAULT_PREVIEW_FILE: &str = "preview.html";

/// Resolve a project directory argument, checking it exists.
pub fn resolve_project_dir(project: Option<PathBuf>) -> Result<Option<PathBuf>> {
    let Some(path) = project else {
        return Ok(None);
    };
    let resolved = path
        .canonicalize()
        .with_context(|| format!("Failed to canonicalize project directory: {}", path.display()))?;
    if !resolved.is_dir() {
        bail!("Project path is not a directory: {}", resolved.display());
    }
    Ok(Some(resolved))
}

/// Project directory for commands that default to the current directory.
pub fn project_dir_or_current(project: Option<PathBuf>) -> Result<PathBuf> {
    match resolve_project_dir(project)? {
        Some(path) => Ok(path),
        None => std::env::current_dir().context("Failed to get current directory"),
    }
}

/// Where an interactive `:open` writes its preview.
pub fn scratch_preview_path() -> PathBuf {
    std::env::temp_dir().join(format!("sitecraft-{}", DEFAULT_PREVIEW_FILE))
}

/// Whether an output argument means stdout.
pub fn is_stdout(path: &Path) -> bool {
    path.as_os_str() == "-"
}
