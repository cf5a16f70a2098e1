//! Writing the project store out to a directory.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

use super::store::{FileStore, ProjectFile};

/// Summary of an export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub written: Vec<String>,
    /// Paths that would land outside the target directory
    pub unsafe_paths: Vec<String>,
}

/// Decode the payload of a `data:` URL.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .context("Binary payload is not a data URL")?;
    let (header, payload) = rest
        .split_once(',')
        .context("Data URL has no payload separator")?;

    if header.ends_with(";base64") {
        STANDARD
            .decode(payload.trim())
            .context("Failed to decode base64 payload")
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

/// Join `path` under `root`, refusing absolute paths and parent components.
fn safe_join(root: &Path, path: &str) -> Option<PathBuf> {
    let rel = Path::new(path);
    let clean = rel.components().all(|c| matches!(c, Component::Normal(_)));
    if !clean || rel.as_os_str().is_empty() {
        return None;
    }
    Some(root.join(rel))
}

fn file_bytes(file: &ProjectFile) -> Result<Vec<u8>> {
    match (&file.binary_payload, file.is_binary) {
        (Some(url), true) => decode_data_url(url)
            .with_context(|| format!("Failed to decode binary file {}", file.path)),
        _ => Ok(file.content.as_bytes().to_vec()),
    }
}

/// Write every file of `store` under `out_dir`.
pub async fn export_directory(store: &FileStore, out_dir: &Path) -> Result<ExportReport> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create directory {}", out_dir.display()))?;

    let mut report = ExportReport::default();

    for file in store.list() {
        let Some(target) = safe_join(out_dir, &file.path) else {
            warn!("Refusing to export {}: path escapes the target", file.path);
            report.unsafe_paths.push(file.path.clone());
            continue;
        };

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let bytes = file_bytes(file)?;
        tokio::fs::write(&target, bytes)
            .await
            .with_context(|| format!("Failed to write {}", target.display()))?;
        report.written.push(file.path.clone());
    }

    info!(
        "Exported {} file(s) to {}",
        report.written.len(),
        out_dir.display()
    );
    Ok(report)
}
