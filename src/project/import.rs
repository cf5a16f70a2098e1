//! Importing files from disk into the project store.
//!
//! Text-like files are stored as text when their bytes are valid UTF-8.
//! Everything else is stored as a binary file: a readable placeholder as
//! content plus a base64 `data:` URL so the preview can still reference it
//! and export can write the original bytes back.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::store::{FileStore, ProjectFile};

/// Files larger than this are skipped.
pub const MAX_IMPORT_FILE_SIZE: u64 = 8 * 1024 * 1024;

/// Summary of an import batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub added: Vec<String>,
    /// Paths already present in the store (never overwritten)
    pub existing: Vec<String>,
    pub too_large: Vec<String>,
}

/// Guess a MIME type from the file extension.
pub fn guess_mime(path: &str) -> Option<&'static str> {
    let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "xml" => "text/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "wasm" => "application/wasm",
        _ => return None,
    };
    Some(mime)
}

/// Whether a file with this MIME type is tried as text.
///
/// Unknown types are tried as text; the bytes still decide.
pub fn is_text_mime(mime: Option<&str>) -> bool {
    match mime {
        None => true,
        Some(m) => {
            m.starts_with("text/") || m == "application/javascript" || m == "application/json"
        }
    }
}

pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Build a [`ProjectFile`] for `path` from raw bytes.
pub fn file_from_bytes(path: &str, bytes: &[u8]) -> ProjectFile {
    let mime = guess_mime(path);
    if is_text_mime(mime) {
        match String::from_utf8(bytes.to_vec()) {
            Ok(content) => return ProjectFile::text(path, content),
            Err(_) => debug!("{} is not valid UTF-8, keeping it as binary", path),
        }
    }

    let mime = mime.unwrap_or("application/octet-stream");
    ProjectFile::binary(path, mime, to_data_url(mime, bytes))
}

fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn collect_files(root: &Path) -> Vec<PathBuf> {
    let mut builder = WalkBuilder::new(root);
    builder.standard_filters(true);
    builder.follow_links(false);

    let mut files = Vec::new();
    for entry in builder.build() {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_some_and(|t| t.is_file()) {
                    files.push(entry.into_path());
                }
            }
            Err(e) => warn!("Skipping unreadable entry: {}", e),
        }
    }
    files.sort();
    files
}

/// Import every file under `root` that `.gitignore` rules allow.
///
/// A read failure aborts the batch; files inserted before it stay.
pub async fn import_directory(store: &mut FileStore, root: &Path) -> Result<ImportReport> {
    if !root.is_dir() {
        anyhow::bail!("Project directory does not exist: {}", root.display());
    }

    let mut report = ImportReport::default();

    for path in collect_files(root) {
        let Some(key) = relative_key(root, &path) else {
            continue;
        };

        if store.contains(&key) {
            report.existing.push(key);
            continue;
        }

        let size = tokio::fs::metadata(&path)
            .await
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();
        if size > MAX_IMPORT_FILE_SIZE {
            warn!("Skipping {} ({} bytes, too large)", key, size);
            report.too_large.push(key);
            continue;
        }

        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file = file_from_bytes(&key, &bytes);
        debug!("Imported {} (binary: {})", key, file.is_binary);

        if store.insert_if_absent(file)? {
            report.added.push(key);
        }
    }

    info!(
        "Imported {} file(s) from {} ({} already present)",
        report.added.len(),
        root.display(),
        report.existing.len()
    );
    Ok(report)
}
