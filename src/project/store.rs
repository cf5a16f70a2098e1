//! In-memory project file store.
//!
//! The store is the single source of truth for the project being built.
//! Files keep their insertion order so listings, prompt serialization and
//! "first remaining file" fallbacks are deterministic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by [`FileStore`] mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("file path must not be empty")]
    EmptyPath,
}

/// Binary metadata attached to a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    /// `data:` URL holding the encoded bytes of a binary file
    pub binary_payload: Option<String>,
}

impl FileMeta {
    pub fn text() -> Self {
        Self::default()
    }

    pub fn binary(data_url: impl Into<String>) -> Self {
        Self {
            binary_payload: Some(data_url.into()),
        }
    }
}

/// A single project file.
///
/// For binary files `content` is a readable placeholder (it is what the model
/// sees) and the real bytes live in `binary_payload` as a data URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub path: String,
    pub content: String,
    pub is_binary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_payload: Option<String>,
}

impl ProjectFile {
    pub fn text(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            is_binary: false,
            binary_payload: None,
        }
    }

    pub fn binary(path: impl Into<String>, mime: &str, data_url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: binary_placeholder(mime),
            is_binary: true,
            binary_payload: Some(data_url.into()),
        }
    }

    /// Final path segment, used for matching references in HTML.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Extension without the dot, or an empty string.
    pub fn extension(&self) -> &str {
        match self.file_name().rsplit_once('.') {
            Some((_, ext)) => ext,
            None => "",
        }
    }
}

pub fn binary_placeholder(mime: &str) -> String {
    format!("[Binary file: {}]", mime)
}

/// Insertion-ordered mapping of path to [`ProjectFile`].
///
/// Not thread-safe; a generation pass owns it through `&mut`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStore {
    files: Vec<ProjectFile>,
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, path: &str) -> Option<usize> {
        self.files.iter().position(|f| f.path == path)
    }

    pub fn get(&self, path: &str) -> Option<&ProjectFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.position(path).is_some()
    }

    /// Create or fully replace the file at `path`.
    ///
    /// Returns `true` if the path was newly created. An existing file keeps
    /// its position in the listing.
    pub fn set(
        &mut self,
        path: &str,
        content: impl Into<String>,
        meta: FileMeta,
    ) -> Result<bool, StoreError> {
        if path.is_empty() {
            return Err(StoreError::EmptyPath);
        }

        let file = ProjectFile {
            path: path.to_string(),
            content: content.into(),
            is_binary: meta.binary_payload.is_some(),
            binary_payload: meta.binary_payload,
        };

        match self.position(path) {
            Some(idx) => {
                self.files[idx] = file;
                Ok(false)
            }
            None => {
                self.files.push(file);
                Ok(true)
            }
        }
    }

    /// Insert a complete file unless the path is already taken.
    ///
    /// Upload semantics: an existing file is never overwritten.
    pub fn insert_if_absent(&mut self, file: ProjectFile) -> Result<bool, StoreError> {
        if file.path.is_empty() {
            return Err(StoreError::EmptyPath);
        }
        if self.contains(&file.path) {
            return Ok(false);
        }
        self.files.push(file);
        Ok(true)
    }

    /// Remove `path`, returning the removed file if it existed.
    pub fn delete(&mut self, path: &str) -> Option<ProjectFile> {
        let idx = self.position(path)?;
        Some(self.files.remove(idx))
    }

    pub fn list(&self) -> &[ProjectFile] {
        &self.files
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.path.as_str())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// True when every file has blank content (also true for an empty store).
    pub fn all_blank(&self) -> bool {
        self.files.iter().all(|f| f.content.trim().is_empty())
    }

    /// Total character count across all file contents.
    pub fn total_chars(&self) -> usize {
        self.files.iter().map(|f| f.content.chars().count()).sum()
    }

    /// Paths containing `query`, case-insensitively, for `@file` completion.
    pub fn suggest(&self, query: &str) -> Vec<&str> {
        let needle = query.to_lowercase();
        self.paths()
            .filter(|p| p.to_lowercase().contains(&needle))
            .collect()
    }

    /// Make this store an exact copy of `other`, ordering included.
    ///
    /// Returns the paths that were dropped because `other` lacks them.
    pub fn replace_with(&mut self, other: &FileStore) -> Vec<String> {
        let dropped = self
            .files
            .iter()
            .filter(|f| !other.contains(&f.path))
            .map(|f| f.path.clone())
            .collect();
        self.files = other.files.clone();
        dropped
    }
}
