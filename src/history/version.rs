//! Append-only version history over the project store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::project::FileStore;

/// Approximate token count: one token per four characters, rounded up.
///
/// Deliberately not a real tokenizer; version listings compare against
/// earlier counts computed the same way.
pub fn approximate_tokens(store: &FileStore) -> u64 {
    (store.total_chars() as u64).div_ceil(4)
}

/// Immutable snapshot of the project taken after a successful generation.
#[derive(Debug, Clone, Serialize)]
pub struct Version {
    pub files: FileStore,
    pub prompt: String,
    pub summary: String,
    pub model: String,
    pub token_count: u64,
    /// Difference to the previous latest version (own count for the first)
    pub token_delta: i64,
    pub created_at: DateTime<Utc>,
}

impl Version {
    /// Model id without its provider prefix (`vendor/model` -> `model`).
    pub fn model_short_name(&self) -> &str {
        match self.model.split_once('/') {
            Some((_, rest)) if !rest.is_empty() => rest,
            _ => &self.model,
        }
    }

    /// Signed delta formatted for listings, e.g. `+12` or `-3`.
    pub fn token_delta_label(&self) -> String {
        if self.token_delta >= 0 {
            format!("+{}", self.token_delta)
        } else {
            format!("-{}", self.token_delta.unsigned_abs())
        }
    }
}

/// Ordered version history plus the index of the version on display.
///
/// `current` is `None` while the live store has not been committed or
/// restored yet. Indices never change once assigned.
#[derive(Debug, Clone, Default)]
pub struct VersionStore {
    versions: Vec<Version>,
    current: Option<usize>,
}

impl VersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Version> {
        self.versions.get(index)
    }

    pub fn latest(&self) -> Option<&Version> {
        self.versions.last()
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Version> {
        self.versions.iter()
    }

    /// Snapshot `files` as a new version and make it current.
    ///
    /// Returns the new version's index.
    pub fn commit(
        &mut self,
        files: &FileStore,
        prompt: impl Into<String>,
        summary: impl Into<String>,
        model: impl Into<String>,
    ) -> usize {
        let token_count = approximate_tokens(files);
        let previous = self.latest().map_or(0, |v| v.token_count);
        let token_delta = token_count as i64 - previous as i64;

        self.versions.push(Version {
            files: files.clone(),
            prompt: prompt.into(),
            summary: summary.into(),
            model: model.into(),
            token_count,
            token_delta,
            created_at: Utc::now(),
        });

        let index = self.versions.len() - 1;
        self.current = Some(index);
        info!(
            "Committed version {} ({} files, {} tokens, {})",
            index + 1,
            files.len(),
            token_count,
            self.versions[index].token_delta_label()
        );
        index
    }

    /// Make `live` an exact copy of version `index`.
    ///
    /// Out-of-range indices are ignored and leave everything untouched.
    /// Returns whether a restore happened.
    pub fn restore(&mut self, index: usize, live: &mut FileStore) -> bool {
        let Some(version) = self.versions.get(index) else {
            debug!("Ignoring restore of unknown version index {}", index);
            return false;
        };

        let dropped = live.replace_with(&version.files);
        self.current = Some(index);
        info!(
            "Restored version {} ({} files, {} dropped)",
            index + 1,
            version.files.len(),
            dropped.len()
        );
        true
    }
}
