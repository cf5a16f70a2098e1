//! Applies finished code fences from a model response to the file store.
//!
//! Each fence label names its target file. Fences labelled with a bare
//! language hint (`html`, `javascript`) are not files and are skipped, as are
//! fences whose label yields no path at all. Malformed output means fewer
//! files change, never an error.

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

use super::store::{FileMeta, FileStore};

/// Fence body that requests removal of the target path.
pub const DELETE_SENTINEL: &str = "DELETE_FILE";

/// File created when a pass would otherwise leave nothing open.
pub const DEFAULT_ENTRY_FILE: &str = "index.html";

static CLOSED_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```([^\n`]*)\n(.*?)```").expect("valid closed fence regex")
});

static FILEPATH_DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"filepath=(\S+)").expect("valid filepath directive regex"));

/// What a single application pass did to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
    /// `DELETE_FILE` requests for paths that did not exist
    pub missing_deletes: Vec<String>,
    /// Fence labels that did not resolve to a path
    pub skipped: Vec<String>,
    /// New open path, when the previous one was deleted
    pub reopened: Option<String>,
}

impl ApplyOutcome {
    /// Whether any file was created, updated or deleted.
    pub fn changed(&self) -> bool {
        !self.created.is_empty() || !self.updated.is_empty() || !self.deleted.is_empty()
    }
}

fn push_unique(list: &mut Vec<String>, path: &str) {
    if !list.iter().any(|p| p == path) {
        list.push(path.to_string());
    }
}

/// Resolve the target path from a fence label.
///
/// A `filepath=<path>` directive wins. Otherwise the first token is used, but
/// only if it looks like a file (contains `.` or `/`).
pub fn resolve_target_path(label: &str) -> Option<String> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }

    if let Some(path) = FILEPATH_DIRECTIVE_RE
        .captures(label)
        .and_then(|caps| caps.get(1))
    {
        return Some(path.as_str().to_string());
    }

    let token = label.split_whitespace().next()?;
    if !token.contains('.') && !token.contains('/') {
        return None;
    }
    Some(token.to_string())
}

/// Apply every closed fence in `text` to `store`.
///
/// `open_path` is the file currently shown in the editor; it is reassigned
/// when this pass deletes it.
pub fn apply_code_blocks(
    store: &mut FileStore,
    open_path: &mut Option<String>,
    text: &str,
) -> ApplyOutcome {
    let mut outcome = ApplyOutcome::default();

    for caps in CLOSED_FENCE_RE.captures_iter(text) {
        let label = caps.get(1).map_or("", |m| m.as_str());
        let body = caps.get(2).map_or("", |m| m.as_str()).trim();

        let Some(path) = resolve_target_path(label) else {
            debug!("Skipping fence without a file path: {:?}", label.trim());
            outcome.skipped.push(label.trim().to_string());
            continue;
        };

        if body == DELETE_SENTINEL {
            if store.delete(&path).is_some() {
                debug!("Deleted {}", path);
                outcome.created.retain(|p| p != &path);
                outcome.updated.retain(|p| p != &path);
                push_unique(&mut outcome.deleted, &path);
            } else {
                debug!("Delete requested for missing file {}", path);
                push_unique(&mut outcome.missing_deletes, &path);
            }
            continue;
        }

        match store.set(&path, body, FileMeta::text()) {
            Ok(true) => {
                debug!("Created {} ({} chars)", path, body.len());
                outcome.deleted.retain(|p| p != &path);
                push_unique(&mut outcome.created, &path);
            }
            Ok(false) => {
                debug!("Replaced {} ({} chars)", path, body.len());
                if !outcome.created.contains(&path) {
                    push_unique(&mut outcome.updated, &path);
                }
            }
            Err(e) => {
                debug!("Skipping fence {:?}: {}", label.trim(), e);
                outcome.skipped.push(label.trim().to_string());
            }
        }
    }

    if !outcome.deleted.is_empty() {
        settle_open_path(store, open_path, &mut outcome);
    }

    if outcome.changed() {
        info!(
            "Applied response: {} created, {} updated, {} deleted, {} skipped",
            outcome.created.len(),
            outcome.updated.len(),
            outcome.deleted.len(),
            outcome.skipped.len()
        );
    }

    outcome
}

/// Keep the open path valid and the store non-empty after deletions.
fn settle_open_path(
    store: &mut FileStore,
    open_path: &mut Option<String>,
    outcome: &mut ApplyOutcome,
) {
    if store.is_empty() {
        // Cannot fail: the path is a non-empty constant.
        let _ = store.set(DEFAULT_ENTRY_FILE, "", FileMeta::text());
        *open_path = Some(DEFAULT_ENTRY_FILE.to_string());
        outcome.reopened = open_path.clone();
        return;
    }

    let open_was_deleted = open_path
        .as_deref()
        .is_some_and(|p| outcome.deleted.iter().any(|d| d == p));
    if open_was_deleted {
        *open_path = store.paths().next().map(str::to_string);
        outcome.reopened = open_path.clone();
    }
}
