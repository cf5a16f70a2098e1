//! Version-to-version diffs.
//!
//! File-level classification compares two snapshots path by path. Inside a
//! modified file a line-oriented Myers diff produces runs of added, removed
//! and unchanged text.

use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::time::Duration;

use super::version::VersionStore;
use crate::project::FileStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
    Unchanged,
}

impl ChangeKind {
    pub fn marker(&self) -> char {
        match self {
            ChangeKind::Added => '+',
            ChangeKind::Deleted => '-',
            ChangeKind::Modified => '±',
            ChangeKind::Unchanged => ' ',
        }
    }
}

/// One path's change between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: String,
    pub kind: ChangeKind,
    pub previous: Option<String>,
    pub current: Option<String>,
}

impl FileChange {
    /// Line runs turning the previous content into the current content.
    ///
    /// A missing side counts as empty.
    pub fn line_diff(&self) -> Vec<LineRun> {
        diff_lines(
            self.previous.as_deref().unwrap_or(""),
            self.current.as_deref().unwrap_or(""),
        )
    }
}

/// Diff of one version against its predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionDiff {
    pub index: usize,
    pub has_previous: bool,
    pub changes: Vec<FileChange>,
}

impl VersionDiff {
    pub fn get(&self, path: &str) -> Option<&FileChange> {
        self.changes.iter().find(|c| c.path == path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTag {
    Added,
    Removed,
    Unchanged,
}

impl LineTag {
    pub fn prefix(&self) -> char {
        match self {
            LineTag::Added => '+',
            LineTag::Removed => '-',
            LineTag::Unchanged => ' ',
        }
    }
}

/// Consecutive lines sharing a tag; `text` keeps the line terminators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineRun {
    pub tag: LineTag,
    pub text: String,
}

/// Classify every path of `previous` and `current`.
///
/// Paths come in current order, followed by paths only `previous` has.
/// Unchanged paths are listed only when there is no previous snapshot.
pub fn diff_stores(previous: Option<&FileStore>, current: &FileStore) -> Vec<FileChange> {
    let empty = FileStore::new();
    let prev = previous.unwrap_or(&empty);
    let mut changes = Vec::new();

    for file in current.list() {
        let kind = match prev.get(&file.path) {
            None => ChangeKind::Added,
            Some(old) if old.content != file.content => ChangeKind::Modified,
            Some(_) => ChangeKind::Unchanged,
        };
        if kind == ChangeKind::Unchanged && previous.is_some() {
            continue;
        }
        changes.push(FileChange {
            path: file.path.clone(),
            kind,
            previous: prev.get(&file.path).map(|f| f.content.clone()),
            current: Some(file.content.clone()),
        });
    }

    for old in prev.list() {
        if !current.contains(&old.path) {
            changes.push(FileChange {
                path: old.path.clone(),
                kind: ChangeKind::Deleted,
                previous: Some(old.content.clone()),
                current: None,
            });
        }
    }

    changes
}

fn push_run(runs: &mut Vec<LineRun>, tag: LineTag, line: &str) {
    match runs.last_mut() {
        Some(run) if run.tag == tag => run.text.push_str(line),
        _ => runs.push(LineRun {
            tag,
            text: line.to_string(),
        }),
    }
}

/// Pathological inputs fall back to a coarser diff after this long.
const LINE_DIFF_TIMEOUT: Duration = Duration::from_secs(1);

/// Line-level diff of `old` against `new`.
///
/// Within a changed region removed lines come before added ones.
pub fn diff_lines(old: &str, new: &str) -> Vec<LineRun> {
    let diff = TextDiff::configure()
        .timeout(LINE_DIFF_TIMEOUT)
        .diff_lines(old, new);

    let mut runs = Vec::new();
    for change in diff.iter_all_changes() {
        let tag = match change.tag() {
            ChangeTag::Equal => LineTag::Unchanged,
            ChangeTag::Delete => LineTag::Removed,
            ChangeTag::Insert => LineTag::Added,
        };
        push_run(&mut runs, tag, change.value());
    }
    runs
}

impl VersionStore {
    /// Diff version `index` against `index - 1` (an empty store for the first).
    pub fn diff(&self, index: usize) -> Option<VersionDiff> {
        let current = self.get(index)?;
        let previous = index
            .checked_sub(1)
            .and_then(|prev| self.get(prev))
            .map(|v| &v.files);

        Some(VersionDiff {
            index,
            has_previous: previous.is_some(),
            changes: diff_stores(previous, &current.files),
        })
    }
}
