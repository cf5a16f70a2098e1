//! Version history: snapshots of the project store taken after each
//! successful generation, with restore and pairwise diff.

mod diff;
mod version;

pub use diff::{diff_lines, diff_stores, ChangeKind, FileChange, LineRun, LineTag, VersionDiff};
pub use version::{approximate_tokens, Version, VersionStore};
