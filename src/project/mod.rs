//! Project file management.
//!
//! This module owns the in-memory file store and everything that mutates it
//! from outside a version restore:
//! - applying code fences from a finished model response
//! - importing files from disk (the upload path)
//! - exporting the store back to disk

mod apply;
mod export;
mod import;
mod store;
#[cfg(test)]
mod tests;

// Re-exports
pub use apply::{
    apply_code_blocks, resolve_target_path, ApplyOutcome, DEFAULT_ENTRY_FILE, DELETE_SENTINEL,
};
pub use export::{decode_data_url, export_directory, ExportReport};
pub use import::{file_from_bytes, guess_mime, import_directory, to_data_url, ImportReport};
pub use store::{binary_placeholder, FileMeta, FileStore, ProjectFile, StoreError};
