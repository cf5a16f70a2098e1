mod apply;
mod chat;
mod preview;
mod report;

pub use apply::run_apply;
pub use chat::run_chat;
pub use preview::run_preview;

use anyhow::Result;
use std::path::Path;

use sitecraft::project::{export_directory, import_directory, FileStore};
use sitecraft::ProjectContext;

/// Build a project context, importing `dir` when given.
async fn load_project(dir: Option<&Path>) -> Result<ProjectContext> {
    let mut files = FileStore::new();
    if let Some(dir) = dir {
        import_directory(&mut files, dir).await?;
    }
    Ok(ProjectContext::with_files(files))
}

async fn export_project(files: &FileStore, out_dir: &Path) -> Result<()> {
    let exported = export_directory(files, out_dir).await?;
    println!(
        "📦 Exported {} file(s) to {}",
        exported.written.len(),
        out_dir.display()
    );
    for path in &exported.unsafe_paths {
        println!("⚠️  Skipped unsafe path: {}", path);
    }
    Ok(())
}
