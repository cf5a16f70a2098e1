//! Terminal output shared by the commands.

use sitecraft::history::{ChangeKind, VersionDiff, VersionStore};
use sitecraft::stream::{BlockKind, BlockRenderer, NodeStatus};
use sitecraft::GenerationReport;

const PROMPT_PREVIEW_CHARS: usize = 48;

fn truncate(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() <= max_chars && !text.contains('\n') {
        return line.to_string();
    }
    let cut: String = line.chars().take(max_chars).collect();
    format!("{}…", cut)
}

/// One line per code node with its status glyph.
pub fn format_code_nodes(renderer: &BlockRenderer) -> Vec<String> {
    renderer
        .nodes()
        .iter()
        .enumerate()
        .filter(|(_, node)| node.kind == BlockKind::Code)
        .map(|(i, node)| {
            let glyph = node.status.as_ref().map_or(" ", NodeStatus::glyph);
            let name = node.file_name.as_deref().unwrap_or_default();
            let mut line = format!(
                "  {} [{}] {} ({} lines)",
                glyph,
                i,
                name,
                node.content.lines().count()
            );
            if let Some(NodeStatus::Failed { reason }) = &node.status {
                line.push_str(&format!(" - {}", reason));
            }
            line
        })
        .collect()
}

pub fn print_generation(report: &GenerationReport, renderer: &BlockRenderer) {
    println!();
    for line in format_code_nodes(renderer) {
        println!("{}", line);
    }
    if !report.summary.is_empty() {
        println!("\n📝 {}", report.summary);
    }

    let outcome = &report.outcome;
    match report.version {
        Some(index) => println!(
            "✅ Version {}: {} created, {} updated, {} deleted",
            index + 1,
            outcome.created.len(),
            outcome.updated.len(),
            outcome.deleted.len()
        ),
        None => println!("⚠️  No files changed"),
    }
    if let Some(path) = &outcome.reopened {
        println!("   Now editing {}", path);
    }
}

/// Version listing, newest last, current marked with `*`.
pub fn format_versions(versions: &VersionStore) -> Vec<String> {
    versions
        .iter()
        .enumerate()
        .map(|(i, version)| {
            let marker = if versions.current() == Some(i) { '*' } else { ' ' };
            format!(
                "{} v{:<3} {}  {:<20} {:>6} tokens ({})  {}",
                marker,
                i + 1,
                version.created_at.format("%H:%M:%S"),
                version.model_short_name(),
                version.token_count,
                version.token_delta_label(),
                truncate(&version.prompt, PROMPT_PREVIEW_CHARS)
            )
        })
        .collect()
}

pub fn format_diff(diff: &VersionDiff) -> Vec<String> {
    let mut lines = Vec::new();
    if diff.changes.is_empty() {
        lines.push("No changes.".to_string());
        return lines;
    }
    for change in &diff.changes {
        lines.push(format!("{} {}", change.kind.marker(), change.path));
        if change.kind == ChangeKind::Unchanged {
            continue;
        }
        for run in change.line_diff() {
            for text in run.text.lines() {
                lines.push(format!("    {}{}", run.tag.prefix(), text));
            }
        }
    }
    lines
}
