//! Messages posted by the preview shim to its host.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Error details as the browser reports them; any field may be missing or
/// `null` (cross-origin scripts report only "Script error.").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewErrorDetails {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub lineno: Option<u32>,
    #[serde(default)]
    pub colno: Option<u32>,
}

impl PreviewErrorDetails {
    pub fn message(&self) -> &str {
        match self.message.as_deref() {
            Some(message) if !message.is_empty() => message,
            _ => "Unknown error",
        }
    }

    /// Follow-up prompt asking the model to fix this error.
    pub fn fix_request(&self) -> String {
        let mut request = format!(
            "I encountered an error in my code. Can you please fix it? Here are the details:\n\nError message: {}",
            self.message()
        );
        if let Some(filename) = self.filename.as_deref().filter(|f| !f.is_empty()) {
            request.push_str(&format!("\nLocation: {}", filename));
            match (self.lineno, self.colno) {
                (Some(line), Some(column)) => {
                    request.push_str(&format!(" (line {}, column {})", line, column))
                }
                (Some(line), None) => request.push_str(&format!(" (line {})", line)),
                _ => {}
            }
        }
        request.push_str("\n\nPlease provide the corrected code for the relevant file(s).");
        request
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PreviewMessage {
    PreviewError { error: PreviewErrorDetails },
    PreviewLoaded,
}

impl PreviewMessage {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("Failed to parse preview message")
    }

    pub fn error(&self) -> Option<&PreviewErrorDetails> {
        match self {
            PreviewMessage::PreviewError { error } => Some(error),
            PreviewMessage::PreviewLoaded => None,
        }
    }
}
