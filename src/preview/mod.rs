//! Preview document composition and the shim's message channel.

mod compose;
mod message;

pub use compose::{compose_preview, MISSING_ENTRY_DOCUMENT, PREVIEW_SHIM};
pub use message::{PreviewErrorDetails, PreviewMessage};
