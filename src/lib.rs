//! sitecraft: build small websites from natural-language prompts.
//!
//! A completion relay streams back fenced code blocks. They are parsed and
//! reconciled incrementally while streaming, applied to an in-memory project
//! once the stream completes, and each successful pass is recorded as a
//! restorable, diffable version. The project can be composed into a single
//! self-contained preview document.

pub mod api;
pub mod config;
pub mod error;
pub mod generation;
pub mod history;
pub mod preview;
pub mod project;
pub mod stream;

pub use config::GeneratorConfig;
pub use error::GenerationError;
pub use generation::{
    cancel_pair, finish_generation, generate, run_generation, CancelHandle, CancelToken,
    GenerationReport, ProjectContext, Progress, ScriptedTokens, TokenSource,
};
