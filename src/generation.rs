//! The generation pipeline.
//!
//! One pass streams tokens from a [`TokenSource`] into a growing response
//! buffer, re-parses the whole buffer after every token and reconciles the
//! renderer with the result. When the stream ends the task summary is split
//! off, the remaining text is applied to the project and, if anything
//! changed, a version is committed.
//!
//! Nothing touches the project until the stream has finished. A transport
//! failure or a cancellation leaves the store and history exactly as they
//! were, with the rendered nodes kept as last drawn.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{build_messages, CompletionClient, TokenStream};
use crate::error::GenerationError;
use crate::history::VersionStore;
use crate::preview::compose_preview;
use crate::project::{apply_code_blocks, ApplyOutcome, FileStore, DEFAULT_ENTRY_FILE};
use crate::stream::{parse_blocks, split_summary, BlockRenderer, NodeStatus, RenderOp};

/// Explanation attached to code nodes when a pass changed no file.
pub const NOT_APPLIED_REASON: &str =
    "Code not applied. The AI did not provide a valid filename for this block (e.g., 'index.html').";

// ============================================================================
// Project context
// ============================================================================

/// Everything one project owns: files, history and the open file.
#[derive(Debug, Clone, Default)]
pub struct ProjectContext {
    pub files: FileStore,
    pub versions: VersionStore,
    pub open_path: Option<String>,
}

impl ProjectContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing store, opening the entry file when present.
    pub fn with_files(files: FileStore) -> Self {
        let open_path = if files.contains(DEFAULT_ENTRY_FILE) {
            Some(DEFAULT_ENTRY_FILE.to_string())
        } else {
            files.paths().next().map(str::to_string)
        };
        Self {
            files,
            versions: VersionStore::new(),
            open_path,
        }
    }

    /// Open `path` if it exists.
    pub fn open(&mut self, path: &str) -> bool {
        if !self.files.contains(path) {
            return false;
        }
        self.open_path = Some(path.to_string());
        true
    }

    /// Restore version `index`, keeping the open path valid.
    pub fn restore(&mut self, index: usize) -> bool {
        if !self.versions.restore(index, &mut self.files) {
            return false;
        }
        let still_open = self
            .open_path
            .as_deref()
            .is_some_and(|path| self.files.contains(path));
        if !still_open {
            self.open_path = if self.files.contains(DEFAULT_ENTRY_FILE) {
                Some(DEFAULT_ENTRY_FILE.to_string())
            } else {
                self.files.paths().next().map(str::to_string)
            };
        }
        true
    }

    pub fn preview(&self) -> String {
        compose_preview(&self.files)
    }
}

// ============================================================================
// Token sources
// ============================================================================

/// Anything that yields response tokens in arrival order.
#[async_trait]
pub trait TokenSource: Send {
    /// Next token, or `None` at end of stream.
    async fn next_token(&mut self) -> Result<Option<String>>;
}

#[async_trait]
impl TokenSource for TokenStream {
    async fn next_token(&mut self) -> Result<Option<String>> {
        TokenStream::next_token(self).await
    }
}

/// Replays canned tokens, e.g. a saved response or a test script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTokens {
    tokens: VecDeque<String>,
    failure: Option<String>,
}

impl ScriptedTokens {
    pub fn new<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            failure: None,
        }
    }

    /// Split a full response into tokens of at most `chunk_chars` characters.
    pub fn from_response(response: &str, chunk_chars: usize) -> Self {
        let chunk_chars = chunk_chars.max(1);
        let chars: Vec<char> = response.chars().collect();
        Self::new(chars.chunks(chunk_chars).map(|c| c.iter().collect::<String>()))
    }

    /// Fail with `message` once the scripted tokens run out.
    pub fn failing_with(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }
}

#[async_trait]
impl TokenSource for ScriptedTokens {
    async fn next_token(&mut self) -> Result<Option<String>> {
        if let Some(token) = self.tokens.pop_front() {
            return Ok(Some(token));
        }
        match self.failure.take() {
            Some(message) => Err(anyhow::anyhow!(message)),
            None => Ok(None),
        }
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Owner side of a cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

/// Observer side, checked at every stream read.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelToken { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// A fresh token observing this handle.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Clear the signal so the next pass can run.
    pub fn reset(&self) {
        self.tx.send_replace(false);
    }
}

impl CancelToken {
    /// A token nobody can cancel.
    pub fn never() -> Self {
        let (_, token) = cancel_pair();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested; never resolves if the handle is gone.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Snapshot handed to the progress callback after each token.
pub struct Progress<'a> {
    pub token: &'a str,
    pub ops: &'a [RenderOp],
    pub renderer: &'a BlockRenderer,
}

/// Result of a completed pass.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub response: String,
    pub summary: String,
    pub outcome: ApplyOutcome,
    /// Index of the committed version, when files changed
    pub version: Option<usize>,
}

impl GenerationReport {
    pub fn applied(&self) -> bool {
        self.version.is_some()
    }
}

/// Stream one response through the renderer and apply it on completion.
///
/// The renderer is cleared first: each pass draws a new message.
pub async fn run_generation<S>(
    ctx: &mut ProjectContext,
    renderer: &mut BlockRenderer,
    source: &mut S,
    prompt: &str,
    model: &str,
    cancel: &mut CancelToken,
    mut on_progress: impl FnMut(Progress<'_>),
) -> Result<GenerationReport, GenerationError>
where
    S: TokenSource + ?Sized,
{
    renderer.clear();
    renderer.begin_pass();
    let mut response = String::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Generation cancelled after {} chars", response.len());
                return Err(GenerationError::Cancelled);
            }
            next = source.next_token() => next,
        };

        let Some(token) = next.map_err(|e| {
            warn!("Stream failed after {} chars: {:#}", response.len(), e);
            GenerationError::Transport(e)
        })?
        else {
            break;
        };

        response.push_str(&token);
        let blocks = parse_blocks(&response);
        let ops = renderer.reconcile(&blocks);
        on_progress(Progress {
            token: &token,
            ops: &ops,
            renderer,
        });
    }

    debug!("Stream complete: {} chars", response.len());
    renderer.reconcile(&parse_blocks(&response));
    finish_generation(ctx, renderer, response, prompt, model)
}

/// Apply a completed response and record the outcome on the renderer.
pub fn finish_generation(
    ctx: &mut ProjectContext,
    renderer: &mut BlockRenderer,
    response: String,
    prompt: &str,
    model: &str,
) -> Result<GenerationReport, GenerationError> {
    if response.trim().is_empty() {
        warn!("Model returned an empty response");
        return Err(GenerationError::EmptyResponse);
    }

    let split = split_summary(&response);
    let outcome = apply_code_blocks(&mut ctx.files, &mut ctx.open_path, &split.code);

    let version = if outcome.changed() {
        renderer.stamp_pass(&NodeStatus::Applied);
        Some(ctx.versions.commit(&ctx.files, prompt, &split.summary, model))
    } else {
        let stamped = renderer.stamp_pass(&NodeStatus::Failed {
            reason: NOT_APPLIED_REASON.to_string(),
        });
        info!("No files changed; marked {} code block(s) as failed", stamped);
        None
    };

    Ok(GenerationReport {
        response,
        summary: split.summary,
        outcome,
        version,
    })
}

/// Request a completion for `prompt` from `client` and run it as one pass.
pub async fn generate(
    ctx: &mut ProjectContext,
    renderer: &mut BlockRenderer,
    client: &CompletionClient,
    prompt: &str,
    cancel: &mut CancelToken,
    on_progress: impl FnMut(Progress<'_>),
) -> Result<GenerationReport, GenerationError> {
    let messages = build_messages(&ctx.files, prompt);

    let mut stream = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
        stream = client.stream(messages) => stream?,
    };

    let model = client.model().to_string();
    run_generation(ctx, renderer, &mut stream, prompt, &model, cancel, on_progress).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::FileMeta;
    use crate::stream::BlockKind;

    const CREATION_RESPONSE: &str = "```index.html\n<h1>Hi</h1>\n```\n\n```style.css\nbody{color:red}\n```\n\n<task_summary>\nCreated a greeting page.\n</task_summary>";

    struct HangingTokens {
        first: Option<String>,
    }

    #[async_trait]
    impl TokenSource for HangingTokens {
        async fn next_token(&mut self) -> Result<Option<String>> {
            if let Some(token) = self.first.take() {
                return Ok(Some(token));
            }
            std::future::pending().await
        }
    }

    async fn run(
        ctx: &mut ProjectContext,
        renderer: &mut BlockRenderer,
        source: &mut ScriptedTokens,
    ) -> Result<GenerationReport, GenerationError> {
        let mut cancel = CancelToken::never();
        run_generation(ctx, renderer, source, "prompt", "vendor/m", &mut cancel, |_| {}).await
    }

    #[tokio::test]
    async fn test_initial_creation_pipeline() {
        let mut ctx = ProjectContext::new();
        let mut renderer = BlockRenderer::new();
        let mut source = ScriptedTokens::from_response(CREATION_RESPONSE, 3);
        let mut max_nodes = 0;
        let mut cancel = CancelToken::never();

        let report = run_generation(
            &mut ctx,
            &mut renderer,
            &mut source,
            "a greeting page",
            "vendor/m",
            &mut cancel,
            |progress| max_nodes = max_nodes.max(progress.renderer.len()),
        )
        .await
        .unwrap();

        assert_eq!(report.version, Some(0));
        assert_eq!(report.summary, "Created a greeting page.");
        assert_eq!(report.outcome.created, vec!["index.html", "style.css"]);
        assert_eq!(ctx.files.get("style.css").unwrap().content, "body{color:red}");
        assert!(max_nodes >= 3);

        let version = ctx.versions.get(0).unwrap();
        assert_eq!(version.prompt, "a greeting page");
        assert_eq!(version.model_short_name(), "m");

        let code_nodes: Vec<_> = renderer
            .nodes()
            .iter()
            .filter(|n| n.kind == BlockKind::Code)
            .collect();
        assert_eq!(code_nodes.len(), 2);
        assert!(code_nodes
            .iter()
            .all(|n| n.status == Some(NodeStatus::Applied)));

        let preview = ctx.preview();
        assert_eq!(preview.matches("<style").count(), 1);
        assert!(preview.contains("<h1>Hi</h1>"));
    }

    #[tokio::test]
    async fn test_bare_hint_marks_nodes_failed() {
        let mut ctx = ProjectContext::new();
        let mut renderer = BlockRenderer::new();
        let mut source = ScriptedTokens::new(["```javascript\n", "alert(1)\n```"]);

        let report = run(&mut ctx, &mut renderer, &mut source).await.unwrap();
        assert!(!report.applied());
        assert!(ctx.files.is_empty());
        assert!(ctx.versions.is_empty());
        assert_eq!(
            renderer.nodes()[0].status,
            Some(NodeStatus::Failed {
                reason: NOT_APPLIED_REASON.to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_empty_response() {
        let mut ctx = ProjectContext::new();
        let mut renderer = BlockRenderer::new();
        let mut source = ScriptedTokens::new(Vec::<String>::new());

        let err = run(&mut ctx, &mut renderer, &mut source).await.unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_transport_failure_applies_nothing() {
        let mut files = FileStore::new();
        files.set("index.html", "<p>old</p>", FileMeta::text()).unwrap();
        let mut ctx = ProjectContext::with_files(files);
        let before = ctx.files.clone();
        let mut renderer = BlockRenderer::new();
        let mut source =
            ScriptedTokens::new(["```index.html\n<p>new</p>\n```"]).failing_with("connection reset");

        let err = run(&mut ctx, &mut renderer, &mut source).await.unwrap_err();
        assert!(matches!(err, GenerationError::Transport(_)));
        assert_eq!(ctx.files, before);
        assert!(ctx.versions.is_empty());
        // Rendered output stays as drawn
        assert_eq!(renderer.len(), 1);
        assert_eq!(renderer.nodes()[0].status, Some(NodeStatus::Loading));
    }

    #[tokio::test]
    async fn test_cancel_during_stream() {
        let mut ctx = ProjectContext::new();
        let mut renderer = BlockRenderer::new();
        let mut source = HangingTokens {
            first: Some("```index.html\n<h1>".to_string()),
        };
        let (handle, mut cancel) = cancel_pair();

        let result = run_generation(
            &mut ctx,
            &mut renderer,
            &mut source,
            "p",
            "m",
            &mut cancel,
            |_| handle.cancel(),
        )
        .await;

        assert!(matches!(result, Err(GenerationError::Cancelled)));
        assert!(ctx.files.is_empty());
        assert_eq!(renderer.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_reset_allows_next_pass() {
        let (handle, _) = cancel_pair();
        handle.cancel();
        assert!(handle.token().is_cancelled());
        handle.reset();

        let mut token = handle.token();
        assert!(!token.is_cancelled());
        let mut ctx = ProjectContext::new();
        let mut renderer = BlockRenderer::new();
        let mut source = ScriptedTokens::new(["```a.js\n1\n```"]);
        let report = run_generation(&mut ctx, &mut renderer, &mut source, "p", "m", &mut token, |_| {})
            .await
            .unwrap();
        assert!(report.applied());
    }

    #[tokio::test]
    async fn test_modification_and_restore_keeps_open_path_valid() {
        let mut ctx = ProjectContext::new();
        let mut renderer = BlockRenderer::new();

        let mut first = ScriptedTokens::new(["```index.html\n<p>1</p>\n```"]);
        run(&mut ctx, &mut renderer, &mut first).await.unwrap();
        ctx.open_path = Some("index.html".to_string());

        let mut second = ScriptedTokens::new(["```about.html\n<p>2</p>\n```"]);
        run(&mut ctx, &mut renderer, &mut second).await.unwrap();
        assert!(ctx.open("about.html"));
        assert_eq!(ctx.versions.len(), 2);

        assert!(ctx.restore(0));
        assert!(!ctx.files.contains("about.html"));
        assert_eq!(ctx.open_path.as_deref(), Some("index.html"));
        assert!(!ctx.restore(9));
    }

    #[test]
    fn test_scripted_tokens_chunking() {
        let source = ScriptedTokens::from_response("héllo", 2);
        assert_eq!(source.tokens, vec!["hé", "ll", "o"]);
    }
}
