use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use sitecraft::api::CompletionClient;
use sitecraft::preview::PreviewMessage;
use sitecraft::stream::BlockRenderer;
use sitecraft::{
    cancel_pair, generate, CancelHandle, CancelToken, GenerationError, GeneratorConfig,
    ProjectContext,
};

use super::report::{format_diff, format_versions, print_generation};
use super::{export_project, load_project};
use crate::cli::{resolve_project_dir, scratch_preview_path};

const HELP: &str = "\
Type a prompt to generate or change the site. Ctrl-C cancels a running generation.

  :files [query]   list project files (filtered by query)
  :show PATH       print a file and make it the open file
  :versions        list versions
  :restore N       restore version N
  :diff N          show what version N changed
  :toggle N        expand or collapse code block N of the last response
  :preview FILE    write the preview document to FILE
  :open [FILE]     write the preview and open it in the browser
  :export DIR      write the project files to DIR
  :fix JSON        report a preview message; errors are sent back as a fix request
  :help            show this help
  :quit            leave (Ctrl-C at the prompt does the same)";

/// One line of chat input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChatInput {
    Prompt(String),
    Files(Option<String>),
    Show(String),
    Versions,
    Restore(usize),
    Diff(usize),
    Toggle(usize),
    Preview(PathBuf),
    Open(Option<PathBuf>),
    Export(PathBuf),
    Fix(String),
    Help,
    Quit,
}

fn version_number(arg: &str) -> Result<usize, String> {
    match arg.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("Expected a version number, got {:?}", arg.trim())),
    }
}

fn required(arg: &str, what: &str) -> Result<String, String> {
    let arg = arg.trim();
    if arg.is_empty() {
        Err(format!("Missing {}", what))
    } else {
        Ok(arg.to_string())
    }
}

impl ChatInput {
    /// Parse a line; `None` for blank input.
    fn parse(line: &str) -> Option<Result<Self, String>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix(':') else {
            return Some(Ok(ChatInput::Prompt(line.to_string())));
        };

        let (name, arg) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
        let arg = arg.trim();
        let parsed = match name {
            "files" | "ls" => Ok(ChatInput::Files((!arg.is_empty()).then(|| arg.to_string()))),
            "show" | "cat" => required(arg, "file path").map(ChatInput::Show),
            "versions" | "history" => Ok(ChatInput::Versions),
            "restore" => version_number(arg).map(ChatInput::Restore),
            "diff" => version_number(arg).map(ChatInput::Diff),
            "toggle" => arg
                .parse()
                .map(ChatInput::Toggle)
                .map_err(|_| format!("Expected a block number, got {:?}", arg)),
            "preview" => required(arg, "output file").map(|p| ChatInput::Preview(p.into())),
            "open" => Ok(ChatInput::Open((!arg.is_empty()).then(|| arg.into()))),
            "export" => required(arg, "output directory").map(|p| ChatInput::Export(p.into())),
            "fix" => required(arg, "preview message JSON").map(ChatInput::Fix),
            "help" | "h" | "?" => Ok(ChatInput::Help),
            "quit" | "q" | "exit" => Ok(ChatInput::Quit),
            other => Err(format!("Unknown command :{} (try :help)", other)),
        };
        Some(parsed)
    }
}

/// What a Ctrl-C did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupted {
    CancelledPass,
    EndedSession,
}

/// Ctrl-C routing shared with the signal listener.
struct InterruptState {
    cancel: CancelHandle,
    busy: AtomicBool,
    quit: Notify,
}

impl InterruptState {
    fn new() -> Self {
        let (cancel, _) = cancel_pair();
        Self {
            cancel,
            busy: AtomicBool::new(false),
            quit: Notify::new(),
        }
    }

    /// Token for a new pass; clears any earlier cancellation.
    fn begin_pass(&self) -> CancelToken {
        self.cancel.reset();
        self.busy.store(true, Ordering::SeqCst);
        self.cancel.token()
    }

    fn end_pass(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }

    fn interrupt(&self) -> Interrupted {
        if self.busy.load(Ordering::SeqCst) {
            self.cancel.cancel();
            Interrupted::CancelledPass
        } else {
            self.quit.notify_one();
            Interrupted::EndedSession
        }
    }
}

/// One Ctrl-C listener for the whole session.
struct Interrupts {
    state: Arc<InterruptState>,
    listener: JoinHandle<()>,
}

impl Interrupts {
    fn spawn() -> Self {
        let state = Arc::new(InterruptState::new());
        let listener = tokio::spawn({
            let state = Arc::clone(&state);
            async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    let action = state.interrupt();
                    debug!("Ctrl-C: {:?}", action);
                }
            }
        });
        Self { state, listener }
    }
}

impl Drop for Interrupts {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

struct ChatSession {
    ctx: ProjectContext,
    renderer: BlockRenderer,
    client: CompletionClient,
    interrupts: Interrupts,
}

impl ChatSession {
    async fn run_prompt(&mut self, prompt: &str) {
        let mut token = self.interrupts.state.begin_pass();

        let mut stdout = std::io::stdout();
        let result = generate(
            &mut self.ctx,
            &mut self.renderer,
            &self.client,
            prompt,
            &mut token,
            |progress| {
                let _ = write!(stdout, "{}", progress.token);
                let _ = stdout.flush();
            },
        )
        .await;
        self.interrupts.state.end_pass();

        match result {
            Ok(report) => print_generation(&report, &self.renderer),
            Err(GenerationError::Cancelled) => println!("\n⏹  Generation cancelled"),
            Err(err) => {
                println!("\n❌ {:#}", err);
                if let Some(api_error) = err.api_error() {
                    let hint = api_error.user_hint();
                    if !hint.is_empty() {
                        println!("   {}", hint);
                    }
                }
            }
        }
    }

    fn write_preview(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.ctx.preview())
            .with_context(|| format!("Failed to write preview to {}", path.display()))
    }

    /// Handle one parsed input; returns false to leave the session.
    async fn handle(&mut self, input: ChatInput) -> Result<bool> {
        match input {
            ChatInput::Prompt(prompt) => self.run_prompt(&prompt).await,
            ChatInput::Files(query) => {
                let paths = match &query {
                    Some(q) => self.ctx.files.suggest(q),
                    None => self.ctx.files.paths().collect(),
                };
                if paths.is_empty() {
                    println!("No files.");
                }
                for path in paths {
                    let marker = if self.ctx.open_path.as_deref() == Some(path) {
                        '*'
                    } else {
                        ' '
                    };
                    println!("{} {}", marker, path);
                }
            }
            ChatInput::Show(path) => match self.ctx.files.get(&path) {
                Some(file) => {
                    println!("{}", file.content);
                    self.ctx.open(&path);
                }
                None => println!("No such file: {}", path),
            },
            ChatInput::Versions => {
                if self.ctx.versions.is_empty() {
                    println!("No versions yet.");
                }
                for line in format_versions(&self.ctx.versions) {
                    println!("{}", line);
                }
            }
            ChatInput::Restore(index) => {
                if self.ctx.restore(index) {
                    println!("⏪ Restored version {}", index + 1);
                } else {
                    println!("No version {}", index + 1);
                }
            }
            ChatInput::Diff(index) => match self.ctx.versions.diff(index) {
                Some(diff) => {
                    for line in format_diff(&diff) {
                        println!("{}", line);
                    }
                }
                None => println!("No version {}", index + 1),
            },
            ChatInput::Toggle(index) => match self.renderer.toggle(index) {
                Some(true) => {
                    if let Some(node) = self.renderer.nodes().get(index) {
                        println!("{}", node.content);
                    }
                }
                Some(false) => println!("Collapsed block {}", index),
                None => println!("No block {}", index),
            },
            ChatInput::Preview(path) => {
                self.write_preview(&path)?;
                println!("🖼  Preview written to {}", path.display());
            }
            ChatInput::Open(path) => {
                let path = path.unwrap_or_else(scratch_preview_path);
                self.write_preview(&path)?;
                println!("🌐 Opening {}", path.display());
                if open::that(&path).is_err() {
                    println!("⚠️  Could not open browser automatically.");
                }
            }
            ChatInput::Export(dir) => export_project(&self.ctx.files, &dir).await?,
            ChatInput::Fix(raw) => match PreviewMessage::from_json(&raw)? {
                PreviewMessage::PreviewLoaded => println!("Preview loaded without errors."),
                PreviewMessage::PreviewError { error } => {
                    println!("🔧 Asking for a fix: {}", error.message());
                    self.run_prompt(&error.fix_request()).await;
                }
            },
            ChatInput::Help => println!("{}", HELP),
            ChatInput::Quit => return Ok(false),
        }
        Ok(true)
    }
}

pub async fn run_chat(config: GeneratorConfig, project: Option<PathBuf>) -> Result<()> {
    let project = resolve_project_dir(project)?;
    let ctx = load_project(project.as_deref()).await?;
    let client = CompletionClient::new(config)?;

    println!(
        "🛠  sitecraft chat ({}, model {})",
        client.config().api_url,
        client.model()
    );
    println!("Describe the site you want. :help lists commands.\n");

    let mut session = ChatSession {
        ctx,
        renderer: BlockRenderer::new(),
        client,
        interrupts: Interrupts::spawn(),
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let next = tokio::select! {
            next = lines.next_line() => next.context("Failed to read input")?,
            _ = session.interrupts.state.quit.notified() => {
                println!();
                debug!("Interrupted at the prompt");
                break;
            }
        };
        let Some(line) = next else {
            debug!("Input closed");
            break;
        };
        let input = match ChatInput::parse(&line) {
            None => continue,
            Some(Ok(input)) => input,
            Some(Err(message)) => {
                println!("{}", message);
                continue;
            }
        };

        match session.handle(input).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                warn!("Command failed: {:#}", e);
                println!("❌ {:#}", e);
            }
        }
    }

    Ok(())
}
