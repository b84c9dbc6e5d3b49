//! The assembly pipeline: config → pages → artifacts → merged output.
//!
//! A run moves through a fixed sequence of [`Stage`]s:
//!
//! ```text
//! Init → ConfigLoaded → PagesSelected → ArtifactsBuilt → Merged → Done
//!   └──────────┴──────────────┴──────────────┴────────────┴──▶ Aborted
//! ```
//!
//! Every intermediate PDF lives in one [`ArtifactWorkspace`]. The workspace
//! is dropped before an error leaves this module, so temp files are gone by
//! the time the caller sees the failure. Dropping the future returned by
//! [`assemble`] (e.g. on Ctrl-C) has the same effect.

use crate::config::{AssemblyOptions, Configuration, DEFAULT_RENDERER_SCRIPT};
use crate::error::AssembleError;
use crate::pages::{select_pages, SelectedPages};
use crate::paths::{PathResolver, ResolvedPaths};
use crate::pipeline::artifact::{ArtifactKind, ArtifactWorkspace, TempArtifact};
use crate::pipeline::markdown::MarkdownRenderer;
use crate::pipeline::pdftk;
use crate::process::{ProcessRunner, SystemRunner, ToolInvoker};
use crate::progress::ProgressCallback;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Init,
    ConfigLoaded,
    PagesSelected,
    ArtifactsBuilt,
    Merged,
    Done,
    /// Terminal state after any fatal error.
    Aborted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::ConfigLoaded => "config loaded",
            Stage::PagesSelected => "pages selected",
            Stage::ArtifactsBuilt => "artifacts built",
            Stage::Merged => "merged",
            Stage::Done => "done",
            Stage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// What a run would do, computed without invoking any external tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyPlan {
    pub paths: ResolvedPaths,
    pub pages: SelectedPages,
    /// `true` when a Markdown path is resolved and the file exists.
    pub include_markdown: bool,
    /// Script handed to the renderer. Only set when Markdown is included.
    pub renderer_script: Option<PathBuf>,
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    pub output: PathBuf,
    pub pages: SelectedPages,
    pub markdown_included: bool,
    /// Number of intermediate PDFs that went into the output (1 or 2).
    pub artifacts: usize,
    pub duration_ms: u64,
}

struct StageTracker<'a> {
    current: Stage,
    progress: Option<&'a ProgressCallback>,
}

impl<'a> StageTracker<'a> {
    fn new(progress: Option<&'a ProgressCallback>) -> Self {
        if let Some(cb) = progress {
            cb.on_stage(Stage::Init);
        }
        Self {
            current: Stage::Init,
            progress,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug!("Stage: {} → {}", self.current, next);
        self.current = next;
        if let Some(cb) = self.progress {
            cb.on_stage(next);
        }
    }

    fn abort(&mut self, error: &AssembleError) {
        debug!("Stage: {} → aborted ({:?})", self.current, error.kind());
        self.current = Stage::Aborted;
        if let Some(cb) = self.progress {
            cb.on_stage(Stage::Aborted);
        }
    }
}

/// Resolve everything a run needs without running it.
///
/// Loads the configuration (fatal on failure), resolves paths, checks that
/// the input PDF exists and selects pages. No external process is started.
pub fn plan(options: &AssemblyOptions) -> Result<AssemblyPlan, AssembleError> {
    let mut stages = StageTracker::new(options.progress_callback.as_ref());
    let result = plan_stages(options, &mut stages);
    if let Err(ref e) = result {
        stages.abort(e);
    }
    result
}

fn plan_stages(
    options: &AssemblyOptions,
    stages: &mut StageTracker<'_>,
) -> Result<AssemblyPlan, AssembleError> {
    // ── Step 1: Load config and resolve paths ────────────────────────────
    let config = Configuration::load(&options.config_path)?;
    let resolver = PathResolver::new(&options.config_path);
    let paths = resolver.resolve(options, &config)?;

    if !paths.input.is_file() {
        return Err(AssembleError::FileNotFound {
            what: "Input PDF",
            path: paths.input,
        });
    }
    stages.advance(Stage::ConfigLoaded);

    // ── Step 2: Select pages ─────────────────────────────────────────────
    let pages = select_pages(&config.pages);
    info!("Selected pages: {pages}");
    stages.advance(Stage::PagesSelected);

    let include_markdown = paths.markdown.as_deref().is_some_and(Path::is_file);
    let no_script = options
        .renderer_script
        .as_deref()
        .is_some_and(|p| p.as_os_str().is_empty());
    let renderer_script = if include_markdown && !no_script {
        let script = resolver
            .resolve_input(
                options.renderer_script.as_deref(),
                Some(DEFAULT_RENDERER_SCRIPT),
            )
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RENDERER_SCRIPT));
        if !script.is_file() {
            return Err(AssembleError::FileNotFound {
                what: "Renderer script",
                path: script,
            });
        }
        Some(script)
    } else {
        None
    };

    Ok(AssemblyPlan {
        paths,
        pages,
        include_markdown,
        renderer_script,
    })
}

/// Run the full pipeline with the system process runner.
///
/// # Errors
/// Returns `Err(AssembleError)` for every fatal condition. A configured
/// Markdown file that does not exist is not one of them: it is reported
/// through the progress callback and the log, and the run continues.
pub async fn assemble(options: &AssemblyOptions) -> Result<AssemblyReport, AssembleError> {
    assemble_with(options, &SystemRunner).await
}

/// Run the full pipeline with a caller-supplied [`ProcessRunner`].
pub async fn assemble_with(
    options: &AssemblyOptions,
    runner: &dyn ProcessRunner,
) -> Result<AssemblyReport, AssembleError> {
    let started = Instant::now();
    let mut stages = StageTracker::new(options.progress_callback.as_ref());
    let result = run_stages(options, runner, &mut stages, started).await;
    if let Err(ref e) = result {
        stages.abort(e);
    }
    result
}

async fn run_stages(
    options: &AssemblyOptions,
    runner: &dyn ProcessRunner,
    stages: &mut StageTracker<'_>,
    started: Instant,
) -> Result<AssemblyReport, AssembleError> {
    let plan = plan_stages(options, stages)?;
    let progress = options.progress_callback.as_ref();
    let invoker = ToolInvoker::new(runner).with_progress(progress);
    let tool_timeout = Duration::from_secs(options.tool_timeout_secs);
    let output = plan.paths.output.as_path();

    // ── Step 3: Pre-flight ───────────────────────────────────────────────
    if let Some(ref missing) = plan.paths.markdown {
        if !plan.include_markdown {
            let message = format!(
                "Markdown file not found: {}; continuing without it",
                missing.display()
            );
            warn!("{message}");
            if let Some(cb) = progress {
                cb.on_warning(&message);
            }
        }
    }
    if !plan.pages.is_empty() {
        invoker.ensure_available(&options.pdf_tool)?;
    }
    if plan.include_markdown {
        invoker.ensure_available(&options.renderer)?;
    }

    let mut workspace = ArtifactWorkspace::create(&options.temp_root())?;

    // ── Step 4: Render the Markdown introduction ─────────────────────────
    if let (true, Some(markdown)) = (plan.include_markdown, plan.paths.markdown.as_deref()) {
        let mut renderer = MarkdownRenderer::new(invoker, options.renderer.as_str(), workspace.path())
            .timeout(Duration::from_secs(options.render_timeout_secs));
        if let Some(ref script) = plan.renderer_script {
            renderer = renderer.script(script);
        }
        let bytes = renderer.render(markdown).await?;

        let target = workspace.reserve(ArtifactKind::Markdown);
        tokio::fs::write(&target, &bytes).await.map_err(|e| {
            AssembleError::Internal(format!(
                "Cannot write rendered Markdown to '{}': {e}",
                target.display()
            ))
        })?;
        workspace.register(ArtifactKind::Markdown)?;
    }

    // ── Step 5: Extract the selected pages ───────────────────────────────
    if !plan.pages.is_empty() {
        let target = workspace.reserve(ArtifactKind::Extraction);
        pdftk::extract_pages(
            &invoker,
            &options.pdf_tool,
            &plan.paths.input,
            &plan.pages,
            &target,
            tool_timeout,
        )
        .await?;
        workspace.register(ArtifactKind::Extraction)?;
    }
    stages.advance(Stage::ArtifactsBuilt);

    // ── Step 6: Combine into the output ──────────────────────────────────
    let artifacts: Vec<&Path> = workspace.artifacts().iter().map(TempArtifact::path).collect();
    if artifacts.is_empty() {
        return Err(AssembleError::NothingToProduce);
    }
    let write_failed = |source| AssembleError::OutputWriteFailed {
        path: output.to_path_buf(),
        source,
    };
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    match artifacts.as_slice() {
        [single] => {
            tokio::fs::copy(single, output).await.map_err(write_failed)?;
            debug!("Copied {} to {}", single.display(), output.display());
        }
        files => {
            // A stale output would satisfy the merge's presence check.
            if output.exists() {
                tokio::fs::remove_file(output).await.map_err(write_failed)?;
            }
            pdftk::merge(&invoker, &options.pdf_tool, files, output, tool_timeout).await?;
        }
    }
    let artifact_count = artifacts.len();
    stages.advance(Stage::Merged);

    // ── Step 7: Clean up and report ──────────────────────────────────────
    workspace.close();
    info!("Saved to: {}", output.display());
    if let Some(cb) = progress {
        cb.on_complete(output);
    }
    stages.advance(Stage::Done);

    Ok(AssemblyReport {
        output: plan.paths.output.clone(),
        pages: plan.pages,
        markdown_included: plan.include_markdown,
        artifacts: artifact_count,
        duration_ms: started.elapsed().as_millis() as u64,
    })
}

/// Synchronous wrapper around [`assemble`].
///
/// Creates a temporary tokio runtime internally.
pub fn assemble_sync(options: &AssemblyOptions) -> Result<AssemblyReport, AssembleError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AssembleError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(assemble(options))
}
