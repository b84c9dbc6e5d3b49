//! Error types for the pdf-page-assembler library.
//!
//! Every fatal condition of a run is an [`AssembleError`]. The single
//! non-fatal condition, a configured Markdown introduction that does not
//! exist on disk, is never an error: the pipeline logs a warning, notifies
//! the progress callback and carries on without it.
//!
//! [`AssembleError::kind`] collapses the variants into the five classes
//! callers usually branch on ([`ErrorKind`]).

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of an [`AssembleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing required configuration.
    Config,
    /// Input PDF or another required file is absent.
    FileNotFound,
    /// An external binary is not on the search path or cannot be started.
    ToolUnavailable,
    /// An external process ran but failed (exit code, timeout, missing output).
    Tool,
    /// The Markdown → PDF rendering step failed.
    Render,
    /// Anything else: nothing to produce, output write failures, internal errors.
    Other,
}

/// All fatal errors returned by the pdf-page-assembler library.
#[derive(Debug, Error)]
pub enum AssembleError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// The YAML configuration is missing, unreadable or has the wrong shape.
    #[error("Invalid configuration '{path}': {detail}")]
    Config { path: PathBuf, detail: String },

    /// Invocation options failed validation.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// A required file does not exist.
    #[error("{what} not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { what: &'static str, path: PathBuf },

    // ── External tool errors ──────────────────────────────────────────────
    /// The binary could not be located or started.
    #[error("Required tool '{tool}' is not available: {detail}\n{hint}")]
    ToolUnavailable {
        tool: String,
        detail: String,
        hint: String,
    },

    /// The process ran but did not produce what was asked of it.
    #[error(
        "{step} failed: {reason}\nCommand: {command}\nExit code: {}\nStderr: {stderr}",
        describe_exit(.exit_code)
    )]
    ToolFailed {
        step: &'static str,
        command: String,
        exit_code: Option<i32>,
        stderr: String,
        reason: String,
    },

    /// The process exceeded its time budget and was killed.
    #[error("{step} timed out after {secs}s and was terminated\nCommand: {command}")]
    ToolTimeout {
        step: &'static str,
        command: String,
        secs: u64,
    },

    // ── Rendering errors ──────────────────────────────────────────────────
    /// Markdown could not be turned into a PDF.
    #[error("Failed to render Markdown '{path}': {detail}")]
    RenderFailed { path: PathBuf, detail: String },

    // ── Assembly errors ───────────────────────────────────────────────────
    /// No page was selected and no Markdown introduction was produced.
    #[error("Nothing to produce: no pages selected and no Markdown introduction available")]
    NothingToProduce,

    /// Could not create or write the output PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (temp directory creation, runtime setup, …).
    #[error("Internal error: {0}")]
    Internal(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

impl AssembleError {
    /// The taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssembleError::Config { .. } | AssembleError::InvalidOptions(_) => ErrorKind::Config,
            AssembleError::FileNotFound { .. } => ErrorKind::FileNotFound,
            AssembleError::ToolUnavailable { .. } => ErrorKind::ToolUnavailable,
            AssembleError::ToolFailed { .. } | AssembleError::ToolTimeout { .. } => ErrorKind::Tool,
            AssembleError::RenderFailed { .. } => ErrorKind::Render,
            AssembleError::NothingToProduce
            | AssembleError::OutputWriteFailed { .. }
            | AssembleError::Internal(_) => ErrorKind::Other,
        }
    }

    pub(crate) fn config(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        AssembleError::Config {
            path: path.into(),
            detail: detail.into(),
        }
    }
}
