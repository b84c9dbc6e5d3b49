//! External process invocation.
//!
//! Every component that shells out goes through [`ProcessRunner`], never
//! through `tokio::process` directly. Production code uses
//! [`SystemRunner`]; tests substitute a scripted double that emulates the
//! page tool and the renderer on plain files.
//!
//! ## Contract
//!
//! * A non-zero exit is **not** an error: the caller gets a [`ToolOutput`]
//!   and decides what the exit code means for its step.
//! * A binary that cannot be started is [`AssembleError::ToolUnavailable`].
//! * A process that outlives its [`ToolCommand::timeout`] is killed and
//!   reported as [`AssembleError::ToolTimeout`].
//! * Nothing is retried. Extraction and merge write into their output
//!   files, so blindly re-running them is not safe.

use crate::error::AssembleError;
use crate::progress::ProgressCallback;
use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Timeout applied when a command does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A fully-specified external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Human-readable step name used in error messages ("Page extraction", …).
    pub step: &'static str,
    pub program: String,
    pub args: Vec<OsString>,
    pub timeout: Duration,
}

impl ToolCommand {
    pub fn new(step: &'static str, program: impl Into<String>) -> Self {
        Self {
            step,
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments as lossy strings, for assertions and logging.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Shell-like rendering of the command line. For diagnostics only.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args_lossy())
            .map(|part| {
                if part.is_empty() || part.contains(char::is_whitespace) {
                    format!("'{part}'")
                } else {
                    part
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Capability to run external commands.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `command` to completion, capturing stdout and stderr.
    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput, AssembleError>;

    /// Confirm `program` can be found before it is needed.
    fn locate(&self, program: &str) -> Result<PathBuf, AssembleError> {
        tool_locate::locate(program).map_err(|e| unavailable(program, e.to_string()))
    }
}

/// [`ProcessRunner`] backed by `tokio::process`.
///
/// Children are spawned with `kill_on_drop`, so a timed-out or cancelled
/// invocation does not leave the direct child running.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput, AssembleError> {
        let line = command.command_line();
        debug!("Running command: {line}");

        let child = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| unavailable(&command.program, format!("failed to start: {e}")))?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(command.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| {
                AssembleError::Internal(format!("Failed to collect output of '{line}': {e}"))
            })?,
            Err(_) => {
                warn!("{} exceeded {}s; killed", command.step, command.timeout.as_secs());
                return Err(AssembleError::ToolTimeout {
                    step: command.step,
                    command: line,
                    secs: command.timeout.as_secs(),
                });
            }
        };

        let result = ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            exit_code: output.status.code(),
        };

        debug!("Exit code: {:?}", result.exit_code);
        if !result.stdout.is_empty() {
            debug!("Stdout: {}", result.stdout);
        }
        if !result.stderr.is_empty() {
            debug!("Stderr: {}", result.stderr);
        }

        Ok(result)
    }
}

/// A [`ProcessRunner`] plus the run's progress observer.
///
/// Pipeline steps call tools through this so every invocation is reported
/// the same way.
#[derive(Clone, Copy)]
pub struct ToolInvoker<'a> {
    runner: &'a dyn ProcessRunner,
    progress: Option<&'a ProgressCallback>,
}

impl<'a> ToolInvoker<'a> {
    pub fn new(runner: &'a dyn ProcessRunner) -> Self {
        Self {
            runner,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<&'a ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Fail fast with [`AssembleError::ToolUnavailable`] if `program` is not discoverable.
    pub fn ensure_available(&self, program: &str) -> Result<PathBuf, AssembleError> {
        let found = self.runner.locate(program)?;
        debug!("Found {program} at {}", found.display());
        Ok(found)
    }

    /// Run `command`; the exit code is left to the caller.
    pub async fn run(&self, command: &ToolCommand) -> Result<ToolOutput, AssembleError> {
        let line = command.command_line();
        if let Some(cb) = self.progress {
            cb.on_tool_start(command.step, &line);
        }
        let started = Instant::now();
        let output = self.runner.run(command).await?;
        if output.success() {
            if let Some(cb) = self.progress {
                cb.on_tool_complete(command.step, started.elapsed().as_millis() as u64);
            }
        }
        Ok(output)
    }

    /// Run `command` and require exit code 0 plus the presence of `expected_output`.
    pub async fn run_expecting(
        &self,
        command: &ToolCommand,
        expected_output: &Path,
    ) -> Result<ToolOutput, AssembleError> {
        let output = self.run(command).await?;
        let reason = if !output.success() {
            "non-zero exit status".to_string()
        } else if !expected_output.is_file() {
            format!(
                "expected output file '{}' was not created",
                expected_output.display()
            )
        } else {
            return Ok(output);
        };
        Err(AssembleError::ToolFailed {
            step: command.step,
            command: command.command_line(),
            exit_code: output.exit_code,
            stderr: output.stderr,
            reason,
        })
    }
}

/// Build a [`AssembleError::ToolUnavailable`] with an install hint.
pub fn unavailable(program: &str, detail: impl Into<String>) -> AssembleError {
    AssembleError::ToolUnavailable {
        tool: program.to_string(),
        detail: detail.into(),
        hint: install_hint(program).to_string(),
    }
}

fn install_hint(program: &str) -> &'static str {
    let name = Path::new(program)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(program);
    match name {
        "pdftk" => "Install pdftk (e.g. `apt install pdftk-java`, `brew install pdftk-java`) or pass --pdf-tool.",
        "node" => "Install Node.js and `npm install puppeteer` next to the render script, or pass --renderer.",
        _ => "Check that it is installed and on PATH.",
    }
}
