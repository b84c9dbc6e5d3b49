//! Page extraction and merging through a pdftk-compatible tool.
//!
//! The two operations are always separate invocations:
//!
//! ```text
//! extract:  <tool> <input.pdf> cat <p1> <p2> … output <out.pdf>
//! merge:    <tool> <a.pdf> <b.pdf> … cat output <out.pdf>
//! ```
//!
//! Page numbers are passed exactly as selected (1-based, first-occurrence
//! order). A page the source does not have makes the tool exit non-zero,
//! which fails the whole extraction.

use crate::error::AssembleError;
use crate::pages::SelectedPages;
use crate::process::{ToolCommand, ToolInvoker};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub const EXTRACT_STEP: &str = "Page extraction";
pub const MERGE_STEP: &str = "Merge";

/// Build the extraction command line.
pub fn extraction_command(
    tool: &str,
    input: &Path,
    pages: &SelectedPages,
    output: &Path,
    timeout: Duration,
) -> ToolCommand {
    ToolCommand::new(EXTRACT_STEP, tool)
        .arg(input)
        .arg("cat")
        .args(pages.as_slice().iter().map(u32::to_string))
        .arg("output")
        .arg(output)
        .timeout(timeout)
}

/// Build the merge command line. Files are concatenated in the given order.
pub fn merge_command(tool: &str, files: &[&Path], output: &Path, timeout: Duration) -> ToolCommand {
    ToolCommand::new(MERGE_STEP, tool)
        .args(files.iter().copied())
        .args(["cat", "output"])
        .arg(output)
        .timeout(timeout)
}

/// Write exactly `pages`, in order, from `input` into `output`.
pub async fn extract_pages(
    invoker: &ToolInvoker<'_>,
    tool: &str,
    input: &Path,
    pages: &SelectedPages,
    output: &Path,
    timeout: Duration,
) -> Result<(), AssembleError> {
    if pages.is_empty() {
        return Err(AssembleError::Internal("extraction requested with no pages".into()));
    }
    let command = extraction_command(tool, input, pages, output, timeout);
    invoker.run_expecting(&command, output).await?;
    info!("Extracted pages {pages} from {}", input.display());
    Ok(())
}

/// Concatenate two or more PDFs into `output`.
pub async fn merge(
    invoker: &ToolInvoker<'_>,
    tool: &str,
    files: &[&Path],
    output: &Path,
    timeout: Duration,
) -> Result<(), AssembleError> {
    if files.len() < 2 {
        return Err(AssembleError::Internal(format!(
            "merge needs at least two files, got {}",
            files.len()
        )));
    }
    let command = merge_command(tool, files, output, timeout);
    invoker.run_expecting(&command, output).await?;
    info!("Merged {} files into {}", files.len(), output.display());
    Ok(())
}
