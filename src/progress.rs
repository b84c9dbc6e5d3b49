//! Progress-callback trait for assembly events.
//!
//! Inject an [`Arc<dyn AssemblyProgressCallback>`] via
//! [`crate::config::AssemblyOptionsBuilder::progress_callback`] to observe a
//! run: stage transitions, each external tool invocation, and the one
//! non-fatal warning (a missing Markdown introduction).
//!
//! The CLI uses this to drive a spinner; a library caller can forward the
//! events anywhere without the pipeline knowing about it.
//!
//! # Example
//!
//! ```rust
//! use pdf_page_assembler::{AssemblyOptions, AssemblyProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct PrintStages;
//!
//! impl AssemblyProgressCallback for PrintStages {
//!     fn on_stage(&self, stage: Stage) {
//!         eprintln!("→ {stage}");
//!     }
//! }
//!
//! let options = AssemblyOptions::builder()
//!     .progress_callback(Arc::new(PrintStages) as Arc<dyn AssemblyProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::assemble::Stage;
use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as it moves through a run.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait AssemblyProgressCallback: Send + Sync {
    /// Called on every state transition, including `Aborted`.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called just before an external process is spawned.
    ///
    /// # Arguments
    /// * `step`: step label ("Page extraction", "Merge", "Markdown render")
    /// * `command`: rendered command line
    fn on_tool_start(&self, step: &str, command: &str) {
        let _ = (step, command);
    }

    /// Called when an external process finished successfully.
    fn on_tool_complete(&self, step: &str, elapsed_ms: u64) {
        let _ = (step, elapsed_ms);
    }

    /// Called for non-fatal conditions the run recovered from.
    fn on_warning(&self, message: &str) {
        let _ = message;
    }

    /// Called once after the output file has been written.
    fn on_complete(&self, output: &Path) {
        let _ = output;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AssemblyProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AssemblyOptions`].
pub type ProgressCallback = Arc<dyn AssemblyProgressCallback>;
