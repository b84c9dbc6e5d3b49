//! Pipeline stages that produce and combine intermediate PDFs.
//!
//! Each submodule implements exactly one step, and every external process
//! goes through [`crate::process::ToolInvoker`].
//!
//! ## Data Flow
//!
//! ```text
//! intro.md ──▶ markdown ──▶ markdown.pdf ─┐
//!                                         ├──▶ pdftk::merge ──▶ output.pdf
//! input.pdf ─▶ pdftk::extract ─▶ extracted.pdf ┘
//! ```
//!
//! 1. [`markdown`]: Markdown → HTML (in-process) → PDF (headless browser)
//! 2. [`pdftk`]: page extraction and merge command lines, invoked once each
//! 3. [`artifact`]: the per-run temp directory that owns every intermediate
//!    PDF and removes it on success, failure and cancellation

pub mod artifact;
pub mod markdown;
pub mod pdftk;
