//! # pdf-page-assembler
//!
//! Assemble a PDF from selected pages of a source PDF, optionally prefixed
//! by an introduction rendered from Markdown.
//!
//! The heavy lifting is done by two external programs: a pdftk-compatible
//! page tool (extract, merge) and a headless-browser render script (HTML →
//! PDF). This crate decides *what* to ask of them, *in which order*, and
//! makes sure no intermediate file outlives the run.
//!
//! ## Pipeline Overview
//!
//! ```text
//! config.yaml + overrides
//!  │
//!  ├─ 1. Config   load YAML, resolve input/output/Markdown paths
//!  ├─ 2. Pages    ordered, de-duplicated 1-based page numbers
//!  ├─ 3. Render   Markdown → HTML → PDF (optional, missing file = warning)
//!  ├─ 4. Extract  <tool> in.pdf cat p1 p2 … output extracted.pdf
//!  ├─ 5. Merge    [intro, extracted] → output (or a plain copy of one)
//!  └─ 6. Done     temp workspace removed, "Saved to: <path>"
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_page_assembler::{assemble, AssemblyOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = AssemblyOptions::builder()
//!         .config_path("resources/config.yaml")
//!         .build()?;
//!     let report = assemble(&options).await?;
//!     println!("Saved to: {}", report.output.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-extractor` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-page-assembler = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assemble;
pub mod config;
pub mod error;
pub mod pages;
pub mod paths;
pub mod pipeline;
pub mod process;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use assemble::{assemble, assemble_sync, assemble_with, plan, AssemblyPlan, AssemblyReport, Stage};
pub use config::{AssemblyOptions, AssemblyOptionsBuilder, Configuration, PageSpec};
pub use error::{AssembleError, ErrorKind};
pub use pages::{select_pages, PageRef, SelectedPages};
pub use paths::{PathResolver, ResolvedPaths};
pub use process::{ProcessRunner, SystemRunner, ToolCommand, ToolOutput};
pub use progress::{AssemblyProgressCallback, NoopProgressCallback, ProgressCallback};
