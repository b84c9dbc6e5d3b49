//! Path resolution for input, output, Markdown and renderer-script files.
//!
//! Config files conventionally live at `<root>/resources/config.yaml` while
//! the tool may be launched from any working directory. Relative values in
//! the config are therefore anchored on the config file, never on the CWD:
//!
//! | Value | Anchor | Fallback |
//! |-------|--------|----------|
//! | `file` (input) | project root | config directory, if the root candidate is missing |
//! | `output` | project root | none (the output need not exist yet) |
//! | `appendFirstPage` | config directory | none |
//!
//! The *project root* is the parent of the config file's directory.
//! Explicit (CLI) values bypass all of this and are only made absolute
//! against the current directory.

use crate::config::{AssemblyOptions, Configuration};
use crate::error::AssembleError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Absolute locations computed once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPaths {
    /// The configuration file the run was driven by.
    pub config: PathBuf,
    /// Source PDF. Existence is checked by the pipeline, not here.
    pub input: PathBuf,
    /// Destination PDF.
    pub output: PathBuf,
    /// Markdown introduction, if one is configured. May not exist.
    pub markdown: Option<PathBuf>,
}

/// Resolves paths relative to a configuration file.
#[derive(Debug, Clone)]
pub struct PathResolver {
    config_path: PathBuf,
}

impl PathResolver {
    pub fn new(config_path: impl AsRef<Path>) -> Self {
        Self {
            config_path: absolutize(config_path.as_ref()),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Directory containing the config file.
    pub fn config_dir(&self) -> PathBuf {
        self.config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"))
    }

    /// Parent of the config directory; falls back to the config directory at `/`.
    pub fn project_root(&self) -> PathBuf {
        let config_dir = self.config_dir();
        config_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(config_dir)
    }

    /// Two-tier lookup: project root first, then the config directory.
    ///
    /// Returns the project-root candidate when neither exists so the caller
    /// can report a meaningful "not found" path.
    pub fn resolve_existing(&self, relative: &Path) -> PathBuf {
        if relative.is_absolute() {
            return relative.to_path_buf();
        }
        let primary = self.project_root().join(relative);
        if primary.exists() {
            return primary;
        }
        let fallback = self.config_dir().join(relative);
        if fallback.exists() {
            debug!("Resolved {} via config directory", relative.display());
            return fallback;
        }
        primary
    }

    /// Input PDF: explicit value wins, else the configured value via [`Self::resolve_existing`].
    pub fn resolve_input(&self, explicit: Option<&Path>, configured: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(absolutize(path));
        }
        configured.map(|value| self.resolve_existing(Path::new(value)))
    }

    /// Output PDF: explicit value is used verbatim; a configured value is
    /// anchored on the project root and gets `suffix` before its extension.
    pub fn resolve_output(
        &self,
        explicit: Option<&Path>,
        configured: Option<&str>,
        suffix: &str,
    ) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(absolutize(path));
        }
        configured.map(|value| {
            let value = Path::new(value);
            let anchored = if value.is_absolute() {
                value.to_path_buf()
            } else {
                self.project_root().join(value)
            };
            insert_suffix(&anchored, suffix)
        })
    }

    /// Markdown introduction: explicit value verbatim, else `appendFirstPage`
    /// relative to the config directory, else none.
    pub fn resolve_markdown(
        &self,
        explicit: Option<&Path>,
        append_first_page: Option<&str>,
    ) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(absolutize(path));
        }
        append_first_page.map(|value| self.config_dir().join(value))
    }

    /// Resolve all run paths from the options and the loaded configuration.
    pub fn resolve(
        &self,
        options: &AssemblyOptions,
        config: &Configuration,
    ) -> Result<ResolvedPaths, AssembleError> {
        let input = self
            .resolve_input(options.input.as_deref(), config.file.as_deref())
            .ok_or_else(|| {
                AssembleError::config(
                    &self.config_path,
                    "no input PDF: set 'file' in the config or pass an explicit input",
                )
            })?;
        let output = self
            .resolve_output(
                options.output.as_deref(),
                config.output.as_deref(),
                &options.output_suffix,
            )
            .ok_or_else(|| {
                AssembleError::config(
                    &self.config_path,
                    "no output PDF: set 'output' in the config or pass an explicit output",
                )
            })?;
        let markdown = self.resolve_markdown(
            options.markdown.as_deref(),
            config.append_first_page.as_deref(),
        );

        debug!(
            "Resolved paths: input={} output={} markdown={:?}",
            input.display(),
            output.display(),
            markdown
        );

        Ok(ResolvedPaths {
            config: self.config_path.clone(),
            input,
            output,
            markdown,
        })
    }
}

/// Insert `suffix` immediately before the file extension.
///
/// `report.pdf` + `_rust` → `report_rust.pdf`; a name without extension
/// just gets the suffix appended. A dot-file such as `.pdf` counts as a bare
/// extension and becomes `_rust.pdf`.
pub fn insert_suffix(path: &Path, suffix: &str) -> PathBuf {
    if suffix.is_empty() {
        return path.to_path_buf();
    }
    let Some(stem) = path.file_stem() else {
        return path.to_path_buf();
    };
    if path.extension().is_none() && stem.as_encoded_bytes().starts_with(b".") {
        let mut name = std::ffi::OsString::from(suffix);
        name.push(stem);
        return path.with_file_name(name);
    }
    let mut name = stem.to_os_string();
    name.push(suffix);
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}

fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
