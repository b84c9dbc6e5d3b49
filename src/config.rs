//! Configuration types.
//!
//! Two layers live here:
//!
//! * [`Configuration`]: the YAML file that names the source PDF, the output
//!   PDF, an optional Markdown introduction and the ordered page list. It is
//!   loaded once per run and never mutated.
//! * [`AssemblyOptions`]: the per-invocation parameters (explicit path
//!   overrides, tool programs, timeouts), built via
//!   [`AssemblyOptionsBuilder`].
//!
//! # Two-phase loading
//!
//! A CLI wants config values as *defaults* before it knows whether the user
//! overrode them, and at that point a missing or broken file must not be
//! fatal. [`Configuration::load_defaults`] covers that case and always
//! succeeds. The pipeline itself calls [`Configuration::load`], where every
//! failure is a [`AssembleError::Config`].

use crate::error::AssembleError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Conventional config location, relative to a per-language working directory.
pub const DEFAULT_CONFIG_PATH: &str = "../resources/config.yaml";

/// Suffix inserted before the extension of config-derived output paths.
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_rust";

/// Default renderer script name, resolved like an input path.
pub const DEFAULT_RENDERER_SCRIPT: &str = "puppeteer_render.js";

// ── YAML configuration ───────────────────────────────────────────────────

/// The parsed YAML configuration file.
///
/// ```yaml
/// file: resources/workout.pdf
/// output: output/selected.pdf
/// appendFirstPage: intro.md
/// pages:
///   - name: Warm-up
///     pageIndex: 3
///   - name: Cool-down
///     page: 7
/// ```
///
/// Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Default input PDF, relative to the project root unless absolute.
    #[serde(default)]
    pub file: Option<String>,

    /// Default output PDF, relative to the project root unless absolute.
    #[serde(default)]
    pub output: Option<String>,

    /// Markdown introduction, relative to the config file's own directory.
    #[serde(default, rename = "appendFirstPage")]
    pub append_first_page: Option<String>,

    /// Ordered page references. May be empty.
    #[serde(default)]
    pub pages: Vec<PageSpec>,
}

/// One entry of the `pages` list.
///
/// All numeric fields are 1-based page numbers in the input PDF. See
/// [`PageSpec::page_ref`](crate::pages) for the precedence between them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    /// Informational label; not used for selection.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "pageIndex")]
    pub page_index: Option<u32>,

    #[serde(default)]
    pub page: Option<u32>,

    /// Legacy field. Parsed and kept, never consulted for selection.
    #[serde(default, rename = "pageNumber")]
    pub page_number: Option<u32>,
}

impl Configuration {
    /// Load the configuration for an actual run. Every failure is fatal.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssembleError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AssembleError::config(path, "config file not found"));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| AssembleError::config(path, format!("cannot read file: {e}")))?;
        let config = Self::from_yaml_str(&text, path)?;
        debug!(
            "Loaded config {}: {} page entries",
            path.display(),
            config.pages.len()
        );
        Ok(config)
    }

    /// Best-effort load for CLI defaults: any failure yields the empty configuration.
    pub fn load_defaults(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                debug!("Ignoring config defaults: {e}");
                Self::default()
            }
        }
    }

    /// Parse YAML text. `origin` only labels error messages.
    pub fn from_yaml_str(text: &str, origin: impl AsRef<Path>) -> Result<Self, AssembleError> {
        let origin = origin.as_ref();
        let value: Value = serde_yaml::from_str(text)
            .map_err(|e| AssembleError::config(origin, format!("invalid YAML: {e}")))?;
        Self::from_value(value, origin)
    }

    fn from_value(value: Value, origin: &Path) -> Result<Self, AssembleError> {
        let mut mapping = match value {
            Value::Mapping(m) => m,
            other => {
                return Err(AssembleError::config(
                    origin,
                    format!("top-level value must be a mapping, found {}", type_name(&other)),
                ))
            }
        };

        match mapping.get("pages") {
            None => {}
            Some(Value::Null) => {
                mapping.remove("pages");
            }
            Some(Value::Sequence(entries)) => {
                if let Some((i, entry)) = entries.iter().enumerate().find(|(_, e)| !e.is_mapping()) {
                    return Err(AssembleError::config(
                        origin,
                        format!("pages[{i}] must be a mapping, found {}", type_name(entry)),
                    ));
                }
            }
            Some(other) => {
                return Err(AssembleError::config(
                    origin,
                    format!("'pages' must be a sequence, found {}", type_name(other)),
                ))
            }
        }

        serde_yaml::from_value(Value::Mapping(mapping))
            .map_err(|e| AssembleError::config(origin, e.to_string()))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

// ── Invocation options ───────────────────────────────────────────────────

/// Parameters for one assembly run.
///
/// Built via [`AssemblyOptions::builder()`] or [`AssemblyOptions::default()`].
///
/// # Example
/// ```rust
/// use pdf_page_assembler::AssemblyOptions;
///
/// let options = AssemblyOptions::builder()
///     .config_path("resources/config.yaml")
///     .output("out/selected.pdf")
///     .tool_timeout_secs(10)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AssemblyOptions {
    /// YAML configuration file. Default: [`DEFAULT_CONFIG_PATH`].
    pub config_path: PathBuf,

    /// Explicit input PDF. Wins over `file` in the config.
    pub input: Option<PathBuf>,

    /// Explicit output PDF, used verbatim (no suffix). Wins over `output` in the config.
    pub output: Option<PathBuf>,

    /// Explicit Markdown introduction. Wins over `appendFirstPage`.
    pub markdown: Option<PathBuf>,

    /// Inserted before the extension of config-derived output paths. Default: `_rust`.
    pub output_suffix: String,

    /// Page extraction / merge program. Default: `pdftk`.
    pub pdf_tool: String,

    /// Program that turns HTML into PDF. Default: `node`.
    pub renderer: String,

    /// Script passed to the renderer before the HTML/PDF paths.
    ///
    /// If `None`, [`DEFAULT_RENDERER_SCRIPT`] is resolved like an input path
    /// (project root first, then the config directory). An empty path runs
    /// the renderer as `<renderer> <html> <pdf>` with no script at all.
    pub renderer_script: Option<PathBuf>,

    /// Per-invocation timeout for the page tool, in seconds. Default: 30.
    pub tool_timeout_secs: u64,

    /// Timeout for the headless-browser render, in seconds. Default: 60.
    ///
    /// Browser start-up alone can take several seconds on a cold machine.
    pub render_timeout_secs: u64,

    /// Directory under which temporary artifacts are created. Default: system temp dir.
    pub temp_dir: Option<PathBuf>,

    /// Optional observer for stage transitions and tool invocations.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            input: None,
            output: None,
            markdown: None,
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            pdf_tool: "pdftk".to_string(),
            renderer: "node".to_string(),
            renderer_script: None,
            tool_timeout_secs: 30,
            render_timeout_secs: 60,
            temp_dir: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AssemblyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssemblyOptions")
            .field("config_path", &self.config_path)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("markdown", &self.markdown)
            .field("output_suffix", &self.output_suffix)
            .field("pdf_tool", &self.pdf_tool)
            .field("renderer", &self.renderer)
            .field("renderer_script", &self.renderer_script)
            .field("tool_timeout_secs", &self.tool_timeout_secs)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("temp_dir", &self.temp_dir)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn AssemblyProgressCallback>"),
            )
            .finish()
    }
}

impl AssemblyOptions {
    /// Create a new builder for `AssemblyOptions`.
    pub fn builder() -> AssemblyOptionsBuilder {
        AssemblyOptionsBuilder {
            options: Self::default(),
        }
    }

    /// Root under which temp artifacts are created.
    pub fn temp_root(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Builder for [`AssemblyOptions`].
#[derive(Debug)]
pub struct AssemblyOptionsBuilder {
    options: AssemblyOptions,
}

impl AssemblyOptionsBuilder {
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.config_path = path.into();
        self
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.input = Some(path.into());
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.output = Some(path.into());
        self
    }

    pub fn markdown(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.markdown = Some(path.into());
        self
    }

    pub fn output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.options.output_suffix = suffix.into();
        self
    }

    pub fn pdf_tool(mut self, program: impl Into<String>) -> Self {
        self.options.pdf_tool = program.into();
        self
    }

    pub fn renderer(mut self, program: impl Into<String>) -> Self {
        self.options.renderer = program.into();
        self
    }

    pub fn renderer_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.renderer_script = Some(path.into());
        self
    }

    /// Invoke the renderer directly with the HTML and PDF paths.
    pub fn no_renderer_script(mut self) -> Self {
        self.options.renderer_script = Some(PathBuf::new());
        self
    }

    pub fn tool_timeout_secs(mut self, secs: u64) -> Self {
        self.options.tool_timeout_secs = secs;
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.options.render_timeout_secs = secs;
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.temp_dir = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.options.progress_callback = Some(callback);
        self
    }

    /// Build the options, validating constraints.
    pub fn build(self) -> Result<AssemblyOptions, AssembleError> {
        let o = &self.options;
        if o.pdf_tool.trim().is_empty() {
            return Err(AssembleError::InvalidOptions("PDF tool program must not be empty".into()));
        }
        if o.renderer.trim().is_empty() {
            return Err(AssembleError::InvalidOptions("Renderer program must not be empty".into()));
        }
        if o.tool_timeout_secs == 0 || o.render_timeout_secs == 0 {
            return Err(AssembleError::InvalidOptions("Timeouts must be ≥ 1 second".into()));
        }
        Ok(self.options)
    }
}
