//! Markdown → HTML → PDF rendering for the introductory section.
//!
//! The Markdown is converted to HTML in-process with `pulldown-cmark`
//! (GitHub-style tables and strikethrough enabled), wrapped in a fixed
//! stylesheet, and handed to an external headless-browser script:
//!
//! ```text
//! <renderer> [script] <input.html> <output.pdf>
//! ```
//!
//! The wrapper in [`wrap_html`] is a shared contract. Other front-ends that
//! produce the same introduction must emit the same bytes, so do not
//! reformat it.

use crate::error::AssembleError;
use crate::process::{ToolCommand, ToolInvoker};
use pulldown_cmark::{html, Options, Parser};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const RENDER_STEP: &str = "Markdown render";

const HTML_HEAD: &str = r#"
        <html>
        <head>
            <style>
                body { font-family: Helvetica, Arial, sans-serif; margin: 2em; }
                h1, h2, h3, h4 { color: #2a4d7c; }
                table { border-collapse: collapse; width: 100%; margin-bottom: 1em; }
                th, td { border: 1px solid #888; padding: 0.5em; text-align: left; }
                th { background: #d5e4f3; }
                code { background: #eee; padding: 2px 4px; border-radius: 4px; }
                pre { background: #f4f4f4; padding: 1em; border-radius: 4px; }
                ul { margin: 1em 0; padding-left: 2em; }
                li { margin: 0.5em 0; }
            </style>
        </head>
        <body>"#;

const HTML_TAIL: &str = r#"</body>
        </html>
        "#;

/// Convert Markdown text to an HTML fragment.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Wrap an HTML fragment in the fixed presentational template.
pub fn wrap_html(body: &str) -> String {
    let mut page = String::with_capacity(HTML_HEAD.len() + body.len() + HTML_TAIL.len());
    page.push_str(HTML_HEAD);
    page.push_str(body);
    page.push_str(HTML_TAIL);
    page
}

/// Renders a Markdown file to PDF bytes through an external process.
pub struct MarkdownRenderer<'a> {
    invoker: ToolInvoker<'a>,
    program: String,
    script: Option<PathBuf>,
    timeout: Duration,
    temp_root: PathBuf,
}

impl<'a> MarkdownRenderer<'a> {
    pub fn new(invoker: ToolInvoker<'a>, program: impl Into<String>, temp_root: impl Into<PathBuf>) -> Self {
        Self {
            invoker,
            program: program.into(),
            script: None,
            timeout: Duration::from_secs(60),
            temp_root: temp_root.into(),
        }
    }

    /// Script argument placed before the HTML/PDF paths.
    pub fn script(mut self, script: impl Into<PathBuf>) -> Self {
        self.script = Some(script.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Render `markdown_path` and return the PDF bytes.
    ///
    /// Both intermediate files (HTML in, PDF out) live in a private temp
    /// directory that is gone when this returns, on success or failure.
    pub async fn render(&self, markdown_path: &Path) -> Result<Vec<u8>, AssembleError> {
        let render_failed = |detail: String| AssembleError::RenderFailed {
            path: markdown_path.to_path_buf(),
            detail,
        };

        let markdown = tokio::fs::read_to_string(markdown_path)
            .await
            .map_err(|e| render_failed(format!("cannot read Markdown: {e}")))?;
        let page = wrap_html(&markdown_to_html(&markdown));

        tokio::fs::create_dir_all(&self.temp_root)
            .await
            .map_err(|e| render_failed(format!("cannot create temp root: {e}")))?;
        let dir = tempfile::Builder::new()
            .prefix("md-render-")
            .tempdir_in(&self.temp_root)
            .map_err(|e| render_failed(format!("cannot create temp directory: {e}")))?;
        let html_path = dir.path().join("intro.html");
        let pdf_path = dir.path().join("intro.pdf");

        tokio::fs::write(&html_path, page.as_bytes())
            .await
            .map_err(|e| render_failed(format!("cannot write HTML: {e}")))?;
        debug!("Wrote {} bytes of HTML to {}", page.len(), html_path.display());

        let mut command = ToolCommand::new(RENDER_STEP, self.program.as_str());
        if let Some(ref script) = self.script {
            command = command.arg(script);
        }
        let command = command.arg(&html_path).arg(&pdf_path).timeout(self.timeout);

        let output = self.invoker.run(&command).await?;
        if !output.success() {
            return Err(render_failed(format!(
                "renderer exited with {:?}\nCommand: {}\nStderr: {}",
                output.exit_code,
                command.command_line(),
                output.stderr
            )));
        }

        let bytes = match tokio::fs::read(&pdf_path).await {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => return Err(render_failed("renderer produced an empty PDF".into())),
            Err(e) => return Err(render_failed(format!("renderer produced no PDF: {e}"))),
        };

        let dir_path = dir.path().to_path_buf();
        if let Err(e) = dir.close() {
            warn!("Could not remove render temp files in {}: {e}", dir_path.display());
        }

        info!(
            "Rendered {} into {} bytes of PDF",
            markdown_path.display(),
            bytes.len()
        );
        Ok(bytes)
    }
}
