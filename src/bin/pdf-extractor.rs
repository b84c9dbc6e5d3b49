//! CLI binary for pdf-page-assembler.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AssemblyOptions` and prints the result.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_page_assembler::config::DEFAULT_CONFIG_PATH;
use pdf_page_assembler::{
    assemble, plan, AssemblyOptions, AssemblyPlan, AssemblyProgressCallback, Configuration,
    ProgressCallback, Stage,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner naming the current stage plus one
/// log line per finished tool invocation.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading configuration…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl AssemblyProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: Stage) {
        match stage {
            Stage::Done | Stage::Aborted => self.bar.finish_and_clear(),
            Stage::PagesSelected => self.bar.set_prefix("Building"),
            Stage::ArtifactsBuilt => self.bar.set_prefix("Merging"),
            _ => {}
        }
    }

    fn on_tool_start(&self, step: &str, _command: &str) {
        self.bar.set_message(format!("{step}…"));
    }

    fn on_tool_complete(&self, step: &str, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<16} {}",
            green("✓"),
            step,
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_warning(&self, message: &str) {
        self.bar.println(format!("  {} {}", yellow("⚠"), message));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Everything from the default config (../resources/config.yaml)
  pdf-extractor

  # Another config, explicit output (no suffix is added)
  pdf-extractor -y project/resources/config.yaml -o out/selected.pdf

  # Override the source PDF and prepend a Markdown introduction
  pdf-extractor -i plan.pdf -m intro.md -o plan-with-intro.pdf

  # Show what would happen without running pdftk or the renderer
  pdf-extractor --dry-run --json

CONFIG FILE:
  file: resources/plan.pdf        # input, relative to the project root
  output: output/selected.pdf     # output, gets the _rust suffix
  appendFirstPage: intro.md       # Markdown, relative to the config dir
  pages:
    - name: Warm-up
      pageIndex: 3                # 1-based; pageIndex wins over page
    - page: 7

  The project root is the parent of the directory holding the config file.

EXTERNAL TOOLS:
  pdftk        page extraction and merging (--pdf-tool)
  node         runs puppeteer_render.js for Markdown (--renderer, --renderer-script)

ENVIRONMENT VARIABLES:
  RUST_LOG                    Override the log filter (e.g. pdf_page_assembler=debug)
  PDF_EXTRACTOR_*             Every flag, e.g. PDF_EXTRACTOR_CONFIG, PDF_EXTRACTOR_OUTPUT
"#;

/// Extract configured pages from a PDF and prepend an optional Markdown introduction.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-extractor",
    version,
    about = "Extract configured pages from a PDF, optionally prefixed by rendered Markdown",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// YAML configuration file.
    #[arg(short = 'y', long = "yaml", env = "PDF_EXTRACTOR_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Input PDF. Overrides `file` in the config.
    #[arg(short, long, env = "PDF_EXTRACTOR_INPUT")]
    input: Option<PathBuf>,

    /// Output PDF, used as given. Overrides `output` in the config.
    #[arg(short, long, env = "PDF_EXTRACTOR_OUTPUT")]
    output: Option<PathBuf>,

    /// Markdown introduction. Overrides `appendFirstPage` in the config.
    #[arg(short, long, env = "PDF_EXTRACTOR_MARKDOWN")]
    markdown: Option<PathBuf>,

    /// Suffix inserted before the extension of a config-derived output path.
    #[arg(long, env = "PDF_EXTRACTOR_SUFFIX", default_value = "_rust")]
    suffix: String,

    /// Page extraction / merge program.
    #[arg(long, env = "PDF_EXTRACTOR_PDF_TOOL", default_value = "pdftk")]
    pdf_tool: String,

    /// Program that runs the HTML → PDF render script.
    #[arg(long, env = "PDF_EXTRACTOR_RENDERER", default_value = "node")]
    renderer: String,

    /// Render script. Default: puppeteer_render.js in the project root or config dir.
    #[arg(long, env = "PDF_EXTRACTOR_RENDERER_SCRIPT")]
    renderer_script: Option<PathBuf>,

    /// Run the renderer as `<renderer> <html> <pdf>` without a script.
    #[arg(long, conflicts_with = "renderer_script")]
    no_renderer_script: bool,

    /// Timeout per pdftk invocation, in seconds.
    #[arg(long, env = "PDF_EXTRACTOR_TIMEOUT", default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Timeout for the Markdown render, in seconds.
    #[arg(long, env = "PDF_EXTRACTOR_RENDER_TIMEOUT", default_value_t = 60,
          value_parser = clap::value_parser!(u64).range(1..))]
    render_timeout: u64,

    /// Directory for temporary files. Default: the system temp dir.
    #[arg(long, env = "PDF_EXTRACTOR_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Resolve paths and pages, print the plan, run nothing.
    #[arg(long)]
    dry_run: bool,

    /// Print the report (or plan) as JSON.
    #[arg(long, env = "PDF_EXTRACTOR_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF_EXTRACTOR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF_EXTRACTOR_QUIET")]
    quiet: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PDF_EXTRACTOR_NO_PROGRESS")]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress library logs below ERROR while the spinner is active; it
    // prints milestones and warnings itself.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.dry_run;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Required options ─────────────────────────────────────────────────
    // Config values only count as defaults here; a broken file surfaces later.
    let defaults = Configuration::load_defaults(&cli.config);
    let mut missing = Vec::new();
    if cli.input.is_none() && defaults.file.is_none() {
        missing.push("--input");
    }
    if cli.output.is_none() && defaults.output.is_none() {
        missing.push("--output");
    }
    if !missing.is_empty() {
        bail!(
            "Missing required arguments: {}\nSet them in {} or pass them on the command line.",
            missing.join(", "),
            cli.config.display()
        );
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn AssemblyProgressCallback>)
    } else {
        None
    };
    let options = build_options(&cli, progress_cb)?;

    // ── Dry run ──────────────────────────────────────────────────────────
    if cli.dry_run {
        let plan = plan(&options).context("Planning failed")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&plan).context("Failed to serialise plan")?
            );
        } else {
            print_plan(&plan);
        }
        return Ok(());
    }

    // ── Run ──────────────────────────────────────────────────────────────
    // Ctrl-C drops the pipeline future: temp files go with it and the
    // running child is killed.
    let report = tokio::select! {
        result = assemble(&options) => result.context("Assembly failed")?,
        _ = tokio::signal::ctrl_c() => {
            if let Some(ref cb) = options.progress_callback {
                cb.on_stage(Stage::Aborted);
            }
            bail!("Interrupted; temporary files were removed");
        }
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else {
        println!("Saved to: {}", report.output.display());
        if !cli.quiet {
            eprintln!(
                "{}  pages {}{}  {}ms  →  {}",
                green("✔"),
                report.pages,
                if report.markdown_included { " + intro" } else { "" },
                report.duration_ms,
                bold(&report.output.display().to_string()),
            );
        }
    }

    Ok(())
}

/// Map CLI args to `AssemblyOptions`.
fn build_options(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AssemblyOptions> {
    let mut builder = AssemblyOptions::builder()
        .config_path(&cli.config)
        .output_suffix(&cli.suffix)
        .pdf_tool(&cli.pdf_tool)
        .renderer(&cli.renderer)
        .tool_timeout_secs(cli.timeout)
        .render_timeout_secs(cli.render_timeout);

    if let Some(ref input) = cli.input {
        builder = builder.input(input);
    }
    if let Some(ref output) = cli.output {
        builder = builder.output(output);
    }
    if let Some(ref markdown) = cli.markdown {
        builder = builder.markdown(markdown);
    }
    if cli.no_renderer_script {
        builder = builder.no_renderer_script();
    } else if let Some(ref script) = cli.renderer_script {
        builder = builder.renderer_script(script);
    }
    if let Some(ref dir) = cli.temp_dir {
        builder = builder.temp_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid options")
}

fn print_plan(plan: &AssemblyPlan) {
    println!("Config:       {}", plan.paths.config.display());
    println!("Input:        {}", plan.paths.input.display());
    println!("Output:       {}", plan.paths.output.display());
    match (&plan.paths.markdown, plan.include_markdown) {
        (Some(md), true) => println!("Markdown:     {}", md.display()),
        (Some(md), false) => println!(
            "Markdown:     {} {}",
            md.display(),
            yellow("(missing, skipped)")
        ),
        (None, _) => println!("Markdown:     -"),
    }
    if let Some(ref script) = plan.renderer_script {
        println!("Renderer:     {}", script.display());
    }
    println!("Pages:        {}", plan.pages);
}
