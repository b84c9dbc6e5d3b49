//! Pipeline integration tests.
//!
//! External tools are replaced by [`FakeTools`], a scripted
//! [`ProcessRunner`] that treats a "PDF" as a text file with one line per
//! page (`PAGE 1`, `PAGE 2`, …). It implements the same command-line
//! contract as pdftk (`cat … output …`) and the render script
//! (`[script] <html> <pdf>`), so ordering, copy-vs-merge and clean-up can
//! be checked exactly without any binary installed.
//!
//! Run with:
//!   cargo test --test assemble

use async_trait::async_trait;
use pdf_page_assembler::process::unavailable;
use pdf_page_assembler::{
    assemble_with, AssembleError, AssemblyOptions, AssemblyOptionsBuilder,
    AssemblyProgressCallback, ErrorKind, ProcessRunner, Stage, ToolCommand, ToolOutput,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

// ── Test doubles ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeTools {
    calls: Mutex<Vec<ToolCommand>>,
    missing: Vec<&'static str>,
    render_fails: bool,
    /// Renderer exits 0 without writing the PDF.
    render_silent: bool,
    merge_fails: bool,
    /// Every invocation blocks until the caller gives up.
    hang: bool,
}

impl FakeTools {
    fn without(program: &'static str) -> Self {
        Self {
            missing: vec![program],
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<ToolCommand> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_to(&self, program: &str) -> usize {
        self.calls().iter().filter(|c| c.program == program).count()
    }

    fn render(&self, args: &[String]) -> ToolOutput {
        if self.render_fails {
            return failure("Error: Failed to launch the browser process");
        }
        if self.render_silent {
            return success();
        }
        let [.., html, pdf] = args else {
            return failure("usage: render <html> <pdf>");
        };
        let page = fs::read_to_string(html).unwrap();
        assert!(page.contains("<body>"), "renderer got unwrapped HTML: {page}");
        let headings = page.matches("<h1>").count();
        fs::write(pdf, format!("INTRO ({headings} headings)\n")).unwrap();
        success()
    }
}

#[async_trait]
impl ProcessRunner for FakeTools {
    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput, AssembleError> {
        self.calls.lock().unwrap().push(command.clone());
        if self.hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        let args = command.args_lossy();
        match command.program.as_str() {
            "pdftk" if self.merge_fails && command.step == "Merge" => Ok(ToolOutput {
                stderr: "Error: Unexpected exception while merging".to_string(),
                exit_code: Some(3),
                ..Default::default()
            }),
            "pdftk" => Ok(fake_pdftk(&args)),
            "node" => Ok(self.render(&args)),
            other => Err(unavailable(other, "not scripted")),
        }
    }

    fn locate(&self, program: &str) -> Result<PathBuf, AssembleError> {
        if self.missing.contains(&program) {
            Err(unavailable(program, "not found on PATH"))
        } else {
            Ok(Path::new("/usr/bin").join(program))
        }
    }
}

fn success() -> ToolOutput {
    ToolOutput {
        exit_code: Some(0),
        ..Default::default()
    }
}

fn failure(stderr: &str) -> ToolOutput {
    ToolOutput {
        stderr: stderr.to_string(),
        exit_code: Some(1),
        ..Default::default()
    }
}

/// `<in> cat p1 p2 … output <out>` or `<a> <b> … cat output <out>`.
fn fake_pdftk(args: &[String]) -> ToolOutput {
    let cat = args.iter().position(|a| a == "cat").unwrap();
    let out = args.iter().position(|a| a == "output").unwrap();
    let target = &args[out + 1];

    let content = if out == cat + 1 {
        args[..cat]
            .iter()
            .map(|f| fs::read_to_string(f).unwrap())
            .collect::<String>()
    } else {
        let source = fs::read_to_string(&args[0]).unwrap();
        let pages: Vec<&str> = source.lines().collect();
        let mut extracted = String::new();
        for number in &args[cat + 1..out] {
            let n: usize = number.parse().unwrap();
            match pages.get(n.wrapping_sub(1)) {
                Some(line) => {
                    extracted.push_str(line);
                    extracted.push('\n');
                }
                None => return failure("Error: Range start page number exceeds size of PDF"),
            }
        }
        extracted
    };
    fs::write(target, content).unwrap();
    success()
}

#[derive(Default)]
struct Recorder {
    stages: Mutex<Vec<Stage>>,
    warnings: Mutex<Vec<String>>,
    completed: Mutex<Option<PathBuf>>,
}

impl AssemblyProgressCallback for Recorder {
    fn on_stage(&self, stage: Stage) {
        self.stages.lock().unwrap().push(stage);
    }

    fn on_warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn on_complete(&self, output: &Path) {
        *self.completed.lock().unwrap() = Some(output.to_path_buf());
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

/// `<root>/resources/config.yaml`, a 5-page `<root>/source.pdf`, a render
/// script stub and a private temp root.
struct Project {
    root: TempDir,
    temp: TempDir,
}

impl Project {
    fn new(config: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("resources")).unwrap();
        fs::write(root.path().join("resources/config.yaml"), config).unwrap();
        let source: String = (1..=5).map(|n| format!("PAGE {n}\n")).collect();
        fs::write(root.path().join("source.pdf"), source).unwrap();
        fs::write(root.path().join("puppeteer_render.js"), "// stub\n").unwrap();
        Self {
            root,
            temp: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    fn options(&self) -> AssemblyOptionsBuilder {
        AssemblyOptions::builder()
            .config_path(self.path("resources/config.yaml"))
            .temp_dir(self.temp.path())
    }

    fn write(&self, relative: &str, content: &str) {
        fs::write(self.path(relative), content).unwrap();
    }

    fn temp_entries(&self) -> Vec<PathBuf> {
        fs::read_dir(self.temp.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }
}

const PAGES_2_4: &str = "file: source.pdf\noutput: out/selected.pdf\npages:\n  - name: Second\n    pageIndex: 2\n  - page: 4\n";

const WITH_INTRO: &str = "file: source.pdf\noutput: out/selected.pdf\nappendFirstPage: intro.md\npages:\n  - pageIndex: 2\n  - page: 4\n";

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn extracts_pages_in_order_and_copies_single_artifact() {
    let project = Project::new(PAGES_2_4);
    let tools = FakeTools::default();
    let options = project.options().build().unwrap();

    let report = assemble_with(&options, &tools).await.unwrap();

    let output = project.path("out/selected_rust.pdf");
    assert_eq!(report.output, output);
    assert_eq!(report.pages.as_slice(), &[2, 4]);
    assert_eq!(report.artifacts, 1);
    assert!(!report.markdown_included);
    assert_eq!(fs::read_to_string(&output).unwrap(), "PAGE 2\nPAGE 4\n");

    // One extraction, no merge, no render.
    let calls = tools.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].step, "Page extraction");
    assert_eq!(tools.calls_to("node"), 0);
}

#[tokio::test]
async fn duplicates_keep_first_occurrence() {
    let project = Project::new(
        "file: source.pdf\noutput: o.pdf\npages:\n  - pageIndex: 3\n  - page: 3\n  - pageIndex: 5\n    page: 1\n  - pageNumber: 2\n  - name: no number\n",
    );
    let tools = FakeTools::default();
    let options = project.options().build().unwrap();

    let report = assemble_with(&options, &tools).await.unwrap();

    assert_eq!(report.pages.as_slice(), &[3, 5]);
    assert_eq!(
        fs::read_to_string(project.path("o_rust.pdf")).unwrap(),
        "PAGE 3\nPAGE 5\n"
    );
}

#[tokio::test]
async fn markdown_introduction_is_merged_first() {
    let project = Project::new(WITH_INTRO);
    project.write("resources/intro.md", "# Plan\n\n| a | b |\n|---|---|\n| 1 | 2 |\n");
    let tools = FakeTools::default();
    let options = project.options().build().unwrap();

    let report = assemble_with(&options, &tools).await.unwrap();

    assert!(report.markdown_included);
    assert_eq!(report.artifacts, 2);
    assert_eq!(
        fs::read_to_string(project.path("out/selected_rust.pdf")).unwrap(),
        "INTRO (1 headings)\nPAGE 2\nPAGE 4\n"
    );

    let steps: Vec<&str> = tools.calls().iter().map(|c| c.step).collect();
    assert_eq!(steps, vec!["Markdown render", "Page extraction", "Merge"]);

    let render = &tools.calls()[0];
    assert_eq!(
        render.args_lossy()[0],
        project.path("puppeteer_render.js").to_string_lossy()
    );
    let merge = tools.calls()[2].args_lossy();
    assert!(merge[0].ends_with("markdown.pdf"), "merge args: {merge:?}");
    assert!(merge[1].ends_with("extracted.pdf"), "merge args: {merge:?}");
}

#[tokio::test]
async fn markdown_only_run_never_touches_the_page_tool() {
    let project = Project::new("file: source.pdf\noutput: o.pdf\nappendFirstPage: intro.md\npages: []\n");
    project.write("resources/intro.md", "# Only intro\n");
    let tools = FakeTools::without("pdftk");
    let options = project.options().build().unwrap();

    let report = assemble_with(&options, &tools).await.unwrap();

    assert_eq!(report.artifacts, 1);
    assert!(report.pages.is_empty());
    assert_eq!(
        fs::read_to_string(project.path("o_rust.pdf")).unwrap(),
        "INTRO (1 headings)\n"
    );
    assert_eq!(tools.calls_to("pdftk"), 0);
}

#[tokio::test]
async fn missing_markdown_is_a_warning() {
    let project = Project::new(WITH_INTRO);
    let tools = FakeTools::default();
    let recorder = Arc::new(Recorder::default());
    let options = project
        .options()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let report = assemble_with(&options, &tools).await.unwrap();

    assert!(!report.markdown_included);
    assert_eq!(tools.calls_to("node"), 0);
    let warnings = recorder.warnings.lock().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("intro.md"), "got: {warnings:?}");
}

#[tokio::test]
async fn nothing_to_produce_aborts_without_output() {
    let project = Project::new("file: source.pdf\noutput: o.pdf\npages: []\n");
    let tools = FakeTools::default();
    let recorder = Arc::new(Recorder::default());
    let options = project
        .options()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let err = assemble_with(&options, &tools).await.unwrap_err();

    assert!(matches!(err, AssembleError::NothingToProduce), "got: {err}");
    assert!(!project.path("o_rust.pdf").exists());
    assert!(tools.calls().is_empty());
    assert_eq!(recorder.stages.lock().unwrap().last(), Some(&Stage::Aborted));
    assert!(project.temp_entries().is_empty());
}

#[tokio::test]
async fn stages_run_in_order_and_complete_is_reported() {
    let project = Project::new(PAGES_2_4);
    let tools = FakeTools::default();
    let recorder = Arc::new(Recorder::default());
    let options = project
        .options()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    assemble_with(&options, &tools).await.unwrap();

    assert_eq!(
        *recorder.stages.lock().unwrap(),
        vec![
            Stage::Init,
            Stage::ConfigLoaded,
            Stage::PagesSelected,
            Stage::ArtifactsBuilt,
            Stage::Merged,
            Stage::Done,
        ]
    );
    assert_eq!(
        recorder.completed.lock().unwrap().as_deref(),
        Some(project.path("out/selected_rust.pdf").as_path())
    );
}

#[tokio::test]
async fn repeated_runs_are_byte_identical() {
    let project = Project::new(WITH_INTRO);
    project.write("resources/intro.md", "# Plan\n");
    let tools = FakeTools::default();
    let options = project.options().build().unwrap();

    assemble_with(&options, &tools).await.unwrap();
    let first = fs::read(project.path("out/selected_rust.pdf")).unwrap();
    assemble_with(&options, &tools).await.unwrap();
    let second = fs::read(project.path("out/selected_rust.pdf")).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn temp_files_are_removed_on_success_and_failure() {
    let project = Project::new(WITH_INTRO);
    project.write("resources/intro.md", "# Plan\n");
    let options = project.options().build().unwrap();

    assemble_with(&options, &FakeTools::default()).await.unwrap();
    assert!(project.temp_entries().is_empty(), "left: {:?}", project.temp_entries());

    let failing = FakeTools {
        render_fails: true,
        ..Default::default()
    };
    let err = assemble_with(&options, &failing).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
    assert!(err.to_string().contains("Failed to launch"), "got: {err}");
    assert!(project.temp_entries().is_empty(), "left: {:?}", project.temp_entries());
}

#[tokio::test]
async fn page_beyond_source_fails_extraction() {
    let project = Project::new("file: source.pdf\noutput: o.pdf\npages:\n  - pageIndex: 2\n  - pageIndex: 9\n");
    let tools = FakeTools::default();
    let options = project.options().build().unwrap();

    let err = assemble_with(&options, &tools).await.unwrap_err();

    match err {
        AssembleError::ToolFailed {
            step,
            ref command,
            exit_code,
            ref stderr,
            ..
        } => {
            assert_eq!(step, "Page extraction");
            assert!(command.contains("cat 2 9 output"), "got: {command}");
            assert_eq!(exit_code, Some(1));
            assert!(stderr.contains("exceeds size"), "got: {stderr}");
        }
        other => panic!("expected ToolFailed, got: {other}"),
    }
    assert!(!project.path("o_rust.pdf").exists());
    assert!(project.temp_entries().is_empty());
}

#[tokio::test]
async fn missing_page_tool_fails_before_any_invocation() {
    let project = Project::new(PAGES_2_4);
    let tools = FakeTools::without("pdftk");
    let options = project.options().build().unwrap();

    let err = assemble_with(&options, &tools).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ToolUnavailable);
    assert!(err.to_string().contains("pdftk-java"), "got: {err}");
    assert!(tools.calls().is_empty());
}

#[tokio::test]
async fn missing_input_pdf_is_file_not_found() {
    let project = Project::new("file: nowhere.pdf\noutput: o.pdf\npages:\n  - page: 1\n");
    let tools = FakeTools::default();
    let options = project.options().build().unwrap();

    let err = assemble_with(&options, &tools).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::FileNotFound);
    assert!(err.to_string().contains("nowhere.pdf"), "got: {err}");
    assert!(tools.calls().is_empty());
}

#[tokio::test]
async fn config_errors_are_fatal() {
    let project = Project::new("pages: 7\n");
    let tools = FakeTools::default();

    let err = assemble_with(&project.options().build().unwrap(), &tools)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);

    let missing = project
        .options()
        .config_path(project.path("resources/absent.yaml"))
        .build()
        .unwrap();
    let err = assemble_with(&missing, &tools).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(tools.calls().is_empty());
}

#[tokio::test]
async fn explicit_paths_override_config() {
    let project = Project::new(PAGES_2_4);
    let other = project.path("other.pdf");
    fs::write(&other, "ALT 1\nALT 2\nALT 3\nALT 4\n").unwrap();
    let output = project.path("explicit/final.pdf");
    let tools = FakeTools::default();
    let options = project
        .options()
        .input(&other)
        .output(&output)
        .build()
        .unwrap();

    let report = assemble_with(&options, &tools).await.unwrap();

    assert_eq!(report.output, output, "explicit output gets no suffix");
    assert_eq!(fs::read_to_string(&output).unwrap(), "ALT 2\nALT 4\n");
}

#[tokio::test]
async fn input_falls_back_to_config_directory() {
    let project = Project::new("file: local.pdf\noutput: o.pdf\npages:\n  - page: 1\n");
    project.write("resources/local.pdf", "LOCAL 1\n");
    let tools = FakeTools::default();
    let options = project.options().build().unwrap();

    assemble_with(&options, &tools).await.unwrap();

    assert_eq!(fs::read_to_string(project.path("o_rust.pdf")).unwrap(), "LOCAL 1\n");
}

#[tokio::test]
async fn concurrent_runs_do_not_collide() {
    let a = Project::new(PAGES_2_4);
    let b = Project::new("file: source.pdf\noutput: out/selected.pdf\npages:\n  - page: 5\n");
    let shared_temp = tempfile::tempdir().unwrap();
    let tools = FakeTools::default();
    let options_a = a.options().temp_dir(shared_temp.path()).build().unwrap();
    let options_b = b.options().temp_dir(shared_temp.path()).build().unwrap();

    let (ra, rb) = tokio::join!(
        assemble_with(&options_a, &tools),
        assemble_with(&options_b, &tools)
    );
    ra.unwrap();
    rb.unwrap();

    assert_eq!(
        fs::read_to_string(a.path("out/selected_rust.pdf")).unwrap(),
        "PAGE 2\nPAGE 4\n"
    );
    assert_eq!(
        fs::read_to_string(b.path("out/selected_rust.pdf")).unwrap(),
        "PAGE 5\n"
    );
    assert_eq!(fs::read_dir(shared_temp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn merge_failure_is_a_tool_error_and_cleans_up() {
    let project = Project::new(WITH_INTRO);
    project.write("resources/intro.md", "# Plan\n");
    let tools = FakeTools {
        merge_fails: true,
        ..Default::default()
    };
    let options = project.options().build().unwrap();

    let err = assemble_with(&options, &tools).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Tool, "got: {err}");
    match err {
        AssembleError::ToolFailed {
            step, exit_code, ..
        } => {
            assert_eq!(step, "Merge");
            assert_eq!(exit_code, Some(3));
        }
        other => panic!("expected ToolFailed, got: {other}"),
    }
    assert!(!project.path("out/selected_rust.pdf").exists());
    assert!(project.temp_entries().is_empty(), "left: {:?}", project.temp_entries());
}

#[tokio::test]
async fn renderer_without_output_is_a_render_error() {
    let project = Project::new(WITH_INTRO);
    project.write("resources/intro.md", "# Plan\n");
    let tools = FakeTools {
        render_silent: true,
        ..Default::default()
    };
    let options = project.options().build().unwrap();

    let err = assemble_with(&options, &tools).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Render, "got: {err}");
    assert!(err.to_string().contains("produced no PDF"), "got: {err}");
    assert_eq!(tools.calls_to("pdftk"), 0);
    assert!(project.temp_entries().is_empty(), "left: {:?}", project.temp_entries());
}

#[tokio::test]
async fn dropping_a_running_assembly_removes_temp_files() {
    let project = Project::new(WITH_INTRO);
    project.write("resources/intro.md", "# Plan\n");
    let tools = FakeTools {
        hang: true,
        ..Default::default()
    };
    let options = project.options().build().unwrap();

    let outcome =
        tokio::time::timeout(Duration::from_millis(200), assemble_with(&options, &tools)).await;

    assert!(outcome.is_err(), "assembly should still be running");
    assert_eq!(tools.calls().len(), 1, "stuck in the first tool call");
    assert!(project.temp_entries().is_empty(), "left: {:?}", project.temp_entries());
    assert!(!project.path("out/selected_rust.pdf").exists());
}

#[tokio::test]
async fn renderer_can_run_without_a_script() {
    let project = Project::new(WITH_INTRO);
    project.write("resources/intro.md", "# Plan\n");
    fs::remove_file(project.path("puppeteer_render.js")).unwrap();
    let tools = FakeTools::default();
    let options = project.options().no_renderer_script().build().unwrap();

    let report = assemble_with(&options, &tools).await.unwrap();

    assert!(report.markdown_included);
    let render = &tools.calls()[0];
    assert_eq!(render.program, "node");
    let args = render.args_lossy();
    assert_eq!(args.len(), 2, "render args: {args:?}");
    assert!(args[0].ends_with("intro.html"), "render args: {args:?}");
    assert!(args[1].ends_with("intro.pdf"), "render args: {args:?}");
}
