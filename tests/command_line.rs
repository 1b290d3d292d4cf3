//! Command-line tests for the checker, run in-process through the harness
//!
//! These tests verify the checker's command-line contract by:
//! 1. Packaging expanded fixture folders from `tests/fixtures/command_line`
//! 2. Invoking the checker with its exit intercepted and output captured
//! 3. Comparing exit codes, console text and reports against golden files

use std::path::{Path, PathBuf};
use std::process::Command;

use epubcheck_harness::checker::{self, messages, Checker};
use epubcheck_harness::common::config::GoldenConfig;
use epubcheck_harness::common::paths::Corpus;
use epubcheck_harness::golden::{normalize_whitespace, ArtifactFormat, Comparator};
use epubcheck_harness::process::{console, exit, StreamCapture};
use epubcheck_harness::testing::{scenario_files, CaptureMode, ScenarioRunner, TestResult, TestScenario};
use epubcheck_harness::{invoke, InvocationRequest, InvocationResult};
use tempfile::TempDir;

/// Test context: a runner over the shared corpus with private scratch dirs
struct TestContext {
    runner: ScenarioRunner,
    /// Directory the checker runs in
    work_dir: TempDir,
    _output_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        let work_dir = tempfile::tempdir().expect("Failed to create work dir");
        let output_dir = tempfile::tempdir().expect("Failed to create output dir");
        let comparator =
            Comparator::from_config(&GoldenConfig::default()).expect("Default rules are valid");
        let runner = ScenarioRunner::new(Corpus::new(corpus_root(), output_dir.path()), comparator)
            .work_dir(work_dir.path());
        Self {
            runner,
            work_dir,
            _output_dir: output_dir,
        }
    }

    /// Run a scenario and assert it passed
    fn pass(&self, scenario: TestScenario) -> TestResult {
        let result = self
            .runner
            .run(&Checker, &scenario)
            .expect("Scenario should run");
        assert!(
            result.passed,
            "Scenario '{}' failed:\n{}",
            result.name,
            result.failures.join("\n")
        );
        result
    }

    /// Invoke the checker directly with in-memory capture
    fn check(&self, args: &[&str]) -> InvocationResult {
        let request = InvocationRequest::new(args.iter().copied()).working_dir(self.work_dir.path());
        invoke(&Checker, &request).expect("Invocation should complete")
    }

    fn input(&self, name: &str) -> String {
        corpus_root().join(name).display().to_string()
    }

    fn no_archives_left(&self) {
        let leftovers: Vec<PathBuf> = std::fs::read_dir(self.work_dir.path())
            .expect("Work dir readable")
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "epub"))
            .collect();
        assert!(leftovers.is_empty(), "Temp archives left: {:?}", leftovers);
    }
}

fn corpus_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("command_line")
}

fn message(key: &str) -> &'static str {
    messages::get(key).expect("Message key exists")
}

/// Golden text scenario over the `severity` folder
fn severity(name: &str, args: &[&str], code: i32) -> TestScenario {
    args.iter()
        .fold(TestScenario::expanded(name, "severity"), |s, a| s.arg(*a))
        .capture(CaptureMode::File)
        .exit_code(code)
        .golden()
}

// ============== Argument handling ==============

#[test]
fn test_empty_arguments() {
    let ctx = TestContext::new();
    let result = ctx.check(&[]);

    assert_eq!(result.code, 1);
    assert_eq!(result.stderr_trimmed(), message("argument_needed"));
    assert!(result.stdout.is_empty());
}

#[test]
fn test_help_without_file() {
    let ctx = TestContext::new();
    let result = ctx.check(&["-?"]);

    assert_eq!(result.code, 1);
    let help = normalize_whitespace(&messages::help_text(checker::version()));
    assert!(
        normalize_whitespace(&result.stdout).contains(help.trim()),
        "Help text missing from stdout:\n{}",
        result.stdout
    );
    assert_eq!(result.stderr_trimmed(), message("no_file_specified"));
}

#[test]
fn test_conflicting_output_formats() {
    let ctx = TestContext::new();
    let result = ctx.check(&[
        &ctx.input("severity"),
        "-mode",
        "exp",
        "-o",
        "report.xml",
        "-j",
        "report.json",
    ]);

    assert_eq!(result.code, 1);
    assert_eq!(result.stderr_trimmed(), message("output_type_conflict"));
    assert!(!ctx.work_dir.path().join("report.xml").exists());
    ctx.no_archives_left();
}

#[test]
fn test_conflict_reported_before_missing_file() {
    let ctx = TestContext::new();
    let result = ctx.check(&["-o", "a.xml", "-x", "a.xmp"]);

    assert_eq!(result.code, 1);
    assert_eq!(result.stderr_trimmed(), message("output_type_conflict"));
}

#[test]
fn test_unrecognized_argument() {
    let ctx = TestContext::new();
    let result = ctx.check(&[&ctx.input("severity"), "-mode", "exp", "--nonsense"]);

    assert_eq!(result.code, 1);
    assert_eq!(
        result.stderr_trimmed(),
        messages::format("unrecognized_argument", &["--nonsense"])
    );
}

#[test]
fn test_directory_requires_mode() {
    let ctx = TestContext::new();
    let input = ctx.input("severity");
    let result = ctx.check(&[&input]);

    assert_eq!(result.code, 1);
    assert_eq!(
        result.stderr_trimmed(),
        messages::format("mode_required", &[&input])
    );
    ctx.no_archives_left();
}

// ============== Severity floors ==============

#[test]
fn test_severity_usage() {
    let ctx = TestContext::new();
    ctx.pass(severity("severity_usage", &["-u"], 1));
    ctx.no_archives_left();
}

#[test]
fn test_severity_warning() {
    let ctx = TestContext::new();
    ctx.pass(severity("severity_warning", &["-w"], 1));
}

#[test]
fn test_severity_error() {
    let ctx = TestContext::new();
    ctx.pass(severity("severity_error", &["-e"], 1));
}

#[test]
fn test_severity_fatal() {
    let ctx = TestContext::new();
    ctx.pass(severity("severity_fatal", &["-f"], 0));
}

#[test]
fn test_severity_streams_split_by_level() {
    let ctx = TestContext::new();
    let result = ctx.check(&[&ctx.input("severity"), "-mode", "exp", "-u"]);

    assert_eq!(result.code, 1);
    assert!(result.stderr.contains("ERROR(RSC-005)"));
    assert!(!result.stdout.contains("ERROR(RSC-005)"));
    assert!(result.stdout.contains("WARNING(OPF-085)"));
    assert!(result.stdout.contains("USAGE(OPF-003)"));
    assert!(result
        .stdout
        .contains("Messages: 0 fatals / 2 errors / 2 warnings / 2 usages"));
}

#[test]
fn test_fatal_reported_under_fatal_floor() {
    let ctx = TestContext::new();
    let result = ctx.check(&[&ctx.input("fatal"), "-mode", "exp", "-f"]);

    assert_eq!(result.code, 1);
    assert!(result
        .stderr
        .contains("FATAL(RSC-016): fatal.epub/OEBPS/chapter1.xhtml(9,3): Fatal Error while parsing file"));
    assert!(!result.stdout.contains("FATAL(RSC-016)"));
    assert!(!result.stdout.contains("OPF-085"));
    assert!(result
        .stdout
        .contains("Messages: 1 fatals / 0 errors / 0 warnings / 0 usages"));
    ctx.no_archives_left();
}

#[test]
fn test_fatal_counted_with_warnings() {
    let ctx = TestContext::new();
    let result = ctx.check(&[&ctx.input("fatal"), "-mode", "exp"]);

    assert_eq!(result.code, 1);
    assert!(result.stderr.contains("FATAL(RSC-016)"));
    assert!(result.stdout.contains("WARNING(OPF-085)"));
    assert!(result
        .stdout
        .contains("Messages: 1 fatals / 0 errors / 1 warnings / 0 usages"));
}

// ============== Custom message overrides ==============

#[test]
fn test_override_ok() {
    let ctx = TestContext::new();
    ctx.pass(severity("overrideOk", &["-u"], 1).override_config("overrideOk.txt"));
}

#[test]
fn test_override_missing_file() {
    let ctx = TestContext::new();
    ctx.pass(
        severity("overrideMissingFile", &["-u"], 1).override_config("overrideMissingFile.txt"),
    );
}

#[test]
fn test_override_bad_id() {
    let ctx = TestContext::new();
    ctx.pass(severity("overrideBadId", &["-u"], 1).override_config("overrideBadId.txt"));
}

#[test]
fn test_override_bad_severity() {
    let ctx = TestContext::new();
    ctx.pass(
        severity("overrideBadSeverity", &["-u"], 1).override_config("overrideBadSeverity.txt"),
    );
}

#[test]
fn test_override_bad_message() {
    let ctx = TestContext::new();
    ctx.pass(
        severity("overrideBadMessage", &["-u"], 1).override_config("overrideBadMessage.txt"),
    );
}

#[test]
fn test_override_malformed_line() {
    let ctx = TestContext::new();
    ctx.pass(
        severity("overrideMalformedLine", &["-u"], 1)
            .override_config("overrideMalformedLine.txt"),
    );
}

#[test]
fn test_override_diagnostics_are_distinct() {
    let ctx = TestContext::new();
    let cases = [
        ("overrideMissingFile.txt", "CHK-001"),
        ("overrideBadId.txt", "CHK-002"),
        ("overrideBadSeverity.txt", "CHK-003"),
        ("overrideBadMessage.txt", "CHK-004"),
        ("overrideMalformedLine.txt", "CHK-005"),
    ];
    for (file, id) in cases {
        let config = corpus_root().join(file).display().to_string();
        let result = ctx.check(&[&ctx.input("severity"), "-mode", "exp", "-c", &config]);
        let chk: Vec<&str> = result
            .stderr
            .lines()
            .filter(|l| l.starts_with("ERROR(CHK-"))
            .collect();
        assert_eq!(chk.len(), 1, "{}: {:?}", file, chk);
        assert!(chk[0].starts_with(&format!("ERROR({})", id)), "{}: {}", file, chk[0]);
    }
}

// ============== Warnings and exit codes ==============

#[test]
fn test_pass_on_warnings() {
    let ctx = TestContext::new();
    ctx.pass(
        TestScenario::expanded("passonwarnings", "passonwarnings")
            .capture(CaptureMode::File)
            .exit_code(0)
            .golden(),
    );
}

#[test]
fn test_fail_on_warnings() {
    let ctx = TestContext::new();
    ctx.pass(
        TestScenario::expanded("failonwarnings", "passonwarnings")
            .arg("--failonwarnings")
            .capture(CaptureMode::File)
            .exit_code(1)
            .golden(),
    );
}

// ============== Reports ==============

#[test]
fn test_json_report() {
    let ctx = TestContext::new();
    ctx.pass(
        TestScenario::expanded("jsonfile", "jsonfile")
            .report(ArtifactFormat::Json)
            .exit_code(0)
            .stdout_contains("Check finished with warnings")
            .golden(),
    );
}

#[test]
fn test_xml_report() {
    let ctx = TestContext::new();
    ctx.pass(
        TestScenario::expanded("xmlfile", "xmlfile")
            .report(ArtifactFormat::Xml)
            .exit_code(0)
            .golden(),
    );
}

#[test]
fn test_xmp_report() {
    let ctx = TestContext::new();
    ctx.pass(
        TestScenario::expanded("xmpfile", "xmlfile")
            .report(ArtifactFormat::Xmp)
            .exit_code(0)
            .golden(),
    );
}

#[test]
fn test_golden_mismatch_is_reported() {
    let ctx = TestContext::new();
    // severity_error run with the usage floor: more lines than the golden
    let scenario = TestScenario::expanded("severity_error", "severity")
        .arg("-u")
        .capture(CaptureMode::File)
        .exit_code(1)
        .golden();
    let result = ctx.runner.run(&Checker, &scenario).expect("Scenario should run");

    assert!(!result.passed);
    assert_eq!(result.failures.len(), 1);
    assert!(result.failures[0].starts_with("golden txt"), "{}", result.failures[0]);
    assert!(ctx
        .runner
        .corpus()
        .actual("severity_error", ArtifactFormat::Text)
        .exists());
}

// ============== Harness guarantees ==============

#[test]
fn test_repeated_invocations_are_identical() {
    let ctx = TestContext::new();
    let args = [ctx.input("severity"), "-mode".into(), "exp".into(), "-u".into()];
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let first = ctx.check(&args);
    let second = ctx.check(&args);
    assert_eq!(first, second);
}

#[test]
fn test_guards_restored_after_invocation() {
    let ctx = TestContext::new();
    let _lock = epubcheck_harness::process::exclusive();
    let cwd = std::env::current_dir().expect("cwd");

    let outer = StreamCapture::in_memory();
    let result = ctx.check(&[&ctx.input("severity"), "-mode", "exp"]);
    assert_eq!(result.code, 1);

    // The outer capture is back in place and the interceptor is gone
    use std::io::Write;
    write!(console::stdout(), "after").expect("write");
    assert_eq!(outer.stdout_text(), "after");
    assert!(!exit::is_guarded());
    assert_eq!(std::env::current_dir().expect("cwd"), cwd);
}

#[test]
fn test_yaml_scenarios() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("scenarios");
    let files = scenario_files(&dir).expect("Scenario dir readable");
    assert!(!files.is_empty());

    for file in files {
        let ctx = TestContext::new();
        let result = ctx
            .runner
            .run_file(&Checker, &file)
            .expect("Scenario should run");
        assert!(
            result.passed,
            "{}: {}",
            file.display(),
            result.failures.join("\n")
        );
    }
}

#[test]
fn test_standalone_binary_matches_in_process() {
    let ctx = TestContext::new();
    let input = ctx.input("severity");
    let in_process = ctx.check(&[&input, "-mode", "exp", "-u"]);

    let output = Command::new(env!("CARGO_BIN_EXE_epubcheck"))
        .args([input.as_str(), "-mode", "exp", "-u"])
        .current_dir(ctx.work_dir.path())
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run epubcheck binary");

    assert_eq!(output.status.code(), Some(in_process.code));
    assert_eq!(String::from_utf8_lossy(&output.stdout), in_process.stdout);
    assert_eq!(String::from_utf8_lossy(&output.stderr), in_process.stderr);
    ctx.no_archives_left();
}

#[test]
fn test_cli_run_matches_code_built_scenarios() {
    use epubcheck_harness::cli;
    use epubcheck_harness::commands::Commands;

    let output_dir = tempfile::tempdir().expect("Failed to create output dir");
    let work_dir = tempfile::tempdir().expect("Failed to create work dir");
    let config = output_dir.path().join("harness.toml");
    std::fs::write(
        &config,
        format!(
            "[corpus]\nwork_dir = {:?}\n\n[runner]\nkeep_actual = false\n",
            work_dir.path().display().to_string()
        ),
    )
    .expect("Failed to write config");
    let scenarios = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("scenarios");

    let code = cli::dispatch(Commands::Run {
        scenarios,
        corpus: Some(corpus_root()),
        output_dir: Some(output_dir.path().to_path_buf()),
        config: Some(config),
        keep_actual: false,
        verbose: true,
        log_file: None,
    })
    .expect("Run command should complete");
    assert_eq!(code, 0);
    assert!(std::fs::read_dir(work_dir.path())
        .expect("Work dir readable")
        .next()
        .is_none());
}
