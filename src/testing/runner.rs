//! Scenario runner implementation
//!
//! Drives one scenario through PREPARE, INVOKE, CAPTURE-COMPLETE, COMPARE
//! and CLEANUP. Assertion failures are collected rather than aborting, so a
//! result lists everything that was wrong with a run.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::checker;
use crate::common::config::Config;
use crate::common::paths::Corpus;
use crate::common::{Error, Result};
use crate::golden::{assert_contains_normalized, assert_trimmed_eq, ArtifactFormat, Comparator, GoldenError};
use crate::invoke::{invoke, EntryPoint, InvocationRequest, InvocationResult};

use super::config::{CaptureMode, TestScenario};

/// Scenario lifecycle phases, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Prepare,
    Invoke,
    CaptureComplete,
    Compare,
    Cleanup,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Prepare => "PREPARE",
            Phase::Invoke => "INVOKE",
            Phase::CaptureComplete => "CAPTURE-COMPLETE",
            Phase::Compare => "COMPARE",
            Phase::Cleanup => "CLEANUP",
            Phase::Done => "DONE",
        })
    }
}

/// Result of a scenario run
#[derive(Debug)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    /// Last phase completed before CLEANUP, or `Done` when every phase ran
    pub phase: Phase,
    pub exit_code: Option<i32>,
    pub failures: Vec<String>,
    pub invocation: Option<InvocationResult>,
}

/// Runs scenarios against an entry point
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    corpus: Corpus,
    comparator: Comparator,
    work_dir: PathBuf,
    keep_actual: bool,
    verbose: bool,
    variables: HashMap<String, String>,
}

impl ScenarioRunner {
    pub fn new(corpus: Corpus, comparator: Comparator) -> Self {
        let work_dir = corpus.output_dir().to_path_buf();
        let mut variables = HashMap::new();
        variables.insert("version".to_string(), checker::version().to_string());
        variables.insert("corpus".to_string(), corpus.root().display().to_string());
        variables.insert("output".to_string(), corpus.output_dir().display().to_string());
        Self {
            corpus,
            comparator,
            work_dir,
            keep_actual: false,
            verbose: false,
            variables,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let comparator = Comparator::from_config(&config.golden)?;
        let mut runner = Self::new(config.corpus(), comparator).keep_actual(config.runner.keep_actual);
        if let Some(dir) = &config.corpus.work_dir {
            runner = runner.work_dir(dir);
        }
        Ok(runner)
    }

    /// Directory the checker runs in; temp archives appear here
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn keep_actual(mut self, keep: bool) -> Self {
        self.keep_actual = keep;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Add a `{name}` substitution for expectation strings
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Replace every `{name}` with its variable value
    pub fn substitute(&self, text: &str) -> String {
        self.variables
            .iter()
            .fold(text.to_string(), |acc, (name, value)| {
                acc.replace(&format!("{{{}}}", name), value)
            })
    }

    /// Run a scenario loaded from a YAML file
    pub fn run_file<E>(&self, entry: &E, path: &Path) -> Result<TestResult>
    where
        E: EntryPoint + ?Sized,
    {
        let scenario = TestScenario::load(path)?;
        self.run(entry, &scenario)
    }

    /// Run one scenario.
    ///
    /// Fixture and configuration problems found in PREPARE are errors. From
    /// INVOKE on, every problem is a failure recorded in the [`TestResult`]
    /// and CLEANUP still runs.
    pub fn run<E>(&self, entry: &E, scenario: &TestScenario) -> Result<TestResult>
    where
        E: EntryPoint + ?Sized,
    {
        println!(
            "\n{} {}",
            "Running Scenario:".blue().bold(),
            scenario.name.white().bold()
        );
        if let Some(desc) = &scenario.description {
            println!("  {}", desc.dimmed());
        }

        // PREPARE
        let prepared = self.prepare(scenario)?;
        self.step(Phase::Prepare, &prepared.request.args().join(" "));

        // INVOKE
        let mut failures = Vec::new();
        let mut phase = Phase::Prepare;
        let invocation = match invoke(entry, &prepared.request) {
            Ok(invocation) => {
                phase = Phase::Invoke;
                self.step(Phase::Invoke, &format!("exit code {}", invocation.code));
                Some(invocation)
            }
            Err(e) => {
                failures.push(format!("Invocation failed: {}", e));
                None
            }
        };

        if let Some(invocation) = &invocation {
            // CAPTURE-COMPLETE
            match self.captured(invocation) {
                Ok((stdout, stderr)) => {
                    phase = Phase::CaptureComplete;
                    self.step(Phase::CaptureComplete, &format!("{} bytes captured", stdout.len()));

                    // COMPARE
                    self.compare(scenario, &prepared, invocation, &stdout, &stderr, &mut failures);
                    phase = Phase::Compare;
                    if failures.is_empty() {
                        self.step(Phase::Compare, "all expectations met");
                    }
                }
                Err(e) => failures.push(e.to_string()),
            }
        }

        // CLEANUP runs whatever happened above
        self.cleanup(scenario, &prepared, failures.is_empty(), &mut failures);
        if phase == Phase::Compare {
            phase = Phase::Done;
        }

        let passed = failures.is_empty();
        for failure in &failures {
            println!("  {} {}", "✗".red(), failure);
        }
        if passed {
            println!("\n{} {}\n", "✓".green().bold(), "Scenario Passed".green().bold());
        } else {
            println!("\n{} {}\n", "✗".red().bold(), "Scenario Failed".red().bold());
        }

        let exit_code = invocation.as_ref().map(|i| i.code);
        tracing::info!(scenario = %scenario.name, passed, code = ?exit_code, %phase, "scenario finished");
        Ok(TestResult {
            name: scenario.name.clone(),
            passed,
            phase,
            exit_code,
            failures,
            invocation,
        })
    }

    /// Stdout and stderr text; a shared capture file stands for both
    fn captured(&self, invocation: &InvocationResult) -> Result<(String, String)> {
        match &invocation.output_file {
            Some(path) => {
                let bytes = fs::read(path).map_err(|e| Error::file_read(path, &e))?;
                let text = String::from_utf8_lossy(&bytes).into_owned();
                Ok((text.clone(), text))
            }
            None => Ok((invocation.stdout.clone(), invocation.stderr.clone())),
        }
    }

    fn step(&self, phase: Phase, detail: &str) {
        if self.verbose {
            println!("  {} {} {}", "✓".green(), phase, detail.dimmed());
        } else {
            println!("  {} {}", "✓".green(), phase);
        }
    }

    fn prepare(&self, scenario: &TestScenario) -> Result<Prepared> {
        self.corpus.ensure_output_dir()?;
        fs::create_dir_all(&self.work_dir)?;

        let mut artifacts = Vec::new();
        if scenario.capture == CaptureMode::File {
            artifacts.push(ArtifactFormat::Text);
        }
        artifacts.extend(scenario.report);

        // No stale actuals
        for format in [
            ArtifactFormat::Text,
            ArtifactFormat::Json,
            ArtifactFormat::Xml,
            ArtifactFormat::Xmp,
        ] {
            let stale = self.corpus.actual(&scenario.name, format);
            if stale.exists() {
                tracing::debug!(path = %stale.display(), "removing stale actual artifact");
                fs::remove_file(&stale)?;
            }
        }

        // The checker runs inside the work dir, so every path it gets is absolute
        let mut request = InvocationRequest::default().working_dir(absolute(&self.work_dir)?);
        if let Some(input) = &scenario.input {
            let path = absolute(&self.corpus.resource(input))?;
            if !path.exists() {
                return Err(Error::fixture_missing("Input", &path));
            }
            request = request.arg(path.display().to_string());
        }
        if let Some(mode) = &scenario.mode {
            request = request.arg("-mode").arg(mode.as_str());
        }
        for arg in &scenario.args {
            request = request.arg(self.substitute(arg));
        }
        if let Some(config) = &scenario.override_config {
            request = request
                .arg("-c")
                .arg(absolute(&self.corpus.resource(config))?.display().to_string());
        }
        if let Some(format) = scenario.report {
            let flag = match format {
                ArtifactFormat::Json => "-j",
                ArtifactFormat::Xml => "-o",
                ArtifactFormat::Xmp => "-x",
                ArtifactFormat::Text => {
                    return Err(Error::Config(format!(
                        "scenario '{}': text is not a report format",
                        scenario.name
                    )))
                }
            };
            request = request.arg(flag).arg(
                absolute(&self.corpus.actual(&scenario.name, format))?
                    .display()
                    .to_string(),
            );
        }
        if scenario.capture == CaptureMode::File {
            request = request.redirect_to(absolute(
                &self.corpus.actual(&scenario.name, ArtifactFormat::Text),
            )?);
        }

        Ok(Prepared { request, artifacts })
    }

    fn compare(
        &self,
        scenario: &TestScenario,
        prepared: &Prepared,
        invocation: &InvocationResult,
        stdout: &str,
        stderr: &str,
        failures: &mut Vec<String>,
    ) {
        let expect = &scenario.expect;

        if invocation.code != expect.exit_code {
            failures.push(format!(
                "Expected exit code {}, got {}",
                expect.exit_code, invocation.code
            ));
        }

        let mut record = |what: &str, outcome: std::result::Result<(), GoldenError>| {
            if let Err(e) = outcome {
                failures.push(format!("{}: {}", what, e));
            }
        };

        if let Some(expected) = &expect.stdout_equals {
            record("stdout", assert_trimmed_eq(&self.substitute(expected), stdout));
        }
        if let Some(expected) = &expect.stderr_equals {
            record("stderr", assert_trimmed_eq(&self.substitute(expected), stderr));
        }
        for needle in &expect.stdout_contains {
            record("stdout", assert_contains_normalized(stdout, &self.substitute(needle)));
        }
        for needle in &expect.stderr_contains {
            record("stderr", assert_contains_normalized(stderr, &self.substitute(needle)));
        }

        if expect.golden {
            if prepared.artifacts.is_empty() {
                record(
                    "golden",
                    Err(GoldenError::ActualMissing(
                        self.corpus.actual(&scenario.name, ArtifactFormat::Text),
                    )),
                );
            }
            for format in &prepared.artifacts {
                let expected = self.corpus.expected(&scenario.name, *format);
                let actual = self.corpus.actual(&scenario.name, *format);
                let outcome = self.comparator.compare(&expected, &actual, *format);
                if let Err(GoldenError::Mismatch { diff: Some(diff), .. }) = &outcome {
                    if self.verbose {
                        println!("{}", diff.dimmed());
                    }
                }
                record(&format!("golden {}", format), outcome);
            }
        }
    }

    fn cleanup(
        &self,
        scenario: &TestScenario,
        prepared: &Prepared,
        passed: bool,
        failures: &mut Vec<String>,
    ) {
        for leftover in self.leftover_archives(scenario) {
            failures.push(format!("Temporary archive left behind: {}", leftover.display()));
            if let Err(e) = fs::remove_file(&leftover) {
                tracing::warn!(path = %leftover.display(), error = %e, "failed to remove leftover archive");
            }
        }

        if passed && !self.keep_actual {
            for format in &prepared.artifacts {
                let actual = self.corpus.actual(&scenario.name, *format);
                if let Err(e) = fs::remove_file(&actual) {
                    tracing::debug!(path = %actual.display(), error = %e, "actual artifact not removed");
                }
            }
        }
        self.step(Phase::Cleanup, &self.work_dir.display().to_string());
    }

    /// `<test>.epub` and `<input>.epub` in the working directory
    fn leftover_archives(&self, scenario: &TestScenario) -> Vec<PathBuf> {
        let mut names = vec![format!("{}.epub", scenario.name)];
        if let Some(stem) = scenario
            .input
            .as_deref()
            .and_then(|input| Path::new(input).file_name())
        {
            let name = format!("{}.epub", stem.to_string_lossy());
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
            .into_iter()
            .map(|name| self.work_dir.join(name))
            .filter(|path| path.exists())
            .collect()
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}

/// PREPARE output
#[derive(Debug)]
struct Prepared {
    request: InvocationRequest,
    /// Actual artifacts this run produces
    artifacts: Vec<ArtifactFormat>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::console;
    use crate::process::exit::terminate;
    use std::io::Write;

    fn runner(root: &Path, out: &Path) -> ScenarioRunner {
        ScenarioRunner::new(Corpus::new(root, out), Comparator::default())
    }

    fn greeter(args: &[String]) {
        writeln!(console::stdout(), "hello {}", args.join(" ")).ok();
        if args.iter().any(|a| a == "--fail") {
            writeln!(console::stderr(), "failing as asked").ok();
            terminate(3);
        }
    }

    #[test]
    fn test_phase_order_and_display() {
        assert!(Phase::Prepare < Phase::Invoke);
        assert!(Phase::Cleanup < Phase::Done);
        assert_eq!(Phase::CaptureComplete.to_string(), "CAPTURE-COMPLETE");
    }

    #[test]
    fn test_substitute_variables() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path(), dir.path()).variable("who", "world");
        assert_eq!(runner.substitute("hi {who} {missing}"), "hi world {missing}");
        assert_eq!(
            runner.substitute("EPUBCheck v{version}"),
            format!("EPUBCheck v{}", checker::version())
        );
    }

    #[test]
    fn test_run_collects_every_failure() {
        let dir = tempfile::tempdir().unwrap();
        let scenario = TestScenario::new("fails")
            .arg("--fail")
            .exit_code(0)
            .stdout_equals("goodbye")
            .stderr_contains("failing as asked");

        let result = runner(dir.path(), dir.path()).run(&greeter, &scenario).unwrap();
        assert!(!result.passed);
        assert_eq!(result.phase, Phase::Done);
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.failures.len(), 2);
        assert!(result.failures[0].contains("Expected exit code 0, got 3"));
        assert!(result.failures[1].starts_with("stdout"));
    }

    #[test]
    fn test_missing_input_is_fixture_error() {
        let dir = tempfile::tempdir().unwrap();
        let scenario = TestScenario::expanded("nope", "no_such_folder");
        let err = runner(dir.path(), dir.path()).run(&greeter, &scenario).unwrap_err();
        assert!(err.is_fixture_absent());
    }

    #[test]
    fn test_golden_text_capture_and_cleanup() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(
            root.path().join("greet_expected_results.txt"),
            "hello   a  b\n\n",
        )
        .unwrap();

        let scenario = TestScenario::new("greet")
            .arg("a")
            .arg("b")
            .capture(CaptureMode::File)
            .golden();
        let runner = runner(root.path(), out.path());
        let result = runner.run(&greeter, &scenario).unwrap();

        assert!(result.passed, "{:?}", result.failures);
        assert!(!runner
            .corpus()
            .actual("greet", ArtifactFormat::Text)
            .exists());
    }

    #[test]
    fn test_leftover_archive_fails_scenario() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("book")).unwrap();
        let work = tempfile::tempdir().unwrap();
        let litter = |_: &[String]| {
            std::fs::write("book.epub", b"PK").ok();
        };

        let scenario = TestScenario::expanded("litter", "book");
        let result = runner(root.path(), work.path())
            .run(&litter, &scenario)
            .unwrap();
        assert!(!result.passed);
        assert!(result.failures[0].contains("Temporary archive left behind"));
        assert!(!work.path().join("book.epub").exists());
    }

    #[test]
    fn test_file_capture_decodes_lossily_and_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("book")).unwrap();
        let work = tempfile::tempdir().unwrap();
        let garbled = |_: &[String]| {
            std::fs::write("book.epub", b"PK").ok();
            console::stdout().write_all(b"bad \xff bytes\n").ok();
        };

        let scenario = TestScenario::expanded("garbled", "book")
            .capture(CaptureMode::File)
            .stdout_contains("bad");
        let result = runner(root.path(), work.path())
            .run(&garbled, &scenario)
            .unwrap();

        assert_eq!(result.phase, Phase::Done);
        assert_eq!(result.failures.len(), 1, "{:?}", result.failures);
        assert!(result.failures[0].contains("Temporary archive left behind"));
        assert!(!work.path().join("book.epub").exists());
    }

    #[test]
    fn test_unreadable_capture_still_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("book")).unwrap();
        let work = tempfile::tempdir().unwrap();
        let capture = work.path().join("vanish_actual_results.txt");
        let vanish = |_: &[String]| {
            std::fs::write("book.epub", b"PK").ok();
            std::fs::remove_file(&capture).ok();
        };

        let scenario = TestScenario::expanded("vanish", "book").capture(CaptureMode::File);
        let result = runner(root.path(), work.path())
            .run(&vanish, &scenario)
            .unwrap();

        assert!(!result.passed);
        assert_eq!(result.phase, Phase::Invoke);
        assert_eq!(result.exit_code, Some(0));
        assert!(result.failures[0].starts_with("Failed to read file"));
        assert!(result
            .failures
            .iter()
            .any(|f| f.contains("Temporary archive left behind")));
        assert!(!work.path().join("book.epub").exists());
    }
}
