//! CLI command handling
//!
//! Dispatches harness commands and formats their output.

use std::path::Path;

use colored::Colorize;

use crate::checker::Checker;
use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{logging, Error, Result};
use crate::golden::{ArtifactFormat, Comparator};
use crate::invoke::{invoke, InvocationRequest};
use crate::testing::{scenario_files, ScenarioRunner};

/// Dispatch a CLI command, returning the process exit code
pub fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Run {
            scenarios,
            corpus,
            output_dir,
            config,
            keep_actual,
            verbose,
            log_file,
        } => {
            match log_file.map(|path| path.or_else(logging::default_log_path)) {
                Some(Some(path)) => {
                    logging::init_with_log_file(&path);
                }
                _ => logging::init_cli(),
            }

            let mut config = load_config(config.as_deref())?;
            if let Some(root) = corpus {
                config.corpus.root = root;
            }
            if let Some(dir) = output_dir {
                config.corpus.output_dir = dir;
            }
            config.runner.keep_actual |= keep_actual;

            let runner = ScenarioRunner::from_config(&config)?.verbose(verbose);
            let files = scenario_files(&scenarios)?;
            if files.is_empty() {
                return Err(Error::fixture_missing("Scenario files", &scenarios));
            }

            let mut failed = Vec::new();
            for file in &files {
                let result = runner.run_file(&Checker, file)?;
                if !result.passed {
                    failed.push(result.name);
                }
            }

            let passed = files.len() - failed.len();
            println!(
                "{} {} passed, {} failed",
                "Summary:".blue().bold(),
                passed.to_string().green(),
                if failed.is_empty() {
                    failed.len().to_string().normal()
                } else {
                    failed.len().to_string().red()
                }
            );
            for name in &failed {
                println!("  {} {}", "✗".red(), name);
            }
            Ok(if failed.is_empty() { 0 } else { 1 })
        }

        Commands::Check {
            work_dir,
            redirect,
            args,
        } => {
            logging::init_cli();

            let mut request = InvocationRequest::new(args);
            if let Some(dir) = work_dir {
                request = request.working_dir(dir);
            }
            if let Some(path) = redirect {
                request = request.redirect_to(path);
            }

            let result = invoke(&Checker, &request)?;
            if let Some(path) = &result.output_file {
                println!("{} {}", "Output file:".cyan(), path.display());
            } else {
                println!("{}", "stdout:".cyan());
                print!("{}", result.stdout);
                println!("{}", "stderr:".cyan());
                print!("{}", result.stderr);
            }
            println!("{} {}", "Exit code:".cyan(), result.code);
            Ok(result.code)
        }

        Commands::Compare {
            expected,
            actual,
            format,
            config,
        } => {
            logging::init_cli();

            let config = load_config(config.as_deref())?;
            let format = match format {
                Some(name) => name.parse::<ArtifactFormat>().map_err(Error::Config)?,
                None => ArtifactFormat::from_path(&expected),
            };
            let comparator = Comparator::from_config(&config.golden)?;

            match comparator.compare(&expected, &actual, format) {
                Ok(()) => {
                    println!("{} artifacts match ({})", "✓".green(), format);
                    Ok(0)
                }
                Err(e) => {
                    println!("{} {}", "✗".red(), e);
                    if let Some(diff) = e.diff() {
                        println!("{}", diff);
                    }
                    Ok(1)
                }
            }
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}
