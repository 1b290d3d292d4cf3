//! Scenario runner
//!
//! Runs named command-line scenarios, built in code or read from YAML,
//! against an entry point in-process, and checks exit codes, console text
//! and golden artifacts.

mod config;
mod runner;

pub use config::*;
pub use runner::{Phase, ScenarioRunner, TestResult};
