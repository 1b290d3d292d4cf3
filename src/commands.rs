//! CLI command definitions
//!
//! Defines the clap commands for the harness CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run YAML scenarios against the built-in checker
    Run {
        /// Scenario file, or a directory of *.yaml scenarios
        scenarios: PathBuf,

        /// Fixture corpus root (overrides the config file)
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Directory for actual artifacts (overrides the config file)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Configuration file (default: platform config dir)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Keep actual artifacts of passing scenarios
        #[arg(long)]
        keep_actual: bool,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,

        /// Also write logs to a file (default: platform log dir)
        #[arg(long, num_args = 0..=1)]
        log_file: Option<Option<PathBuf>>,
    },

    /// Invoke the built-in checker in-process and show what it produced
    Check {
        /// Directory to run the checker in
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Send both output channels to this file
        #[arg(long)]
        redirect: Option<PathBuf>,

        /// Arguments passed to the checker
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Compare an actual artifact against a golden one
    Compare {
        /// Golden (expected) artifact
        expected: PathBuf,

        /// Actual artifact
        actual: PathBuf,

        /// Artifact format: text, json, xml or xmp (default: from extension)
        #[arg(long)]
        format: Option<String>,

        /// Configuration file supplying normalization rules
        #[arg(long)]
        config: Option<PathBuf>,
    },
}
