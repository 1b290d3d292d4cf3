//! EPUB checker verification harness CLI
//!
//! Runs scenario files, single checker invocations and artifact
//! comparisons from the command line.

use clap::Parser;
use epubcheck_harness::{cli, commands};
use commands::Commands;

#[derive(Parser)]
#[command(name = "epubcheck-harness", about = "In-process test harness for an EPUB checker CLI")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn main() {
    let cli = Cli::parse();

    match cli::dispatch(cli.command) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}
