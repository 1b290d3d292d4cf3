//! Stand-in EPUB checker binary
//!
//! The same checker the harness drives in-process, run as a real process:
//! console output goes to the real streams and the exit code ends the
//! process.

use epubcheck_harness::checker;
use epubcheck_harness::common::logging;

fn main() {
    // Console output is the product here; keep diagnostics quiet by default
    logging::init_with_default("warn");

    let args: Vec<String> = std::env::args().skip(1).collect();
    checker::main_with_args(&args)
}
