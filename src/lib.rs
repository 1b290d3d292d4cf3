//! EPUB checker verification harness
//!
//! Runs a command-line checker in-process with its exit requests
//! intercepted and its console output captured, then compares what it
//! produced against golden files.

pub mod checker;
pub mod cli;
pub mod commands;
pub mod common;
pub mod golden;
pub mod invoke;
pub mod process;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use invoke::{invoke, EntryPoint, InvocationRequest, InvocationResult};
