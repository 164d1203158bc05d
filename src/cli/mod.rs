//! CLI module - argument parsing, interactive prompts and command runners

pub mod args;
pub mod commands;
pub mod prompts;

pub use args::{Cli, Commands, DEFAULT_ARTIFACTS, DEFAULT_DATA, DEFAULT_VERSION};
pub use commands::{run_command, PredictInputs};
pub use prompts::*;
