//! Titanic survival predictor CLI
//!
//! Predicts passenger survival with published model versions and runs the
//! statistical analyses behind them.

use anyhow::Result;
use clap::Parser;

use titanic_predictor::cli::{run_command, Cli};
use titanic_predictor::utils::{print_banner, print_completion};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    print_banner(env!("CARGO_PKG_VERSION"));

    run_command(&cli)?;

    print_completion();
    Ok(())
}
