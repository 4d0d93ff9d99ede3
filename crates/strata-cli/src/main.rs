#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod runner;

use std::process;

use crate::config::{Cli, Command};

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "strata_cli::startup";
pub const TRACING_TARGET_CONFIG: &str = "strata_cli::config";
pub const TRACING_TARGET_RUN: &str = "strata_cli::run";

#[tokio::main]
async fn main() {
    let error = match run().await {
        Ok(code) => process::exit(code),
        Err(error) => error,
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_RUN,
            error = %error,
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(runner::EXIT_FAILURE);
}

/// Main application entry point, returning the process exit code.
async fn run() -> anyhow::Result<i32> {
    let cli = Cli::init();
    cli.init_tracing();

    match cli.command {
        Command::Run(config) => runner::run(config).await,
    }
}
