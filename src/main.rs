mod cli;
mod config;
mod db;
mod download;
mod error;
mod fetch;
mod lake;
mod logging;
mod pipeline;
mod reading;

use std::{future::Future, io};

use anyhow::{anyhow, Result};
use clap::Parser;
use cli::{command, Cli};
use tracing::error;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = cli.global.config();

    if let Err(e) = logging::init(&config.log_dir, cli.global.verbose) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }

    let result = interruptible(
        command::execute(&cli.command, &config),
        tokio::signal::ctrl_c(),
    )
    .await;

    match result {
        Ok(message) => println!("{message}"),
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

/// Runs `command` until it finishes or `signal` fires. A signal that fails
/// to install is ignored.
async fn interruptible<C, S>(command: C, signal: S) -> Result<String>
where
    C: Future<Output = Result<String>>,
    S: Future<Output = io::Result<()>>,
{
    tokio::select! {
        result = command => result,
        Ok(()) = signal => Err(anyhow!("interrupted")),
    }
}

// -- Tests -------------------------------------------------------------------
