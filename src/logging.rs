//! Console and per-run file logging.

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::debug;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

const DEFAULT_DIRECTIVE: &str = "nwis_lake=info";

/// `<log_dir>/<YYYY-mm-dd_HH-MM-SS>.log`
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("{}.log", Local::now().format("%Y-%m-%d_%H-%M-%S")))
}

/// Installs the global subscriber and returns the path of this run's log
/// file.
///
/// The file gets everything `RUST_LOG` allows (default `nwis_lake=info`).
/// The console shows warnings and errors only, or everything the file gets
/// when `verbose` is set.
pub fn init(log_dir: &Path, verbose: bool) -> Result<PathBuf> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("cannot create log directory {}", log_dir.display()))?;

    let path = log_file_path(log_dir);
    let file = File::create(&path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .with_filter(env_filter());

    let console_filter = if verbose {
        env_filter()
    } else {
        EnvFilter::default().add_directive(LevelFilter::WARN.into())
    };
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .compact()
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("logging already initialised")?;

    debug!(path = %path.display(), "Logging initialised");

    Ok(path)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

// -- Tests -------------------------------------------------------------------
