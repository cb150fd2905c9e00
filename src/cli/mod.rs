//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    config::{default_data_dir, Config},
    download::RetryPolicy,
    fetch::ServiceType,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Root for the metadata store, data lake and logs
    #[arg(long, global = true, env = "DATA_STORAGE_PATH")]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the NWIS water services
    #[arg(long, global = true, env = "NWIS_SERVICE_URL")]
    pub service_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = 60)]
    pub timeout: u64,

    /// Attempts per request before giving up on transient errors
    #[arg(long, global = true, default_value_t = 3)]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds; doubles per attempt
    #[arg(long, global = true, default_value_t = 1000)]
    pub backoff_ms: u64,

    /// Metadata source whose sites are processed
    #[arg(long, global = true, default_value_t = 1)]
    pub source_id: i64,

    /// Echo informational logs to the console
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    pub fn config(&self) -> Config {
        let data_dir = self.data_dir.clone().unwrap_or_else(default_data_dir);

        let mut config = Config::new(data_dir)
            .with_request_timeout(Duration::from_secs(self.timeout))
            .with_retry(RetryPolicy {
                max_attempts: self.max_attempts,
                base_backoff: Duration::from_millis(self.backoff_ms),
            })
            .with_source_id(self.source_id);

        if let Some(url) = &self.service_url {
            config = config.with_service_url(url);
        }

        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the metadata store
    Init {
        /// Register the default Upper Colorado sites
        #[arg(long)]
        seed: bool,
    },
    /// Add a site and its parameters
    Register {
        site_code: String,
        /// Parameter code, e.g. 00060; repeatable
        #[arg(short, long = "parameter", required = true)]
        parameters: Vec<String>,
        /// Descriptive site name
        #[arg(long)]
        name: Option<String>,
    },
    /// Load full history into the data lake
    Load {
        #[arg(long, default_value = "1900-01-01")]
        start_date: NaiveDate,
        /// Defaults to today
        #[arg(long)]
        end_date: Option<NaiveDate>,
        #[arg(long, value_enum, default_value_t = ServiceType::Iv)]
        service: ServiceType,
    },
    /// Re-fetch from each parameter's last approved reading up to today
    Update {
        /// Used for parameters with no approved readings yet
        #[arg(long, default_value = "1900-01-01")]
        start_date: NaiveDate,
        #[arg(long, value_enum, default_value_t = ServiceType::Iv)]
        service: ServiceType,
    },
    /// Show the last approved reading date per parameter for a site
    Cutoffs {
        site_code: String,
        #[arg(long, value_enum, default_value_t = ServiceType::Iv)]
        service: ServiceType,
    },
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    let style = ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .map(|s| s.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());

    ProgressBar::new(size).with_message(message).with_style(style)
}

// -- Tests -------------------------------------------------------------------
