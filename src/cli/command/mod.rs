//! Subcommand implementations. Each returns the message printed on success.

pub mod cutoffs;
pub mod ingest;
pub mod init;
pub mod register;

use anyhow::Result;

use super::Commands;
use crate::{config::Config, pipeline::RunMode};

pub use cutoffs::cutoffs;
pub use ingest::ingest;
pub use init::init;
pub use register::register;

pub async fn execute(command: &Commands, config: &Config) -> Result<String> {
    match command {
        Commands::Init { seed } => init(config, *seed),
        Commands::Register {
            site_code,
            parameters,
            name,
        } => register(config, site_code, parameters, name.as_deref()),
        Commands::Load {
            start_date,
            end_date,
            service,
        } => ingest(config, RunMode::Initial, *start_date, *end_date, *service).await,
        Commands::Update {
            start_date,
            service,
        } => ingest(config, RunMode::Update, *start_date, None, *service).await,
        Commands::Cutoffs { site_code, service } => cutoffs(config, site_code, *service),
    }
}
