use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};

use crate::{
    config::Config,
    db::SqliteCatalog,
    fetch::{NwisSource, ServiceType},
    pipeline::{RunCoordinator, RunMode},
};

/// Runs the pipeline against the NWIS service and returns the summary.
pub async fn ingest(
    config: &Config,
    mode: RunMode,
    start: NaiveDate,
    end: Option<NaiveDate>,
    service: ServiceType,
) -> Result<String> {
    let end = end.unwrap_or_else(|| Local::now().date_naive());

    let catalog = SqliteCatalog::open_existing(&config.db_path)
        .context("metadata store unavailable; run `nwis_lake init` first")?;
    let source = NwisSource::new(config).context("cannot build HTTP client")?;

    let summary = RunCoordinator::new(config, catalog, source)
        .with_service(service)
        .run(mode, start, end)
        .await?;

    Ok(summary.to_string())
}
