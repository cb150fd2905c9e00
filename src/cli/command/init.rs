use std::fs;

use anyhow::{Context, Result};
use tracing::info;

use crate::{cli::create_spinner, config::Config, db::SqliteCatalog};

/// Creates the metadata store and lake directory, optionally seeding the
/// default sites.
pub fn init(config: &Config, seed: bool) -> Result<String> {
    let bar = create_spinner("Creating metadata store...".to_string());

    let mut catalog = SqliteCatalog::open(&config.db_path)?;
    catalog.create_schema()?;

    fs::create_dir_all(&config.lake_root).with_context(|| {
        format!("cannot create data lake at {}", config.lake_root.display())
    })?;

    let seeded = if seed { catalog.seed_defaults()? } else { 0 };
    bar.finish_with_message("Metadata store ready");

    info!(
        data_dir = %config.data_dir.display(),
        db = %config.db_path.display(),
        seeded,
        "Initialised metadata store"
    );

    let mut message = format!(
        "Metadata store ready at `{}`\nData lake at `{}`",
        config.db_path.display(),
        config.lake_root.display()
    );
    if seed {
        message.push_str(&format!("\nSeeded {seeded} sites"));
    }

    Ok(message)
}

// -- Tests -------------------------------------------------------------------
