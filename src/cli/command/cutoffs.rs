use anyhow::{Context, Result};

use crate::{config::Config, fetch::ServiceType, pipeline::approval_cutoffs};

pub fn cutoffs(config: &Config, site_code: &str, service: ServiceType) -> Result<String> {
    let cutoffs = approval_cutoffs(&config.lake_root, service, site_code)
        .with_context(|| format!("cannot read {service} partitions for site {site_code}"))?;

    if cutoffs.is_empty() {
        return Ok(format!("No approved {service} readings for site {site_code}"));
    }

    let lines: Vec<String> = cutoffs
        .iter()
        .map(|c| format!("{}\t{}", c.parameter_code, c.last_approved))
        .collect();

    Ok(lines.join("\n"))
}

// -- Tests -------------------------------------------------------------------
