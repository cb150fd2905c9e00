//! Last approved reading per parameter, read from the lake.
//!
//! Approved values do not change upstream, so an update run only needs to
//! re-fetch from the last approved date onward.

use std::{collections::BTreeMap, path::Path};

use chrono::NaiveDate;
use tracing::debug;

use crate::{
    error::LakeError,
    fetch::ServiceType,
    lake::{read_approved, site_partitions},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalCutoff {
    pub parameter_code: String,
    pub last_approved: NaiveDate,
}

/// Cutoffs for every parameter of the site that has at least one approved
/// reading in the service's series, ordered by parameter code.
pub fn approval_cutoffs(
    lake_root: &Path,
    service: ServiceType,
    site_code: &str,
) -> Result<Vec<ApprovalCutoff>, LakeError> {
    let mut latest: BTreeMap<String, NaiveDate> = BTreeMap::new();

    for (year, path) in site_partitions(lake_root, service, site_code)? {
        let approved = read_approved(&path)?;
        debug!(site = site_code, year, approved = approved.len(), "Scanned partition");

        for (parameter_code, read_ts) in approved {
            let date = read_ts.date();
            latest
                .entry(parameter_code)
                .and_modify(|d| *d = (*d).max(date))
                .or_insert(date);
        }
    }

    Ok(latest
        .into_iter()
        .map(|(parameter_code, last_approved)| ApprovalCutoff {
            parameter_code,
            last_approved,
        })
        .collect())
}

// -- Tests -------------------------------------------------------------------
