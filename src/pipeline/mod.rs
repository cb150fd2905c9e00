//! The ETL pipeline: per-site fetch and normalize, incremental window
//! selection, and the run loop over all sites.

pub mod incremental;
pub mod run;
pub mod site;

use std::fmt;

use crate::lake::PartitionPolicy;

pub use incremental::approval_cutoffs;
pub use run::RunCoordinator;
pub use site::{FetchWindow, ParameterStats, SiteOutcome, SiteProcessor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Full history load; partitions are replaced.
    Initial,
    /// Re-fetch from the last approved reading; partitions are merged.
    Update,
}

impl RunMode {
    pub fn policy(&self) -> PartitionPolicy {
        match self {
            RunMode::Initial => PartitionPolicy::Replace,
            RunMode::Update => PartitionPolicy::Merge,
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Initial => f.write_str("initial"),
            RunMode::Update => f.write_str("update"),
        }
    }
}
