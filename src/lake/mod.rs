//! The partitioned Parquet data lake.
//!
//! One file per `(service, site, year)`:
//! `<root>/timeseries_<service>/site=<code>/year=<yyyy>/data.parquet`, so
//! instantaneous (`iv`) and daily (`dv`) series never share a file. Files
//! are always rewritten whole, never appended to.

pub mod reader;
pub mod writer;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use arrow::datatypes::{DataType, Field, Schema, TimeUnit};

use crate::fetch::ServiceType;

pub use reader::{read_approved, read_partition, site_partitions};
pub use writer::LakeWriter;

pub const TIMESERIES_PREFIX: &str = "timeseries_";
pub const PARTITION_FILE: &str = "data.parquet";

/// `<root>/timeseries_<service>`
pub fn series_dir(root: &Path, service: ServiceType) -> PathBuf {
    root.join(format!("{TIMESERIES_PREFIX}{service}"))
}

pub fn site_dir(root: &Path, service: ServiceType, site_code: &str) -> PathBuf {
    series_dir(root, service).join(format!("site={site_code}"))
}

pub fn partition_path(root: &Path, service: ServiceType, site_code: &str, year: i32) -> PathBuf {
    site_dir(root, service, site_code)
        .join(format!("year={year}"))
        .join(PARTITION_FILE)
}

/// On-disk schema shared by every partition.
pub fn partition_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("site_code", DataType::Utf8, false),
        Field::new(
            "read_ts",
            DataType::Timestamp(TimeUnit::Nanosecond, None),
            false,
        ),
        Field::new("parameter_code", DataType::Utf8, false),
        Field::new("value", DataType::Float64, false),
        Field::new("approval_status", DataType::Utf8, true),
        Field::new("year", DataType::Int64, false),
    ]))
}

/// How incoming readings combine with a partition already on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionPolicy {
    /// The incoming readings are the whole partition.
    Replace,
    /// For each incoming parameter, existing rows from its earliest
    /// incoming `read_ts` onward are replaced by the incoming rows; older
    /// rows and other parameters are kept.
    Merge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartitionWrite {
    pub year: i32,
    pub path: PathBuf,
    pub rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteResult {
    pub partitions: Vec<PartitionWrite>,
}

impl WriteResult {
    pub fn total_rows(&self) -> usize {
        self.partitions.iter().map(|p| p.rows).sum()
    }
}

// -- Tests -------------------------------------------------------------------
