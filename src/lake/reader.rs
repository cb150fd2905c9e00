//! Reads partitions back from the lake.

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use arrow::array::{Array, Float64Array, StringArray, TimestampNanosecondArray};
use chrono::{DateTime, NaiveDateTime};
use parquet::arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ProjectionMask};

use super::{site_dir, PARTITION_FILE};
use crate::{
    error::LakeError,
    fetch::ServiceType,
    reading::{CanonicalReading, APPROVED},
};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

const APPROVAL_COLUMNS: [&str; 3] = ["parameter_code", "read_ts", "approval_status"];

/// All readings in one partition file, in file order.
pub fn read_partition(path: &Path) -> Result<Vec<CanonicalReading>, LakeError> {
    let file = File::open(path).map_err(|e| LakeError::io(path, e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .and_then(|builder| builder.build())
        .map_err(|e| LakeError::parquet(path, e))?;

    let mut readings = Vec::new();

    for batch in reader {
        let batch = batch.map_err(|e| LakeError::arrow(path, e))?;

        let site = column::<StringArray>(&batch, path, "site_code")?;
        let read_ts = column::<TimestampNanosecondArray>(&batch, path, "read_ts")?;
        let parameter = column::<StringArray>(&batch, path, "parameter_code")?;
        let value = column::<Float64Array>(&batch, path, "value")?;
        let status = column::<StringArray>(&batch, path, "approval_status")?;

        for row in 0..batch.num_rows() {
            let nanos = read_ts.value(row);
            let ts = from_nanos(nanos).ok_or_else(|| LakeError::Timestamp {
                path: path.to_path_buf(),
                value: nanos.to_string(),
            })?;

            let approval_status = if status.is_null(row) {
                None
            } else {
                status.value(row).chars().next()
            };

            readings.push(CanonicalReading::new(
                site.value(row),
                ts,
                parameter.value(row),
                value.value(row),
                approval_status,
            ));
        }
    }

    Ok(readings)
}

/// `(parameter_code, read_ts)` of every approved row in one partition.
///
/// Only the three columns involved are decoded.
pub fn read_approved(path: &Path) -> Result<Vec<(String, NaiveDateTime)>, LakeError> {
    let file = File::open(path).map_err(|e| LakeError::io(path, e))?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| LakeError::parquet(path, e))?;

    let mut roots = Vec::with_capacity(APPROVAL_COLUMNS.len());
    for name in APPROVAL_COLUMNS {
        let index = builder
            .schema()
            .index_of(name)
            .map_err(|_| LakeError::column(path, name))?;
        roots.push(index);
    }
    let mask = ProjectionMask::roots(builder.parquet_schema(), roots);

    let reader = builder
        .with_projection(mask)
        .build()
        .map_err(|e| LakeError::parquet(path, e))?;

    let mut approved = Vec::new();

    for batch in reader {
        let batch = batch.map_err(|e| LakeError::arrow(path, e))?;

        let parameter = column::<StringArray>(&batch, path, "parameter_code")?;
        let read_ts = column::<TimestampNanosecondArray>(&batch, path, "read_ts")?;
        let status = column::<StringArray>(&batch, path, "approval_status")?;

        for row in 0..batch.num_rows() {
            if status.is_null(row) || !status.value(row).starts_with(APPROVED) {
                continue;
            }

            let nanos = read_ts.value(row);
            let ts = from_nanos(nanos).ok_or_else(|| LakeError::Timestamp {
                path: path.to_path_buf(),
                value: nanos.to_string(),
            })?;
            approved.push((parameter.value(row).to_string(), ts));
        }
    }

    Ok(approved)
}

/// `(year, path)` for each partition of a site, ascending by year.
///
/// A site with no directory has no partitions.
pub fn site_partitions(
    root: &Path,
    service: ServiceType,
    site_code: &str,
) -> Result<Vec<(i32, PathBuf)>, LakeError> {
    let dir = site_dir(root, service, site_code);

    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(LakeError::io(&dir, e)),
    };

    let mut partitions = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LakeError::io(&dir, e))?;
        let name = entry.file_name();

        let Some(year) = name
            .to_str()
            .and_then(|n| n.strip_prefix("year="))
            .and_then(|y| y.parse::<i32>().ok())
        else {
            continue;
        };

        let file = entry.path().join(PARTITION_FILE);
        if file.is_file() {
            partitions.push((year, file));
        }
    }

    partitions.sort_by_key(|(year, _)| *year);

    Ok(partitions)
}

fn column<'a, T: Array + 'static>(
    batch: &'a arrow::record_batch::RecordBatch,
    path: &Path,
    name: &str,
) -> Result<&'a T, LakeError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| LakeError::column(path, name))
}

fn from_nanos(nanos: i64) -> Option<NaiveDateTime> {
    let secs = nanos.div_euclid(NANOS_PER_SECOND);
    let nsecs = nanos.rem_euclid(NANOS_PER_SECOND) as u32;

    DateTime::from_timestamp(secs, nsecs).map(|dt| dt.naive_utc())
}

// -- Tests -------------------------------------------------------------------
