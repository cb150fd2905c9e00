//! Writes one site's readings into year partitions.

use std::{
    collections::{BTreeMap, HashMap},
    fs::{self, File},
    path::{Path, PathBuf},
    sync::Arc,
};

use arrow::{
    array::{ArrayRef, Float64Builder, Int64Builder, StringBuilder, TimestampNanosecondBuilder},
    record_batch::RecordBatch,
};
use chrono::NaiveDateTime;
use parquet::{
    arrow::ArrowWriter,
    basic::Compression,
    file::properties::WriterProperties,
};
use tracing::{debug, info, warn};

use super::{
    partition_path, partition_schema, read_partition, PartitionPolicy, PartitionWrite,
    WriteResult,
};
use crate::{
    error::{LakeError, WriteError},
    fetch::ServiceType,
    reading::CanonicalReading,
};

/// Writes into the `timeseries_<service>` tree of one lake.
pub struct LakeWriter {
    root: PathBuf,
    service: ServiceType,
}

impl LakeWriter {
    pub fn new(root: impl Into<PathBuf>, service: ServiceType) -> Self {
        LakeWriter {
            root: root.into(),
            service,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn service(&self) -> ServiceType {
        self.service
    }

    /// Writes `readings` for one site, one file per calendar year.
    ///
    /// Stops at the first failing year; years written before it stay
    /// written.
    pub fn write(
        &self,
        readings: Vec<CanonicalReading>,
        site_code: &str,
        policy: PartitionPolicy,
    ) -> Result<WriteResult, WriteError> {
        if readings.is_empty() {
            warn!(site = site_code, "No data to write");
            return Ok(WriteResult::default());
        }

        let received = readings.len();
        let mut by_year: BTreeMap<i32, Vec<CanonicalReading>> = BTreeMap::new();
        for reading in readings.into_iter().filter(CanonicalReading::is_valid) {
            by_year.entry(reading.year()).or_default().push(reading);
        }

        if by_year.is_empty() {
            warn!(site = site_code, received, "No valid readings to write");
            return Ok(WriteResult::default());
        }

        let mut result = WriteResult::default();

        for (year, group) in by_year {
            let path = partition_path(&self.root, self.service, site_code, year);

            let rows = self
                .write_partition(&path, group, policy)
                .map_err(|source| WriteError {
                    site: site_code.to_string(),
                    year,
                    source,
                })?;

            info!(site = site_code, year, rows, path = %path.display(), "Wrote partition");
            result.partitions.push(PartitionWrite { year, path, rows });
        }

        Ok(result)
    }

    fn write_partition(
        &self,
        path: &Path,
        group: Vec<CanonicalReading>,
        policy: PartitionPolicy,
    ) -> Result<usize, LakeError> {
        let mut rows = match policy {
            PartitionPolicy::Merge if path.exists() => merge(read_partition(path)?, group),
            _ => group,
        };
        sort_readings(&mut rows);

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| LakeError::io(dir, e))?;
        }

        let tmp = path.with_extension("parquet.tmp");
        if let Err(e) = write_file(&tmp, &rows) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        fs::rename(&tmp, path).map_err(|e| LakeError::io(path, e))?;

        Ok(rows.len())
    }
}

/// Ascending by timestamp, then parameter.
pub fn sort_readings(readings: &mut [CanonicalReading]) {
    readings.sort_by(|a, b| {
        a.read_ts
            .cmp(&b.read_ts)
            .then_with(|| a.parameter_code.cmp(&b.parameter_code))
    });
}

// The incoming rows are the complete set for their parameter from their
// earliest timestamp on; existing rows in that span are superseded
fn merge(existing: Vec<CanonicalReading>, incoming: Vec<CanonicalReading>) -> Vec<CanonicalReading> {
    let mut earliest: HashMap<&str, NaiveDateTime> = HashMap::new();
    for reading in &incoming {
        earliest
            .entry(reading.parameter_code.as_str())
            .and_modify(|ts| *ts = (*ts).min(reading.read_ts))
            .or_insert(reading.read_ts);
    }

    let before = existing.len();
    let kept: Vec<CanonicalReading> = existing
        .into_iter()
        .filter(|r| {
            earliest
                .get(r.parameter_code.as_str())
                .map_or(true, |from| r.read_ts < *from)
        })
        .collect();
    let superseded = before - kept.len();

    let merged: Vec<CanonicalReading> = kept.into_iter().chain(incoming).collect();
    debug!(rows = merged.len(), superseded, "Merged with existing partition");

    merged
}

fn write_file(path: &Path, readings: &[CanonicalReading]) -> Result<(), LakeError> {
    let batch = to_record_batch(path, readings)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let file = File::create(path).map_err(|e| LakeError::io(path, e))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .map_err(|e| LakeError::parquet(path, e))?;

    writer.write(&batch).map_err(|e| LakeError::parquet(path, e))?;
    writer.close().map_err(|e| LakeError::parquet(path, e))?;

    Ok(())
}

fn to_record_batch(path: &Path, readings: &[CanonicalReading]) -> Result<RecordBatch, LakeError> {
    let n = readings.len();
    let mut site_builder = StringBuilder::with_capacity(n, n * 8);
    let mut ts_builder = TimestampNanosecondBuilder::with_capacity(n);
    let mut parameter_builder = StringBuilder::with_capacity(n, n * 5);
    let mut value_builder = Float64Builder::with_capacity(n);
    let mut status_builder = StringBuilder::with_capacity(n, n);
    let mut year_builder = Int64Builder::with_capacity(n);

    for reading in readings {
        let nanos = reading
            .read_ts
            .and_utc()
            .timestamp_nanos_opt()
            .ok_or_else(|| LakeError::Timestamp {
                path: path.to_path_buf(),
                value: reading.read_ts.to_string(),
            })?;

        site_builder.append_value(&reading.site_code);
        ts_builder.append_value(nanos);
        parameter_builder.append_value(&reading.parameter_code);
        value_builder.append_value(reading.value);
        status_builder.append_option(reading.approval_status.map(String::from));
        year_builder.append_value(i64::from(reading.year()));
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(site_builder.finish()),
        Arc::new(ts_builder.finish()),
        Arc::new(parameter_builder.finish()),
        Arc::new(value_builder.finish()),
        Arc::new(status_builder.finish()),
        Arc::new(year_builder.finish()),
    ];

    RecordBatch::try_new(partition_schema(), columns).map_err(|e| LakeError::arrow(path, e))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lake::site_partitions;
    use arrow::array::{Array, StringArray, TimestampNanosecondArray};
    use chrono::{Duration, NaiveDate};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::TempDir;

    fn start(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn half_hourly(parameter: &str, from: NaiveDateTime, count: i64) -> Vec<CanonicalReading> {
        (0..count)
            .map(|i| {
                CanonicalReading::new(
                    "09152500",
                    from + Duration::minutes(30 * i),
                    parameter,
                    1000.0 + i as f64,
                    Some('P'),
                )
            })
            .collect()
    }

    fn read_batches(path: &Path) -> Vec<RecordBatch> {
        let file = File::open(path).unwrap();
        ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn should_skip_empty_input_without_io() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("lake");
        let writer = LakeWriter::new(&root, ServiceType::Iv);

        let result = writer
            .write(Vec::new(), "09152500", PartitionPolicy::Replace)
            .unwrap();

        assert!(result.partitions.is_empty());
        assert!(!root.exists());
    }

    #[test]
    fn should_skip_input_with_no_valid_readings() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("lake");
        let writer = LakeWriter::new(&root, ServiceType::Iv);

        let mut readings = half_hourly("00060", start(2020, 1, 1), 2);
        readings[0].value = f64::NAN;
        readings[1].value = f64::INFINITY;

        let result = writer
            .write(readings, "09152500", PartitionPolicy::Replace)
            .unwrap();

        assert!(result.partitions.is_empty());
        assert!(!root.exists());
    }

    #[test]
    fn should_write_sorted_single_partition() {
        let dir = TempDir::new().unwrap();
        let writer = LakeWriter::new(dir.path(), ServiceType::Iv);

        let mut readings = half_hourly("00060", start(2020, 1, 1), 48);
        readings.extend(half_hourly("00010", start(2020, 1, 1), 4));
        readings.reverse();

        let result = writer
            .write(readings, "09152500", PartitionPolicy::Replace)
            .unwrap();

        assert_eq!(result.partitions.len(), 1);
        assert_eq!(result.total_rows(), 52);

        let expected = dir
            .path()
            .join("timeseries_iv/site=09152500/year=2020/data.parquet");
        assert_eq!(result.partitions[0].path, expected);
        assert!(!expected.with_extension("parquet.tmp").exists());

        let batches = read_batches(&expected);
        assert_eq!(batches[0].schema().fields(), partition_schema().fields());

        let ts = batches[0]
            .column_by_name("read_ts")
            .unwrap()
            .as_any()
            .downcast_ref::<TimestampNanosecondArray>()
            .unwrap();
        let values: Vec<i64> = ts.values().iter().copied().collect();
        let mut sorted = values.clone();
        sorted.sort();
        assert_eq!(values, sorted);

        let parameters = batches[0]
            .column_by_name("parameter_code")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(parameters.value(0), "00010");
        assert_eq!(parameters.value(1), "00060");
    }

    #[test]
    fn should_split_partitions_by_year() {
        let dir = TempDir::new().unwrap();
        let writer = LakeWriter::new(dir.path(), ServiceType::Iv);

        let readings = half_hourly("00060", start(2019, 12, 31) + Duration::hours(23), 4);
        let result = writer
            .write(readings, "09152500", PartitionPolicy::Replace)
            .unwrap();

        let years: Vec<(i32, usize)> = result.partitions.iter().map(|p| (p.year, p.rows)).collect();
        assert_eq!(years, vec![(2019, 2), (2020, 2)]);

        let on_disk: Vec<i32> = site_partitions(dir.path(), ServiceType::Iv, "09152500")
            .unwrap()
            .into_iter()
            .map(|(year, _)| year)
            .collect();
        assert_eq!(on_disk, vec![2019, 2020]);

        for partition in &result.partitions {
            let rows = read_partition(&partition.path).unwrap();
            assert!(rows.iter().all(|r| r.year() == partition.year));
        }
    }

    #[test]
    fn should_rewrite_identical_bytes() {
        let dir = TempDir::new().unwrap();
        let writer = LakeWriter::new(dir.path(), ServiceType::Iv);
        let readings = half_hourly("00060", start(2020, 1, 1), 48);

        let first = writer
            .write(readings.clone(), "09152500", PartitionPolicy::Replace)
            .unwrap();
        let before = fs::read(&first.partitions[0].path).unwrap();

        writer
            .write(readings.clone(), "09152500", PartitionPolicy::Replace)
            .unwrap();
        let after_replace = fs::read(&first.partitions[0].path).unwrap();

        writer
            .write(readings, "09152500", PartitionPolicy::Merge)
            .unwrap();
        let after_merge = fs::read(&first.partitions[0].path).unwrap();

        assert_eq!(before, after_replace);
        assert_eq!(before, after_merge);
    }

    #[test]
    fn should_merge_with_existing_partition() {
        let dir = TempDir::new().unwrap();
        let writer = LakeWriter::new(dir.path(), ServiceType::Iv);

        writer
            .write(
                half_hourly("00060", start(2020, 1, 1), 4),
                "09152500",
                PartitionPolicy::Replace,
            )
            .unwrap();

        // Overlaps the last two existing readings and adds one new one
        let mut update = half_hourly("00060", start(2020, 1, 1) + Duration::hours(1), 3);
        for r in update.iter_mut() {
            r.approval_status = Some('A');
        }

        let result = writer
            .write(update, "09152500", PartitionPolicy::Merge)
            .unwrap();
        assert_eq!(result.total_rows(), 5);

        let rows = read_partition(&result.partitions[0].path).unwrap();
        let statuses: Vec<Option<char>> = rows.iter().map(|r| r.approval_status).collect();
        assert_eq!(
            statuses,
            vec![Some('P'), Some('P'), Some('A'), Some('A'), Some('A')]
        );
    }

    #[test]
    fn should_drop_superseded_rows_missing_from_update() {
        let dir = TempDir::new().unwrap();
        let writer = LakeWriter::new(dir.path(), ServiceType::Iv);

        let mut existing = half_hourly("00060", start(2020, 1, 1), 8);
        existing.extend(half_hourly("00065", start(2020, 1, 1), 8));
        writer
            .write(existing, "09152500", PartitionPolicy::Replace)
            .unwrap();

        // Upstream now has two 00060 readings from 02:00 on; 02:30 and later
        // were withdrawn
        let update = half_hourly("00060", start(2020, 1, 1) + Duration::hours(2), 2);
        let result = writer
            .write(update, "09152500", PartitionPolicy::Merge)
            .unwrap();

        let rows = read_partition(&result.partitions[0].path).unwrap();
        let discharge: Vec<NaiveDateTime> = rows
            .iter()
            .filter(|r| r.parameter_code == "00060")
            .map(|r| r.read_ts)
            .collect();

        assert_eq!(discharge.len(), 6);
        assert_eq!(discharge.last(), Some(&(start(2020, 1, 1) + Duration::minutes(150))));
        assert_eq!(rows.iter().filter(|r| r.parameter_code == "00065").count(), 8);
    }

    #[test]
    fn should_keep_service_trees_apart() {
        let dir = TempDir::new().unwrap();
        let readings = half_hourly("00060", start(2020, 1, 1), 4);

        let iv = LakeWriter::new(dir.path(), ServiceType::Iv)
            .write(readings, "09152500", PartitionPolicy::Replace)
            .unwrap();
        let dv = LakeWriter::new(dir.path(), ServiceType::Dv)
            .write(
                vec![CanonicalReading::new("09152500", start(2020, 1, 1), "00060", 9.0, Some('A'))],
                "09152500",
                PartitionPolicy::Replace,
            )
            .unwrap();

        assert_ne!(iv.partitions[0].path, dv.partitions[0].path);
        assert_eq!(read_partition(&iv.partitions[0].path).unwrap().len(), 4);
        assert_eq!(read_partition(&dv.partitions[0].path).unwrap().len(), 1);
    }

    #[test]
    fn should_replace_existing_partition() {
        let dir = TempDir::new().unwrap();
        let writer = LakeWriter::new(dir.path(), ServiceType::Iv);

        writer
            .write(
                half_hourly("00060", start(2020, 1, 1), 10),
                "09152500",
                PartitionPolicy::Replace,
            )
            .unwrap();
        let result = writer
            .write(
                half_hourly("00060", start(2020, 6, 1), 2),
                "09152500",
                PartitionPolicy::Replace,
            )
            .unwrap();

        assert_eq!(read_partition(&result.partitions[0].path).unwrap().len(), 2);
    }

    #[test]
    fn should_drop_non_finite_values_before_writing() {
        let dir = TempDir::new().unwrap();
        let writer = LakeWriter::new(dir.path(), ServiceType::Iv);

        let mut readings = half_hourly("00060", start(2020, 1, 1), 3);
        readings[1].value = f64::NAN;

        let result = writer
            .write(readings, "09152500", PartitionPolicy::Replace)
            .unwrap();

        assert_eq!(result.total_rows(), 2);
        let batches = read_batches(&result.partitions[0].path);
        assert_eq!(batches[0].column_by_name("value").unwrap().null_count(), 0);
    }

    #[test]
    fn should_name_site_and_year_when_write_fails() {
        let dir = TempDir::new().unwrap();
        // A file where the site directory should be
        fs::create_dir_all(dir.path().join("timeseries_iv")).unwrap();
        fs::write(dir.path().join("timeseries_iv/site=09152500"), b"x").unwrap();

        let writer = LakeWriter::new(dir.path(), ServiceType::Iv);
        let err = writer
            .write(
                half_hourly("00060", start(2021, 1, 1), 2),
                "09152500",
                PartitionPolicy::Replace,
            )
            .unwrap_err();

        assert_eq!(err.site, "09152500");
        assert_eq!(err.year, 2021);
    }
}
