//! Conversion of raw batches into canonical readings.
//!
//! The upstream value column is named after the time series
//! (`69928_00060`) rather than the parameter, so column roles are inferred
//! from the header. Anything other than one value column and one qualifier
//! column is rejected rather than guessed at.

use tracing::debug;

use super::{parse_timestamp, CanonicalReading, RawObservationBatch};
use crate::error::SchemaError;

pub const TIMESTAMP_COLUMN: &str = "datetime";
pub const ZONE_COLUMN: &str = "tz_cd";
pub const QUALIFIER_SUFFIX: &str = "_cd";
pub const RESERVED_COLUMNS: [&str; 3] = ["agency_cd", "site_no", ZONE_COLUMN];

pub fn is_reserved_column(name: &str) -> bool {
    RESERVED_COLUMNS.contains(&name)
}

/// A data-quality column such as `69928_00060_cd`.
pub fn is_qualifier_column(name: &str) -> bool {
    name.ends_with(QUALIFIER_SUFFIX) && !is_reserved_column(name)
}

/// Column positions resolved from a batch header.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRoles {
    pub timestamp: usize,
    pub value: usize,
    pub qualifier: usize,
    pub zone: Option<usize>,
}

pub fn infer_columns(names: &[&str]) -> Result<ColumnRoles, SchemaError> {
    let timestamp = names
        .iter()
        .position(|n| *n == TIMESTAMP_COLUMN)
        .ok_or_else(|| SchemaError::MissingTimestamp(TIMESTAMP_COLUMN.to_string()))?;

    let zone = names.iter().position(|n| *n == ZONE_COLUMN);

    let value: Vec<usize> = (0..names.len())
        .filter(|&i| {
            let name = names[i];
            i != timestamp && !is_reserved_column(name) && !is_qualifier_column(name)
        })
        .collect();

    let qualifier: Vec<usize> = (0..names.len())
        .filter(|&i| is_qualifier_column(names[i]))
        .collect();

    let named = |positions: &[usize]| -> Vec<String> {
        positions.iter().map(|&i| names[i].to_string()).collect()
    };

    let [value] = value[..] else {
        return Err(SchemaError::ValueColumns(named(&value)));
    };
    let [qualifier] = qualifier[..] else {
        return Err(SchemaError::QualifierColumns(named(&qualifier)));
    };

    Ok(ColumnRoles {
        timestamp,
        value,
        qualifier,
        zone,
    })
}

/// Converts one batch into canonical readings.
///
/// Rows whose timestamp or value cannot be parsed are dropped. The order
/// of the output is not significant.
pub fn normalize(
    batch: RawObservationBatch,
    site_code: &str,
    parameter_code: &str,
) -> Result<Vec<CanonicalReading>, SchemaError> {
    if batch.is_empty() {
        return Ok(Vec::new());
    }

    let batch = batch.reset_index();
    let roles = infer_columns(&batch.column_names())?;

    let rows = batch.num_rows();
    let mut readings = Vec::with_capacity(rows);

    for row in 0..rows {
        let zone = roles.zone.map(|z| cell(&batch, z, row));
        let Some(read_ts) = parse_timestamp(cell(&batch, roles.timestamp, row), zone) else {
            continue;
        };

        let Some(value) = parse_value(cell(&batch, roles.value, row)) else {
            continue;
        };

        let approval_status = cell(&batch, roles.qualifier, row).chars().next();

        let reading =
            CanonicalReading::new(site_code, read_ts, parameter_code, value, approval_status);
        if reading.is_valid() {
            readings.push(reading);
        }
    }

    let dropped = rows - readings.len();
    if dropped > 0 {
        debug!(
            site = site_code,
            parameter = parameter_code,
            dropped,
            "Dropped rows with unusable timestamp or value"
        );
    }

    Ok(readings)
}

fn cell(batch: &RawObservationBatch, column: usize, row: usize) -> &str {
    batch.columns[column]
        .values
        .get(row)
        .map(String::as_str)
        .unwrap_or("")
}

// Service sentinels such as `Ice`, `Eqp` or `***` fail here
fn parse_value(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

// -- Tests -------------------------------------------------------------------
