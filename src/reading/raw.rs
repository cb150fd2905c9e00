//! The as-fetched observation table.
//!
//! NWIS returns RDB: tab-separated text with `#` comment lines, a header
//! line, a column-format line (`5s 15s 20d ...`) and then data rows. Cells
//! are kept as strings here; typing happens in the normalizer.

use std::collections::HashSet;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::RdbError;

/// One named column of string cells.
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub name: String,
    pub values: Vec<String>,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        RawColumn {
            name: name.into(),
            values,
        }
    }
}

/// Result of one fetch for a (site, parameter, date range).
///
/// The timestamp may arrive as the row index rather than as a column; call
/// [`RawObservationBatch::reset_index`] before looking columns up by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawObservationBatch {
    pub index: Option<RawColumn>,
    pub columns: Vec<RawColumn>,
}

impl RawObservationBatch {
    pub fn new(columns: Vec<RawColumn>) -> Self {
        RawObservationBatch {
            index: None,
            columns,
        }
    }

    #[cfg(test)]
    pub fn with_index(mut self, index: RawColumn) -> Self {
        self.index = Some(index);
        self
    }

    /// Parses an RDB response body.
    ///
    /// A body with no header line (only comments) is an empty batch, which
    /// is how the service reports "no data" on some endpoints.
    pub fn from_rdb(text: &str) -> Result<Self, RdbError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .comment(Some(b'#'))
            .has_headers(false) // header comes after the comment block
            .flexible(true)
            .quoting(false)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let mut records = reader.records();

        let header = match records.next() {
            Some(record) => record?,
            None => return Ok(RawObservationBatch::default()),
        };

        let mut seen = HashSet::new();
        for name in header.iter() {
            if !seen.insert(name) {
                return Err(RdbError::DuplicateColumn(name.to_string()));
            }
        }

        let mut columns: Vec<RawColumn> = header
            .iter()
            .map(|name| RawColumn::new(name, Vec::new()))
            .collect();

        for (i, record) in records.enumerate() {
            let record = record?;

            // Skip the column-format line
            if i == 0 && is_format_record(&record) {
                continue;
            }

            push_row(&mut columns, &record)?;
        }

        Ok(RawObservationBatch::new(columns))
    }

    /// Moves the index (if any) in front of the explicit columns.
    pub fn reset_index(mut self) -> Self {
        if let Some(index) = self.index.take() {
            self.columns.insert(0, index);
        }
        self
    }

    #[cfg(test)]
    pub fn column(&self, name: &str) -> Option<&RawColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn num_rows(&self) -> usize {
        self.index
            .iter()
            .chain(self.columns.iter())
            .map(|c| c.values.len())
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }
}

// A format line has one token per column such as `5s`, `20d` or `14n`
fn is_format_record(record: &StringRecord) -> bool {
    record.iter().all(|cell| {
        let Some(kind) = cell.chars().last() else {
            return false;
        };
        let width = &cell[..cell.len() - kind.len_utf8()];
        !width.is_empty()
            && width.chars().all(|c| c.is_ascii_digit())
            && matches!(kind, 's' | 'd' | 'n')
    })
}

// Short rows are padded with empty cells
fn push_row(columns: &mut [RawColumn], record: &StringRecord) -> Result<(), RdbError> {
    if record.len() > columns.len() {
        return Err(RdbError::RaggedRow {
            line: record.position().map_or(0, |p| p.line()),
            expected: columns.len(),
            found: record.len(),
        });
    }

    for (i, column) in columns.iter_mut().enumerate() {
        column.values.push(record.get(i).unwrap_or("").to_string());
    }

    Ok(())
}

// -- Tests -------------------------------------------------------------------
