//! Error types for each stage of the ingestion pipeline.
//!
//! Library code returns these typed errors; the command layer wraps them
//! with `anyhow` context.

use std::path::PathBuf;

use chrono::NaiveDate;

/// A transport or service failure while fetching observations.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// The request was rejected before any network call.
    #[error("invalid request for site '{site}': {reason}")]
    InvalidRequest { site: String, reason: String },

    /// Connection, timeout or body-read failure.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status other than "not found".
    #[error("service returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// The body could not be read as an RDB table.
    #[error("malformed response from {url}: {source}")]
    Malformed {
        url: String,
        #[source]
        source: RdbError,
    },
}

impl FetchError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::InvalidRequest { .. } | FetchError::Malformed { .. } => false,
        }
    }
}

/// Structural problems in an RDB (tab-separated) response body.
#[derive(thiserror::Error, Debug)]
pub enum RdbError {
    #[error("cannot read RDB table: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: expected at most {expected} cells, found {found}")]
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("duplicate column '{0}' in header")]
    DuplicateColumn(String),
}

/// An unexpected raw batch shape. Never coerced silently.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SchemaError {
    #[error("missing timestamp column '{0}'")]
    MissingTimestamp(String),

    #[error("expected exactly one value column, found {0:?}")]
    ValueColumns(Vec<String>),

    #[error("expected exactly one qualifier column, found {0:?}")]
    QualifierColumns(Vec<String>),
}

/// Failure of one parameter inside a site. Recovered by the site processor.
#[derive(thiserror::Error, Debug)]
pub enum ParameterError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Low-level failure reading or writing a partition file.
#[derive(thiserror::Error, Debug)]
pub enum LakeError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parquet error on {path}: {source}")]
    Parquet {
        path: PathBuf,
        #[source]
        source: parquet::errors::ParquetError,
    },

    #[error("arrow error on {path}: {source}")]
    Arrow {
        path: PathBuf,
        #[source]
        source: arrow::error::ArrowError,
    },

    #[error("column '{column}' in {path} is missing or has the wrong type")]
    Column { path: PathBuf, column: String },

    #[error("timestamp {value} in {path} is outside the representable range")]
    Timestamp { path: PathBuf, value: String },
}

impl LakeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parquet(path: impl Into<PathBuf>, source: parquet::errors::ParquetError) -> Self {
        Self::Parquet {
            path: path.into(),
            source,
        }
    }

    pub fn arrow(path: impl Into<PathBuf>, source: arrow::error::ArrowError) -> Self {
        Self::Arrow {
            path: path.into(),
            source,
        }
    }

    pub fn column(path: impl Into<PathBuf>, column: impl Into<String>) -> Self {
        Self::Column {
            path: path.into(),
            column: column.into(),
        }
    }
}

/// Failure persisting one `(site, year)` partition.
#[derive(thiserror::Error, Debug)]
#[error("failed to write partition site={site} year={year}: {source}")]
pub struct WriteError {
    pub site: String,
    pub year: i32,
    #[source]
    pub source: LakeError,
}

/// Metadata store failures. Fatal when they happen while listing sites.
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("cannot open metadata store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("cannot create directory for metadata store {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("metadata query failed ({what}): {source}")]
    Query {
        what: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

impl CatalogError {
    pub fn query(what: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::Query { what, source }
    }
}

/// Why a whole site was marked failed.
#[derive(thiserror::Error, Debug)]
pub enum SiteError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("cannot determine approval cutoffs: {0}")]
    Cutoffs(#[from] LakeError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Errors that end a run before any site is processed.
#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("cannot list sites for source {source_id}: {source}")]
    ListSites {
        source_id: i64,
        #[source]
        source: CatalogError,
    },

    #[error("invalid date range {start}..{end}")]
    DateRange { start: NaiveDate, end: NaiveDate },
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_classify_transient_statuses() {
        let status = |status| FetchError::Status {
            url: "u".to_string(),
            status,
        };

        assert!(status(503).is_transient());
        assert!(status(500).is_transient());
        assert!(status(429).is_transient());
        assert!(!status(400).is_transient());
        assert!(!status(403).is_transient());
    }

    #[test]
    fn should_not_retry_malformed_or_invalid() {
        let malformed = FetchError::Malformed {
            url: "u".to_string(),
            source: RdbError::DuplicateColumn("datetime".to_string()),
        };
        let invalid = FetchError::InvalidRequest {
            site: "09152500".to_string(),
            reason: "start after end".to_string(),
        };

        assert!(!malformed.is_transient());
        assert!(!invalid.is_transient());
    }

    #[test]
    fn should_name_site_and_year_in_write_error() {
        let err = WriteError {
            site: "09152500".to_string(),
            year: 2020,
            source: LakeError::column("/tmp/x", "read_ts"),
        };

        let message = err.to_string();
        assert!(message.contains("site=09152500"));
        assert!(message.contains("year=2020"));
    }
}
