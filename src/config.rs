//! Runtime configuration, resolved once at startup and passed down.

use std::{path::PathBuf, time::Duration};

use crate::download::RetryPolicy;

pub const DEFAULT_SERVICE_URL: &str = "https://waterservices.usgs.gov/nwis";
pub const DB_FILE_NAME: &str = "hydrologic_data.sqlite";
pub const LAKE_DIR_NAME: &str = "hydrology_datalake";
pub const LOG_DIR_NAME: &str = "logs";

/// The NWIS source row seeded into every new metadata store.
pub const NWIS_SOURCE_ID: i64 = 1;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub lake_root: PathBuf,
    pub log_dir: PathBuf,
    pub service_url: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub source_id: i64,
}

impl Config {
    /// Lays out the store, lake and logs under `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();

        Config {
            db_path: data_dir.join(DB_FILE_NAME),
            lake_root: data_dir.join(LAKE_DIR_NAME),
            log_dir: data_dir.join(LOG_DIR_NAME),
            data_dir,
            service_url: DEFAULT_SERVICE_URL.to_string(),
            request_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            source_id: NWIS_SOURCE_ID,
        }
    }

    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_source_id(mut self, source_id: i64) -> Self {
        self.source_id = source_id;
        self
    }
}

/// `<platform data dir>/hydrology`, or `./hydrology` when the platform has none.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hydrology")
}

// -- Tests -------------------------------------------------------------------
