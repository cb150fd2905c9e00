//! Observation sources.
//!
//! The pipeline only sees [`ObservationSource`]; [`nwis::NwisSource`] is the
//! production implementation.

pub mod nwis;

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{error::FetchError, reading::RawObservationBatch};

pub use nwis::NwisSource;

/// Which NWIS service to query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ServiceType {
    /// Instantaneous values
    #[default]
    Iv,
    /// Daily values
    Dv,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Iv => "iv",
            ServiceType::Dv => "dv",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (site, parameter, date range) query. Both dates are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub site_code: String,
    pub parameter_code: Option<String>,
    pub service: ServiceType,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchRequest {
    pub fn validate(&self) -> Result<(), FetchError> {
        let invalid = |reason: &str| FetchError::InvalidRequest {
            site: self.site_code.clone(),
            reason: reason.to_string(),
        };

        if self.site_code.trim().is_empty() {
            return Err(invalid("empty site code"));
        }
        if self.parameter_code.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(invalid("empty parameter code"));
        }
        if self.start > self.end {
            return Err(invalid(&format!(
                "start {} is after end {}",
                self.start, self.end
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// At least one row.
    Batch(RawObservationBatch),
    NoData,
}

#[async_trait]
pub trait ObservationSource: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchOutcome, FetchError>;
}

// -- Tests -------------------------------------------------------------------
