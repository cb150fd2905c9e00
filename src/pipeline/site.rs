//! Fetch and normalize every configured parameter of one site.

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::{
    db::Site,
    error::ParameterError,
    fetch::{FetchOutcome, FetchRequest, ObservationSource, ServiceType},
    reading::{normalize, CanonicalReading},
};

/// The date range to fetch for one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchWindow {
    pub parameter_code: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchWindow {
    pub fn new(parameter_code: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        FetchWindow {
            parameter_code: parameter_code.into(),
            start,
            end,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SiteOutcome {
    Combined(Vec<CanonicalReading>),
    Empty,
}

/// Per-site parameter counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParameterStats {
    pub fetched: usize,
    pub empty: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedSite {
    pub outcome: SiteOutcome,
    pub stats: ParameterStats,
}

pub struct SiteProcessor<'a, S: ObservationSource + ?Sized> {
    source: &'a S,
    service: ServiceType,
}

impl<'a, S: ObservationSource + ?Sized> SiteProcessor<'a, S> {
    pub fn new(source: &'a S, service: ServiceType) -> Self {
        SiteProcessor { source, service }
    }

    /// Runs every window in order. A failing parameter is logged and
    /// skipped; it never aborts the site.
    pub async fn process(&self, site: &Site, windows: &[FetchWindow]) -> ProcessedSite {
        let mut stats = ParameterStats::default();

        if windows.is_empty() {
            return ProcessedSite {
                outcome: SiteOutcome::Empty,
                stats,
            };
        }

        let mut combined = Vec::new();

        for window in windows {
            match self.process_parameter(site, window).await {
                Ok(readings) if readings.is_empty() => {
                    warn!(
                        site = %site.site_code,
                        parameter = %window.parameter_code,
                        start = %window.start,
                        end = %window.end,
                        "No data found"
                    );
                    stats.empty += 1;
                }
                Ok(readings) => {
                    info!(
                        site = %site.site_code,
                        parameter = %window.parameter_code,
                        rows = readings.len(),
                        "Fetched readings"
                    );
                    stats.fetched += 1;
                    combined.extend(readings);
                }
                Err(e) => {
                    error!(
                        site = %site.site_code,
                        parameter = %window.parameter_code,
                        start = %window.start,
                        end = %window.end,
                        "Error processing parameter: {e}"
                    );
                    stats.failed += 1;
                }
            }
        }

        let outcome = if combined.is_empty() {
            SiteOutcome::Empty
        } else {
            SiteOutcome::Combined(combined)
        };

        ProcessedSite { outcome, stats }
    }

    async fn process_parameter(
        &self,
        site: &Site,
        window: &FetchWindow,
    ) -> Result<Vec<CanonicalReading>, ParameterError> {
        let request = FetchRequest {
            site_code: site.site_code.clone(),
            parameter_code: Some(window.parameter_code.clone()),
            service: self.service,
            start: window.start,
            end: window.end,
        };

        match self.source.fetch(&request).await? {
            FetchOutcome::NoData => Ok(Vec::new()),
            FetchOutcome::Batch(batch) => {
                Ok(normalize(batch, &site.site_code, &window.parameter_code)?)
            }
        }
    }
}

// -- Tests -------------------------------------------------------------------
