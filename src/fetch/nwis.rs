//! USGS NWIS water services client (RDB format).

use async_trait::async_trait;
use tracing::debug;

use super::{FetchOutcome, FetchRequest, ObservationSource};
use crate::{
    config::Config,
    download::{Fetched, HttpFetcher},
    error::FetchError,
    reading::RawObservationBatch,
};

pub struct NwisSource {
    base_url: String,
    http: HttpFetcher,
}

impl NwisSource {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(NwisSource {
            base_url: config.service_url.trim_end_matches('/').to_string(),
            http: HttpFetcher::new(config.request_timeout, config.retry)?,
        })
    }

    pub fn build_url(&self, request: &FetchRequest) -> String {
        build_url(&self.base_url, request)
    }
}

/// `<base>/<service>/?format=rdb&sites=..&startDT=..&endDT=..&siteStatus=all`
/// plus `parameterCd` when a parameter is given.
pub fn build_url(base_url: &str, request: &FetchRequest) -> String {
    let mut url = format!(
        "{}/{}/?format=rdb&sites={}&startDT={}&endDT={}&siteStatus=all",
        base_url.trim_end_matches('/'),
        request.service,
        request.site_code.trim(),
        request.start.format("%Y-%m-%d"),
        request.end.format("%Y-%m-%d"),
    );

    if let Some(parameter) = &request.parameter_code {
        url.push_str("&parameterCd=");
        url.push_str(parameter.trim());
    }

    url
}

#[async_trait]
impl ObservationSource for NwisSource {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchOutcome, FetchError> {
        request.validate()?;

        let url = self.build_url(request);
        let body = match self.http.get_text(&url).await? {
            Fetched::Body(body) => body,
            Fetched::NotFound => return Ok(FetchOutcome::NoData),
        };

        let batch = RawObservationBatch::from_rdb(&body)
            .map_err(|source| FetchError::Malformed { url: url.clone(), source })?;

        if batch.is_empty() {
            return Ok(FetchOutcome::NoData);
        }

        debug!(url = %url, rows = batch.num_rows(), "Fetched batch");

        Ok(FetchOutcome::Batch(batch))
    }
}

// -- Tests -------------------------------------------------------------------
