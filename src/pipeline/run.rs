//! Drives the pipeline over every configured site.

use std::{collections::HashMap, fmt};

use chrono::NaiveDate;
use tracing::{error, info, warn};

use super::{approval_cutoffs, FetchWindow, ParameterStats, RunMode, SiteOutcome, SiteProcessor};
use crate::{
    cli::create_progress_bar,
    config::Config,
    db::{MetadataStore, Site},
    error::{RunError, SiteError},
    fetch::{ObservationSource, ServiceType},
    lake::{LakeWriter, WriteResult},
};

/// Totals for one run. Produced even when sites failed.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub mode: RunMode,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub sites_processed: usize,
    pub sites_failed: usize,
    pub sites_skipped: usize,
    pub records_written: usize,
    pub partitions_written: usize,
    pub parameters: ParameterStats,
}

impl RunSummary {
    fn new(mode: RunMode, start: NaiveDate, end: NaiveDate) -> Self {
        RunSummary {
            mode,
            start,
            end,
            sites_processed: 0,
            sites_failed: 0,
            sites_skipped: 0,
            records_written: 0,
            partitions_written: 0,
            parameters: ParameterStats::default(),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run ({}) {} to {}", self.mode, self.start, self.end)?;
        writeln!(
            f,
            "  sites: {} processed, {} failed, {} skipped",
            self.sites_processed, self.sites_failed, self.sites_skipped
        )?;
        writeln!(
            f,
            "  parameters: {} fetched, {} empty, {} failed",
            self.parameters.fetched, self.parameters.empty, self.parameters.failed
        )?;
        write!(
            f,
            "  records written: {} in {} partitions",
            self.records_written, self.partitions_written
        )
    }
}

enum SiteResult {
    Written(WriteResult),
    Skipped(&'static str),
}

pub struct RunCoordinator<C, S> {
    catalog: C,
    source: S,
    writer: LakeWriter,
    source_id: i64,
}

impl<C: MetadataStore, S: ObservationSource> RunCoordinator<C, S> {
    pub fn new(config: &Config, catalog: C, source: S) -> Self {
        RunCoordinator {
            catalog,
            source,
            writer: LakeWriter::new(&config.lake_root, ServiceType::default()),
            source_id: config.source_id,
        }
    }

    /// Fetches from `service` and writes into that service's lake tree.
    pub fn with_service(mut self, service: ServiceType) -> Self {
        self.writer = LakeWriter::new(self.writer.root().to_path_buf(), service);
        self
    }

    /// Processes every site of the configured source, one at a time.
    ///
    /// Only failing to list the sites is fatal; a failing site is counted
    /// and the run moves on.
    pub async fn run(
        &self,
        mode: RunMode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RunSummary, RunError> {
        if start > end {
            return Err(RunError::DateRange { start, end });
        }

        let sites = self
            .catalog
            .list_sites(self.source_id)
            .map_err(|source| RunError::ListSites {
                source_id: self.source_id,
                source,
            })?;

        info!(%mode, sites = sites.len(), %start, %end, service = %self.writer.service(), "Starting run");

        let mut summary = RunSummary::new(mode, start, end);
        let pb = create_progress_bar(sites.len() as u64, "Processing sites".to_string());

        for site in &sites {
            pb.set_message(format!("Site {}", site.site_code));

            match self.process_site(site, mode, start, end, &mut summary.parameters).await {
                Ok(SiteResult::Written(result)) => {
                    info!(
                        site = %site.site_code,
                        rows = result.total_rows(),
                        partitions = result.partitions.len(),
                        "Site written to datalake"
                    );
                    summary.sites_processed += 1;
                    summary.records_written += result.total_rows();
                    summary.partitions_written += result.partitions.len();
                }
                Ok(SiteResult::Skipped(reason)) => {
                    warn!(site = %site.site_code, site_id = site.site_id, "Skipping site: {reason}");
                    summary.sites_skipped += 1;
                }
                Err(e) => {
                    error!(site = %site.site_code, site_id = site.site_id, "Site failed: {e}");
                    summary.sites_failed += 1;
                }
            }

            pb.inc(1);
        }

        pb.finish_with_message("Run complete");
        info!(
            processed = summary.sites_processed,
            failed = summary.sites_failed,
            skipped = summary.sites_skipped,
            records = summary.records_written,
            "Run finished"
        );

        Ok(summary)
    }

    async fn process_site(
        &self,
        site: &Site,
        mode: RunMode,
        start: NaiveDate,
        end: NaiveDate,
        stats: &mut ParameterStats,
    ) -> Result<SiteResult, SiteError> {
        let parameters = self.catalog.list_parameters(site.site_id)?;
        if parameters.is_empty() {
            return Ok(SiteResult::Skipped("no parameters configured"));
        }

        let windows = match mode {
            RunMode::Initial => parameters
                .into_iter()
                .map(|p| FetchWindow::new(p, start, end))
                .collect(),
            RunMode::Update => self.update_windows(site, parameters, start, end)?,
        };

        let processed = SiteProcessor::new(&self.source, self.writer.service())
            .process(site, &windows)
            .await;

        stats.fetched += processed.stats.fetched;
        stats.empty += processed.stats.empty;
        stats.failed += processed.stats.failed;

        match processed.outcome {
            SiteOutcome::Empty => Ok(SiteResult::Skipped("no data fetched")),
            SiteOutcome::Combined(readings) => {
                let result = self
                    .writer
                    .write(readings, &site.site_code, mode.policy())?;
                if result.partitions.is_empty() {
                    return Ok(SiteResult::Skipped("no valid readings"));
                }
                Ok(SiteResult::Written(result))
            }
        }
    }

    // Parameters without an approved reading fall back to the run start
    fn update_windows(
        &self,
        site: &Site,
        parameters: Vec<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<FetchWindow>, SiteError> {
        let cutoffs: HashMap<String, NaiveDate> =
            approval_cutoffs(self.writer.root(), self.writer.service(), &site.site_code)?
                .into_iter()
                .map(|c| (c.parameter_code, c.last_approved))
                .collect();

        Ok(parameters
            .into_iter()
            .map(|p| {
                let from = cutoffs.get(&p).map_or(start, |d| (*d).min(end));
                FetchWindow::new(p, from, end)
            })
            .collect())
    }
}

// -- Tests -------------------------------------------------------------------
