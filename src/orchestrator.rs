// =============================================================================
// orchestrator.rs - One ingestion run, start to summary
// =============================================================================
//
// A run walks its dates strictly one after another:
//
//   stop requested? -> fetch -> transform -> delete date -> insert batches
//
// The stop flag is only looked at between dates, the date in flight always
// finishes. Upstream trouble for a single date (timeout, non-200, missing
// PDF) skips that date. A feed that arrives but cannot be decoded is treated
// as run-level and ends the run with an error summary.
//
// Whatever happens, exactly one RunSummary is written per run, and the
// RunGuard releases `is_running` on the way out.
// =============================================================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info};

use crate::court::CourtSelector;
use crate::error::{truncate_detail, IngestError};
use crate::metrics::IngestMetrics;
use crate::models::{CaseRecord, RunStatus, RunSummary, SourceMode};
use crate::run_state::RunHandle;
use crate::scanners::fetcher::CauseListSource;
use crate::scanners::json_scanner::{process_court_cases, transform_feed};
use crate::scanners::pdf_scanner::parse_document;
use crate::store::CauseStore;

/// Error message recorded on a run that was stopped on request.
pub const STOPPED_BY_USER: &str = "Stopped by user";

/// Parse a `YYYY-MM-DD` hearing date.
pub fn parse_hearing_date(raw: &str) -> Result<NaiveDate, IngestError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| IngestError::InvalidDate(raw.to_string()))
}

/// Result of fetching and saving one court's cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourtFetchOutcome {
    pub court_number: String,
    pub success: bool,
    pub cases_saved: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourtFetchReport {
    pub total_cases_saved: usize,
    pub courts_processed: usize,
    pub results: Vec<CourtFetchOutcome>,
}

pub struct Orchestrator {
    source: Arc<dyn CauseListSource>,
    store: Arc<dyn CauseStore>,
    mode: SourceMode,
    batch_size: usize,
    metrics: Arc<IngestMetrics>,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn CauseListSource>,
        store: Arc<dyn CauseStore>,
        mode: SourceMode,
        batch_size: usize,
        metrics: Arc<IngestMetrics>,
    ) -> Self {
        Self {
            source,
            store,
            mode,
            batch_size: batch_size.max(1),
            metrics,
        }
    }

    /// Ingest `target_date`, or every date the server lists when `None`.
    /// Returns the number of records persisted.
    pub async fn run(
        &self,
        handle: &RunHandle,
        target_date: Option<NaiveDate>,
    ) -> Result<u64, IngestError> {
        let guard = handle.begin()?;
        let handle = guard.handle();

        handle.log(format!(
            "Starting scraper run ({} mode). Target date: {}",
            self.mode,
            target_date.map_or_else(|| "All available".to_string(), |d| d.to_string())
        ));

        let mut total = 0u64;
        let outcome = self.ingest(handle, target_date, &mut total).await;

        let summary = match &outcome {
            Ok(()) if handle.is_stop_requested() => {
                RunSummary::new(RunStatus::Cancelled, total, Some(STOPPED_BY_USER.to_string()))
            }
            Ok(()) => RunSummary::new(RunStatus::Success, total, None),
            Err(e) => {
                handle.log(format!("Critical scraper error: {}", truncate_detail(e)));
                RunSummary::new(RunStatus::Error, total, Some(e.to_string()))
            }
        };

        let recorded = self.store.record_run(&summary).await;
        self.metrics.increment_runs_completed();
        info!(
            run_id = %summary.run_id,
            status = %summary.status,
            records = total,
            "run finished"
        );

        match (outcome, recorded) {
            (Err(e), Err(store_err)) => {
                error!(error = %store_err, "could not record summary of failed run");
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
            (Ok(()), Err(store_err)) => Err(store_err.into()),
            (Ok(()), Ok(())) => {
                handle.log(format!("Scraper finished. Total records: {total}"));
                Ok(total)
            }
        }
    }

    async fn ingest(
        &self,
        handle: &RunHandle,
        target_date: Option<NaiveDate>,
        total: &mut u64,
    ) -> Result<(), IngestError> {
        let dates = match target_date {
            Some(date) => vec![date],
            None => {
                handle.log("Fetching available dates from server...");
                self.available_dates(handle).await
            }
        };
        handle.log(format!("Found {} dates to process", dates.len()));

        for date in dates {
            if handle.is_stop_requested() {
                handle.log("Scraper stopped by user request.");
                break;
            }
            handle.log(format!("Processing date: {date}"));

            let records = match self.mode {
                SourceMode::Json => self.feed_records(handle, date).await?,
                SourceMode::Pdf => self.document_records(handle, date).await,
            };
            let Some(records) = records else {
                self.metrics.increment_dates_skipped();
                continue;
            };

            *total += self.replace_date(handle, date, &records).await?;
            self.metrics.increment_dates_processed();
        }

        Ok(())
    }

    /// Upstream dates, oldest first as served. Never fails: a fetch error
    /// means no dates, an unparsable entry is dropped.
    async fn available_dates(&self, handle: &RunHandle) -> Vec<NaiveDate> {
        let raw = match self.source.available_dates().await {
            Ok(raw) => raw,
            Err(e) => {
                handle.log(format!("Failed to fetch dates: {}", truncate_detail(&e)));
                return Vec::new();
            }
        };

        raw.iter()
            .filter_map(|entry| match parse_hearing_date(entry) {
                Ok(date) => Some(date),
                Err(e) => {
                    handle.log(format!("Ignoring upstream date: {e}"));
                    None
                }
            })
            .collect()
    }

    /// `None` when the feed could not be fetched. A feed that cannot be
    /// decoded is propagated.
    async fn feed_records(
        &self,
        handle: &RunHandle,
        date: NaiveDate,
    ) -> Result<Option<Vec<CaseRecord>>, IngestError> {
        let items = match self.source.cause_list_feed(date).await {
            Ok(items) => items,
            Err(e) if e.is_payload_fault() => return Err(e.into()),
            Err(e) => {
                handle.log(format!(
                    "Failed to fetch JSON for {date}: {}",
                    truncate_detail(&e)
                ));
                return Ok(None);
            }
        };

        handle.log(format!("Fetched {} records. Processing...", items.len()));
        let outcome = transform_feed(&items, date);
        if !outcome.faults.is_empty() {
            handle.log(format!(
                "Skipped {} malformed item(s) for {date}",
                outcome.faults.len()
            ));
            self.metrics.add_item_faults(outcome.faults.len() as u64);
        }
        Ok(Some(outcome.records))
    }

    /// `None` when there is no usable document for the date.
    async fn document_records(&self, handle: &RunHandle, date: NaiveDate) -> Option<Vec<CaseRecord>> {
        let bytes = match self.source.document_bytes(date).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                handle.log(format!("No cause list PDF published for {date}"));
                return None;
            }
            Err(e) => {
                handle.log(format!(
                    "Failed to download PDF for {date}: {}",
                    truncate_detail(&e)
                ));
                return None;
            }
        };

        handle.log(format!("Downloaded PDF ({} bytes). Parsing...", bytes.len()));
        let outcome = parse_document(&bytes, date);
        if !outcome.faults.is_empty() {
            self.metrics.add_item_faults(outcome.faults.len() as u64);
            if outcome.records.is_empty() {
                handle.log(format!(
                    "Could not read PDF for {date}: {}",
                    truncate_detail(&outcome.faults[0])
                ));
                return None;
            }
            handle.log(format!(
                "Skipped {} unreadable page(s) for {date}",
                outcome.faults.len()
            ));
        }
        Some(outcome.records)
    }

    /// Full-date replace: drop what is stored for `date`, then insert.
    async fn replace_date(
        &self,
        handle: &RunHandle,
        date: NaiveDate,
        records: &[CaseRecord],
    ) -> Result<u64, IngestError> {
        let removed = self.store.delete_by_hearing_date(date).await?;
        if removed > 0 {
            info!(%date, removed, "replaced previously stored records");
        }

        if records.is_empty() {
            handle.log(format!("No causes found for {date}"));
            return Ok(0);
        }

        let saved = self.insert_in_batches(records).await? as u64;
        self.metrics.add_records_ingested(saved);
        handle.log(format!("Successfully extracted {saved} causes for {date}"));
        Ok(saved)
    }

    async fn insert_in_batches(&self, records: &[CaseRecord]) -> Result<usize, IngestError> {
        let mut saved = 0;
        for batch in records.chunks(self.batch_size) {
            saved += self.store.insert_batch(batch).await?;
        }
        Ok(saved)
    }

    /// Fetch the feed for `date` once and save the cases of each selected
    /// court. Records are added, nothing is deleted first. A failed fetch
    /// fails the call, a failed court only fails its own outcome.
    pub async fn fetch_courts(
        &self,
        handle: &RunHandle,
        date: NaiveDate,
        selectors: &[CourtSelector],
    ) -> Result<CourtFetchReport, IngestError> {
        handle.log(format!("Starting data fetch for {} courts...", selectors.len()));
        handle.log(format!("Target Date: {date}"));

        let items = match self.source.cause_list_feed(date).await {
            Ok(items) => items,
            Err(e) => {
                handle.log(format!("Fetch failed: {}", truncate_detail(&e)));
                return Err(e.into());
            }
        };
        handle.log(format!("Successfully fetched {} records from API", items.len()));

        let mut report = CourtFetchReport {
            total_cases_saved: 0,
            courts_processed: 0,
            results: Vec::with_capacity(selectors.len()),
        };
        if items.is_empty() {
            handle.log(format!("API returned 0 records for date {date}"));
            return Ok(report);
        }

        for selector in selectors {
            let outcome = process_court_cases(&items, selector, date);
            if !outcome.faults.is_empty() {
                self.metrics.add_item_faults(outcome.faults.len() as u64);
            }

            let result = if outcome.records.is_empty() {
                handle.log(format!("Court {selector}: No cases found"));
                CourtFetchOutcome {
                    court_number: selector.as_str().to_string(),
                    success: true,
                    cases_saved: 0,
                    message: Some("No cases found".to_string()),
                    error: None,
                }
            } else {
                match self.insert_in_batches(&outcome.records).await {
                    Ok(saved) => {
                        report.total_cases_saved += saved;
                        self.metrics.add_records_ingested(saved as u64);
                        handle.log(format!("Court {selector}: Saved {saved} cases"));
                        CourtFetchOutcome {
                            court_number: selector.as_str().to_string(),
                            success: true,
                            cases_saved: saved,
                            message: None,
                            error: None,
                        }
                    }
                    Err(e) => {
                        handle.log(format!("Court {selector} ERROR: {}", truncate_detail(&e)));
                        CourtFetchOutcome {
                            court_number: selector.as_str().to_string(),
                            success: false,
                            cases_saved: 0,
                            message: None,
                            error: Some(e.to_string()),
                        }
                    }
                }
            };
            report.results.push(result);
        }

        report.courts_processed = selectors.len();
        handle.log(format!(
            "Data fetch complete. Total cases saved: {}",
            report.total_cases_saved
        ));
        Ok(report)
    }
}
