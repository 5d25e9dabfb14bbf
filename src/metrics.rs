// =============================================================================
// metrics.rs - Ingestion counters and the live progress endpoint
// =============================================================================
//
// Counters are plain atomics bumped by the orchestrator. While a run is in
// progress a tiny TCP server answers every connection with one HTTP response
// carrying the run state (current action, log trail, stop flag) and the
// counters as JSON. It never reads the request, any path will do.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use crate::run_state::{RunHandle, RunState};

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub dates_processed: u64,
    pub dates_skipped: u64,
    pub records_ingested: u64,
    pub item_faults: u64,
    pub runs_completed: u64,
    pub uptime_seconds: u64,
    pub records_per_minute: f64,
}

pub struct IngestMetrics {
    dates_processed: AtomicU64,
    dates_skipped: AtomicU64,
    records_ingested: AtomicU64,
    item_faults: AtomicU64,
    runs_completed: AtomicU64,
    start_time: Instant,
}

impl Default for IngestMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestMetrics {
    pub fn new() -> Self {
        Self {
            dates_processed: AtomicU64::new(0),
            dates_skipped: AtomicU64::new(0),
            records_ingested: AtomicU64::new(0),
            item_faults: AtomicU64::new(0),
            runs_completed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn increment_dates_processed(&self) {
        self.dates_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// A date whose upstream data could not be fetched.
    pub fn increment_dates_skipped(&self) {
        self.dates_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_records_ingested(&self, count: u64) {
        self.records_ingested.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_item_faults(&self, count: u64) {
        self.item_faults.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_runs_completed(&self) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let uptime = self.start_time.elapsed().as_secs();
        let records = self.records_ingested.load(Ordering::Relaxed);
        let records_per_minute = if uptime > 0 {
            (records as f64 / uptime as f64) * 60.0
        } else {
            0.0
        };

        MetricsSnapshot {
            dates_processed: self.dates_processed.load(Ordering::Relaxed),
            dates_skipped: self.dates_skipped.load(Ordering::Relaxed),
            records_ingested: records,
            item_faults: self.item_faults.load(Ordering::Relaxed),
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            uptime_seconds: uptime,
            records_per_minute,
        }
    }
}

/// Body served by the progress endpoint.
#[derive(Debug, Serialize)]
pub struct ProgressReport {
    pub run: RunState,
    pub metrics: MetricsSnapshot,
}

fn render_response(report: &ProgressReport) -> String {
    let json = serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nAccess-Control-Allow-Origin: *\r\nContent-Length: {}\r\n\r\n{}",
        json.len(),
        json,
    )
}

/// Bind the progress endpoint on all interfaces.
pub async fn bind_progress_listener(port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind(("0.0.0.0", port)).await
}

/// Answer connections with the current progress until `shutdown` flips.
pub async fn serve_progress(
    listener: TcpListener,
    handle: RunHandle,
    metrics: Arc<IngestMetrics>,
    mut shutdown: watch::Receiver<bool>,
) {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "progress endpoint listening");
    }

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((mut stream, _addr)) => {
                        let report = ProgressReport {
                            run: handle.snapshot(),
                            metrics: metrics.snapshot(),
                        };
                        let _ = stream.write_all(render_response(&report).as_bytes()).await;
                    }
                    Err(e) => {
                        error!(error = %e, "progress endpoint accept error");
                    }
                }
            }
            _ = shutdown.changed() => {
                info!("progress endpoint shutting down");
                break;
            }
        }
    }
}
