// =============================================================================
// store.rs - Where case records and run summaries end up
// =============================================================================
//
// The orchestrator only needs four things from persistence: drop a hearing
// date, bulk insert records, write a run summary, list recent summaries.
// CauseStore is that seam. RedisStore is the production implementation,
// MemoryStore backs the tests and offline commands.
//
// Redis layout (prefix defaults to "causelist"):
//
//   {prefix}:records:{YYYY-MM-DD}   LIST of CaseRecord JSON, in insert order
//   {prefix}:dates                  SET of hearing dates with records
//   {prefix}:runs                   ZSET of RunSummary JSON, scored by
//                                   created_at in milliseconds
//
// Records for one hearing date live under one key, so replacing a date is a
// single DEL followed by RPUSHes.
// =============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use portable_atomic::{AtomicU64, Ordering};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::StoreError;
use crate::models::{CaseRecord, RunSummary};

/// Summaries listed when the caller does not say how many.
pub const DEFAULT_RUN_LIMIT: usize = 50;

const CONNECT_ATTEMPTS: u32 = 3;
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(5);

#[async_trait]
pub trait CauseStore: Send + Sync {
    /// Remove every record for `date`. Returns how many were removed.
    async fn delete_by_hearing_date(&self, date: NaiveDate) -> Result<u64, StoreError>;

    /// Append records. Returns how many were written.
    async fn insert_batch(&self, records: &[CaseRecord]) -> Result<usize, StoreError>;

    async fn records_for_date(&self, date: NaiveDate) -> Result<Vec<CaseRecord>, StoreError>;

    async fn record_run(&self, summary: &RunSummary) -> Result<(), StoreError>;

    /// Most recent first.
    async fn recent_runs(&self, limit: usize) -> Result<Vec<RunSummary>, StoreError>;
}

// =============================================================================
// IN-MEMORY
// =============================================================================

#[derive(Default)]
struct MemoryInner {
    records: BTreeMap<NaiveDate, Vec<CaseRecord>>,
    runs: Vec<RunSummary>,
}

/// Process-local store. Nothing survives a restart.
#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_records(&self) -> usize {
        self.inner.lock().records.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl CauseStore for MemoryStore {
    async fn delete_by_hearing_date(&self, date: NaiveDate) -> Result<u64, StoreError> {
        let removed = self.inner.lock().records.remove(&date);
        Ok(removed.map_or(0, |records| records.len() as u64))
    }

    async fn insert_batch(&self, records: &[CaseRecord]) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock();
        for record in records {
            inner
                .records
                .entry(record.hearing_date)
                .or_default()
                .push(record.clone());
        }
        Ok(records.len())
    }

    async fn records_for_date(&self, date: NaiveDate) -> Result<Vec<CaseRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .records
            .get(&date)
            .cloned()
            .unwrap_or_default())
    }

    async fn record_run(&self, summary: &RunSummary) -> Result<(), StoreError> {
        self.inner.lock().runs.push(summary.clone());
        Ok(())
    }

    async fn recent_runs(&self, limit: usize) -> Result<Vec<RunSummary>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner.runs.iter().rev().take(limit).cloned().collect())
    }
}

// =============================================================================
// REDIS
// =============================================================================

/// Write counters for the Redis store.
#[derive(Default)]
pub struct StoreStats {
    pub records_written: AtomicU64,
    pub batches_written: AtomicU64,
    pub write_errors: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreSnapshot {
    pub records_written: u64,
    pub batches_written: u64,
    pub write_errors: u64,
}

impl StoreStats {
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            records_written: self.records_written.load(Ordering::Relaxed),
            batches_written: self.batches_written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

pub struct RedisStore {
    con: MultiplexedConnection,
    prefix: String,
    stats: Arc<StoreStats>,
}

impl RedisStore {
    /// Connect, retrying a few times before giving up.
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        let client = redis::Client::open(config.redis_url.as_str())?;

        let mut attempt = 1;
        let con = loop {
            match client.get_multiplexed_async_connection().await {
                Ok(con) => {
                    info!(prefix = %config.redis_prefix, "Redis connection established");
                    break con;
                }
                Err(e) if attempt < CONNECT_ATTEMPTS => {
                    warn!(
                        error = %e,
                        attempt,
                        "Failed to connect to Redis, retrying in {}s",
                        CONNECT_RETRY_DELAY.as_secs()
                    );
                    attempt += 1;
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                }
                Err(e) => return Err(e.into()),
            }
        };

        Ok(Self {
            con,
            prefix: config.redis_prefix.clone(),
            stats: Arc::new(StoreStats::default()),
        })
    }

    pub fn stats(&self) -> Arc<StoreStats> {
        Arc::clone(&self.stats)
    }

    fn records_key(&self, date: NaiveDate) -> String {
        format!("{}:records:{}", self.prefix, date.format("%Y-%m-%d"))
    }

    fn dates_key(&self) -> String {
        format!("{}:dates", self.prefix)
    }

    fn runs_key(&self) -> String {
        format!("{}:runs", self.prefix)
    }

    fn count_error<T>(&self, result: Result<T, redis::RedisError>) -> Result<T, StoreError> {
        result.map_err(|e| {
            self.stats.write_errors.fetch_add(1, Ordering::Relaxed);
            StoreError::from(e)
        })
    }
}

#[async_trait]
impl CauseStore for RedisStore {
    async fn delete_by_hearing_date(&self, date: NaiveDate) -> Result<u64, StoreError> {
        let key = self.records_key(date);
        let mut con = self.con.clone();

        let existing: u64 = con.llen(&key).await?;
        let result: Result<(), _> = redis::pipe()
            .del(&key)
            .ignore()
            .srem(self.dates_key(), date.format("%Y-%m-%d").to_string())
            .ignore()
            .query_async(&mut con)
            .await;
        self.count_error(result)?;

        debug!(key = %key, removed = existing, "cleared hearing date");
        Ok(existing)
    }

    async fn insert_batch(&self, records: &[CaseRecord]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut pipe = redis::pipe();
        for record in records {
            let json = serde_json::to_string(record)?;
            pipe.rpush(self.records_key(record.hearing_date), json).ignore();
            pipe.sadd(
                self.dates_key(),
                record.hearing_date.format("%Y-%m-%d").to_string(),
            )
            .ignore();
        }

        let mut con = self.con.clone();
        let result: Result<(), _> = pipe.query_async(&mut con).await;
        self.count_error(result)?;

        self.stats
            .records_written
            .fetch_add(records.len() as u64, Ordering::Relaxed);
        self.stats.batches_written.fetch_add(1, Ordering::Relaxed);
        debug!(
            batch_size = records.len(),
            total_written = self.stats.records_written.load(Ordering::Relaxed),
            "batch written to Redis"
        );
        Ok(records.len())
    }

    async fn records_for_date(&self, date: NaiveDate) -> Result<Vec<CaseRecord>, StoreError> {
        let mut con = self.con.clone();
        let raw: Vec<String> = con.lrange(self.records_key(date), 0, -1).await?;
        raw.iter()
            .map(|json| serde_json::from_str(json).map_err(StoreError::from))
            .collect()
    }

    async fn record_run(&self, summary: &RunSummary) -> Result<(), StoreError> {
        let json = serde_json::to_string(summary)?;
        let score = summary.created_at.timestamp_millis() as f64;
        let mut con = self.con.clone();
        let result: Result<(), _> = con.zadd(self.runs_key(), json, score).await;
        self.count_error(result)?;
        info!(run_id = %summary.run_id, status = %summary.status, "run summary recorded");
        Ok(())
    }

    async fn recent_runs(&self, limit: usize) -> Result<Vec<RunSummary>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut con = self.con.clone();
        let stop = isize::try_from(limit).unwrap_or(isize::MAX) - 1;
        let raw: Vec<String> = con.zrevrange(self.runs_key(), 0, stop).await?;

        Ok(raw
            .iter()
            .filter_map(|json| match serde_json::from_str::<RunSummary>(json) {
                Ok(summary) => Some(summary),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable run summary");
                    None
                }
            })
            .collect())
    }
}
