//   ____                          _     _     _
//  / ___|__ _ _   _ ___  ___     | |   (_)___| |_
// | |   / _` | | | / __|/ _ \    | |   | / __| __|
// | |__| (_| | |_| \__ \  __/    | |___| \__ \ |_
//  \____\__,_|\__,_|___/\___|    |_____|_|___/\__|
//
// E N G I N E
//
// Pulls a High Court's daily cause lists (the PDF and the JSON feed),
// flattens them into one record per case, tags religious and charitable
// endowment matters and keeps every hearing date replaceable in Redis.

mod config;
mod court;
mod discovery;
mod error;
mod metrics;
mod models;
mod normalize;
mod orchestrator;
mod run_state;
mod scanners;
mod store;
mod text_scanner;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::court::CourtSelector;
use crate::discovery::discover_for_date;
use crate::metrics::{bind_progress_listener, serve_progress, IngestMetrics};
use crate::models::SourceMode;
use crate::orchestrator::{parse_hearing_date, Orchestrator};
use crate::run_state::RunHandle;
use crate::scanners::fetcher::HttpSource;
use crate::scanners::pdf_scanner::parse_document;
use crate::store::{CauseStore, MemoryStore, RedisStore, DEFAULT_RUN_LIMIT};

#[derive(Parser)]
#[command(name = "cause-list-engine", version)]
#[command(about = "Ingest a High Court's daily cause lists into Redis")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest one date, or every date the court has published.
    Run {
        /// Hearing date (YYYY-MM-DD). All available dates when omitted.
        #[arg(long, value_parser = parse_hearing_date)]
        date: Option<NaiveDate>,
        /// Override CAUSE_LIST_SOURCE_MODE.
        #[arg(long, value_parser = parse_source_mode)]
        mode: Option<SourceMode>,
        /// Keep records in memory instead of writing to Redis.
        #[arg(long)]
        dry_run: bool,
    },
    /// List the courts sitting on a date, without saving anything.
    Discover {
        #[arg(long, value_parser = parse_hearing_date)]
        date: NaiveDate,
    },
    /// Fetch and save the cases of selected courts. Every court when no
    /// --court is given.
    FetchCourts {
        #[arg(long, value_parser = parse_hearing_date)]
        date: NaiveDate,
        /// Court selector, e.g. "1", "COURT NO. 12", "video conferencing".
        #[arg(long = "court")]
        courts: Vec<String>,
    },
    /// Parse a local cause-list PDF and print the records.
    ParsePdf {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, value_parser = parse_hearing_date)]
        date: NaiveDate,
    },
    /// Print the records stored for a hearing date.
    Records {
        #[arg(long, value_parser = parse_hearing_date)]
        date: NaiveDate,
    },
    /// Show recent run summaries, newest first.
    Runs {
        #[arg(long, default_value_t = DEFAULT_RUN_LIMIT)]
        limit: usize,
    },
}

fn parse_source_mode(raw: &str) -> Result<SourceMode, String> {
    SourceMode::parse(raw).ok_or_else(|| format!("unknown source mode '{raw}', expected json or pdf"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();
    init_tracing(config.log_json);

    match cli.command {
        Command::Run {
            date,
            mode,
            dry_run,
        } => run_ingestion(&config, date, mode, dry_run).await,
        Command::Discover { date } => {
            let source = HttpSource::new(&config)?;
            let handle = RunHandle::new(config.log_capacity);
            let courts = discover_for_date(&source, date, &handle).await;
            print_json(&courts)
        }
        Command::FetchCourts { date, courts } => fetch_courts(&config, date, courts).await,
        Command::ParsePdf { file, date } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let outcome = parse_document(&bytes, date);
            let faults: Vec<String> = outcome.faults.iter().map(ToString::to_string).collect();
            print_json(&json!({ "records": outcome.records, "faults": faults }))
        }
        Command::Records { date } => {
            let store = RedisStore::connect(&config).await?;
            print_json(&store.records_for_date(date).await?)
        }
        Command::Runs { limit } => {
            let store = RedisStore::connect(&config).await?;
            print_json(&store.recent_runs(limit).await?)
        }
    }
}

async fn run_ingestion(
    config: &Config,
    date: Option<NaiveDate>,
    mode: Option<SourceMode>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let mode = mode.unwrap_or(config.source_mode);
    info!(
        mode = %mode,
        date_api = %config.date_api_url,
        redis = %config.redis_url,
        dry_run,
        "cause list engine starting"
    );

    let source = Arc::new(HttpSource::new(config)?);
    let memory = MemoryStore::new();
    let mut store_stats = None;
    let store: Arc<dyn CauseStore> = if dry_run {
        Arc::new(memory.clone())
    } else {
        let redis = RedisStore::connect(config).await?;
        store_stats = Some(redis.stats());
        Arc::new(redis)
    };
    let metrics = Arc::new(IngestMetrics::new());
    let handle = RunHandle::new(config.log_capacity);
    let orchestrator = Orchestrator::new(
        source,
        store.clone(),
        mode,
        config.insert_batch_size,
        metrics.clone(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let progress = if config.progress_port == 0 {
        None
    } else {
        match bind_progress_listener(config.progress_port).await {
            Ok(listener) => Some(tokio::spawn(serve_progress(
                listener,
                handle.clone(),
                metrics.clone(),
                shutdown_rx,
            ))),
            Err(e) => {
                warn!(port = config.progress_port, error = %e, "progress endpoint unavailable");
                None
            }
        }
    };

    // Ctrl-C asks the run to stop after the current date instead of killing it.
    let stopper = handle.clone();
    let ctrl_c = tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() && stopper.request_stop() {
            warn!("stop requested, finishing the current date");
        }
    });

    let result = orchestrator.run(&handle, date).await;

    ctrl_c.abort();
    let _ = shutdown_tx.send(true);
    if let Some(task) = progress {
        let _ = task.await;
    }

    if let Some(stats) = &store_stats {
        info!(store = ?stats.snapshot(), "redis statistics");
    }
    info!(metrics = ?metrics.snapshot(), "engine statistics");

    let total = result?;
    let summary = store.recent_runs(1).await?.into_iter().next();
    if dry_run {
        info!(held_in_memory = memory.total_records(), "dry run, nothing written to Redis");
    }
    print_json(&json!({ "records_extracted": total, "summary": summary }))
}

async fn fetch_courts(config: &Config, date: NaiveDate, courts: Vec<String>) -> anyhow::Result<()> {
    let source = Arc::new(HttpSource::new(config)?);
    let handle = RunHandle::new(config.log_capacity);

    let selectors: Vec<CourtSelector> = if courts.is_empty() {
        info!(%date, "no courts given, discovering every court for the date");
        discover_for_date(&*source, date, &handle)
            .await
            .iter()
            .map(|court| CourtSelector::parse(&court.court_number))
            .collect()
    } else {
        courts.iter().map(|raw| CourtSelector::parse(raw)).collect()
    };

    if selectors.is_empty() {
        warn!(%date, "no courts to fetch");
        return Ok(());
    }

    let store = Arc::new(RedisStore::connect(config).await?);
    let orchestrator = Orchestrator::new(
        source,
        store,
        config.source_mode,
        config.insert_batch_size,
        Arc::new(IngestMetrics::new()),
    );
    let report = orchestrator.fetch_courts(&handle, date, &selectors).await?;
    print_json(&report)
}
