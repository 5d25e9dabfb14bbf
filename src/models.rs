// =============================================================================
// models.rs - Records, descriptors and upstream shapes
// =============================================================================
//
// CaseRecord is the unit of output: flat, keyed by court, hearing date and
// case number. Connected cases are sibling records that share the serial
// number and hearing date of their primary case, there is no nesting once a
// list has been normalized.
//
// The upstream feed types keep every field as a raw `serde_json::Value`,
// because the court's API is happy to send a number where a string was
// promised. Normalization happens in the scanners, not in serde.
// =============================================================================

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One normalized cause-list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Sequence number within a court's list. Not globally unique.
    pub serial_no: String,
    /// Canonical court label, e.g. `COURT NO. 01` or `VIDEO CONFERENCING`.
    pub court_identity: String,
    /// `type/number/year` with missing segments left out.
    pub case_number: String,
    pub petitioner: String,
    pub respondent: String,
    pub advocate: String,
    /// Supplied by the caller, never derived from the document.
    pub hearing_date: NaiveDate,
    /// Free-text classification label from upstream.
    pub case_category: String,
    /// Single-line reconstruction of the entry, kept for auditing.
    pub raw_text: String,
    pub is_flagged: bool,
}

/// A court that has published data for a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourtDescriptor {
    /// Zero-padded for numbered courts (`05`), the fixed name otherwise.
    pub court_number: String,
    pub court_name: String,
    pub judge: String,
    pub has_data: bool,
}

/// Where a run pulls its cause lists from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// The structured feed (default).
    Json,
    /// The published PDF, parsed line by line.
    Pdf,
}

impl SourceMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Some(SourceMode::Json),
            "pdf" => Some(SourceMode::Pdf),
            _ => None,
        }
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceMode::Json => write!(f, "json"),
            SourceMode::Pdf => write!(f, "pdf"),
        }
    }
}

/// Terminal status of an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
    Cancelled,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => write!(f, "success"),
            RunStatus::Error => write!(f, "error"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Persisted once at the end of every run, whatever the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub status: RunStatus,
    pub records_extracted: u64,
    pub run_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub error_message: Option<String>,
}

impl RunSummary {
    pub fn new(status: RunStatus, records_extracted: u64, error_message: Option<String>) -> Self {
        let created_at = Utc::now();
        Self {
            run_id: Uuid::new_v4().to_string(),
            status,
            records_extracted,
            run_date: created_at.date_naive(),
            created_at,
            error_message,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} with {} record(s)",
            self.run_id, self.status, self.records_extracted
        )?;
        if let Some(err) = &self.error_message {
            write!(f, " ({err})")?;
        }
        Ok(())
    }
}

/// One entry of the upstream date list, `{"doc": "2025-11-24"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct DateEntry {
    pub doc: String,
}

/// A primary case as published in the structured feed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CauseListEntry {
    #[serde(default)]
    pub courtno: Option<Value>,
    #[serde(default)]
    pub serial_no: Option<Value>,
    #[serde(default)]
    pub mcasetype: Option<Value>,
    #[serde(default)]
    pub mcaseno: Option<Value>,
    #[serde(default)]
    pub mcaseyr: Option<Value>,
    #[serde(default)]
    pub pname: Option<Value>,
    #[serde(default)]
    pub rname: Option<Value>,
    #[serde(default)]
    pub mpadv: Option<Value>,
    #[serde(default)]
    pub judge1: Option<Value>,
    /// Connected cases. Anything other than an array is ignored.
    #[serde(default)]
    pub extra: Option<Value>,
}

/// A connected case nested under a primary feed entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectedEntry {
    #[serde(default)]
    pub excasetype: Option<Value>,
    #[serde(default)]
    pub excaseno: Option<Value>,
    #[serde(default)]
    pub excaseyr: Option<Value>,
    #[serde(default)]
    pub expname: Option<Value>,
    #[serde(default)]
    pub exrname: Option<Value>,
    #[serde(default)]
    pub expadv: Option<Value>,
}
