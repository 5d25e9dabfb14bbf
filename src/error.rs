// =============================================================================
// error.rs - The failure taxonomy
// =============================================================================
//
// Three kinds of things go wrong while ingesting a cause list:
//
// 1. The upstream court server misbehaves (timeouts, non-200, garbage JSON).
//    Those are FetchErrors and they are caught at the fetch boundary.
// 2. A single page or a single feed item is malformed. Those are ParseFaults,
//    collected next to the good records and never escalated.
// 3. Something escapes the per-date loop. That is an IngestError and it ends
//    the run with an error summary.
// =============================================================================

use std::fmt;

use thiserror::Error;

/// Maximum length of an error detail written into the run log trail.
pub const MAX_DETAIL_LEN: usize = 100;

/// Failure talking to one of the upstream cause-list endpoints.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to parse JSON payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid upstream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("gave up on {url} after {attempts} attempt(s): {detail}")]
    Exhausted {
        url: String,
        attempts: u32,
        detail: String,
    },
}

impl FetchError {
    /// True when the server answered but the payload itself could not be
    /// decoded. A malformed top-level feed aborts the run instead of just
    /// skipping the date.
    pub fn is_payload_fault(&self) -> bool {
        matches!(self, FetchError::Decode(_))
    }
}

/// A single page or feed item that could not be turned into records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFault {
    /// Where the fault happened, e.g. `page 3` or `item 17`.
    pub location: String,
    pub reason: String,
}

impl ParseFault {
    pub fn new(location: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for ParseFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.reason)
    }
}

impl std::error::Error for ParseFault {}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Run-level faults. These are the only errors that end a run early.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("a cause-list run is already in progress")]
    AlreadyRunning,

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("upstream fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("persistence failed: {0}")]
    Store(#[from] StoreError),
}

/// Cut an error message down to something that fits in the run log trail.
pub fn truncate_detail(detail: impl fmt::Display) -> String {
    let detail = detail.to_string();
    match detail.char_indices().nth(MAX_DETAIL_LEN) {
        Some((idx, _)) => detail[..idx].to_string(),
        None => detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_detail_bounds_length() {
        let long = "x".repeat(250);
        assert_eq!(truncate_detail(&long).len(), MAX_DETAIL_LEN);
        assert_eq!(truncate_detail("short"), "short");
    }

    #[test]
    fn test_truncate_detail_respects_char_boundaries() {
        let long = "é".repeat(150);
        assert_eq!(truncate_detail(&long).chars().count(), MAX_DETAIL_LEN);
    }

    #[test]
    fn test_only_decode_errors_are_payload_faults() {
        let decode = serde_json::from_str::<Vec<u8>>("not json").unwrap_err();
        assert!(FetchError::Decode(decode).is_payload_fault());
        let status = FetchError::Status {
            url: "https://example.test".into(),
            status: 503,
        };
        assert!(!status.is_payload_fault());
    }

    #[test]
    fn test_parse_fault_display() {
        let fault = ParseFault::new("page 3", "no text layer");
        assert_eq!(fault.to_string(), "page 3: no text layer");
    }
}
