// =============================================================================
// config.rs - Runtime configuration
// =============================================================================
//
// Every knob can be overridden through a CAUSE_LIST_* environment variable
// (or a .env file). Unparsable values fall back to the default instead of
// refusing to start.
// =============================================================================

use std::env;
use std::time::Duration;

use crate::models::SourceMode;
use crate::run_state::DEFAULT_LOG_CAPACITY;

const DEFAULT_BASE_URL: &str = "https://www.mhc.tn.gov.in/judis/clists/clists-madras";
const DEFAULT_FEED_URL: &str = "https://mhc.tn.gov.in/judis/clists/clists-madras/api/result.php";

#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // UPSTREAM ENDPOINTS
    // =========================================================================
    /// Returns `[{"doc": "YYYY-MM-DD"}, ...]`.
    pub date_api_url: String,

    /// Directory holding `cause_<DDMMYYYY>.pdf`.
    pub pdf_base_url: String,

    /// Structured feed, queried with `?file=cause_<DDMMYYYY>.xml`.
    pub feed_url: String,

    /// Which representation a run ingests.
    pub source_mode: SourceMode,

    // =========================================================================
    // HTTP BEHAVIOUR
    // =========================================================================
    /// Per-request timeout.
    pub request_timeout: Duration,

    /// Attempts per request. Retried immediately, no backoff.
    pub fetch_attempts: u32,

    /// The court's server has served an incomplete certificate chain for
    /// years. Certificate checks are off unless this is set to false.
    pub accept_invalid_certs: bool,

    pub user_agent: String,

    // =========================================================================
    // PERSISTENCE
    // =========================================================================
    pub redis_url: String,

    /// Prefix for every key the engine writes.
    pub redis_prefix: String,

    /// Records per bulk insert.
    pub insert_batch_size: usize,

    // =========================================================================
    // OBSERVABILITY
    // =========================================================================
    /// Entries kept in the run log trail.
    pub log_capacity: usize,

    /// Port for the progress endpoint. 0 disables it.
    pub progress_port: u16,

    /// Emit JSON lines instead of human-readable logs.
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let base_url = env_or_default("CAUSE_LIST_BASE_URL", DEFAULT_BASE_URL);
        let base_url = base_url.trim_end_matches('/').to_string();

        Config {
            date_api_url: env_or_default(
                "CAUSE_LIST_DATE_API_URL",
                &format!("{base_url}/api/getDate.php?toc=1"),
            ),
            pdf_base_url: env_or_default(
                "CAUSE_LIST_PDF_BASE_URL",
                &format!("{base_url}/causelists/pdf"),
            ),
            feed_url: env_or_default("CAUSE_LIST_FEED_URL", DEFAULT_FEED_URL),
            source_mode: SourceMode::parse(&env_or_default("CAUSE_LIST_SOURCE_MODE", "json"))
                .unwrap_or(SourceMode::Json),

            request_timeout: Duration::from_secs(
                env_or_default("CAUSE_LIST_REQUEST_TIMEOUT_SECS", "30")
                    .parse()
                    .unwrap_or(30),
            ),
            fetch_attempts: env_or_default("CAUSE_LIST_FETCH_ATTEMPTS", "2")
                .parse()
                .unwrap_or(2),
            accept_invalid_certs: parse_bool(&env_or_default(
                "CAUSE_LIST_ACCEPT_INVALID_CERTS",
                "true",
            ))
            .unwrap_or(true),
            user_agent: env_or_default(
                "CAUSE_LIST_USER_AGENT",
                concat!("CauseListEngine/", env!("CARGO_PKG_VERSION")),
            ),

            redis_url: env_or_default("CAUSE_LIST_REDIS_URL", "redis://127.0.0.1:6379"),
            redis_prefix: env_or_default("CAUSE_LIST_REDIS_PREFIX", "causelist"),
            insert_batch_size: env_or_default("CAUSE_LIST_INSERT_BATCH_SIZE", "1000")
                .parse()
                .unwrap_or(1000),

            log_capacity: env_or_default(
                "CAUSE_LIST_LOG_CAPACITY",
                &DEFAULT_LOG_CAPACITY.to_string(),
            )
            .parse()
            .unwrap_or(DEFAULT_LOG_CAPACITY),
            progress_port: env_or_default("CAUSE_LIST_PROGRESS_PORT", "9090")
                .parse()
                .unwrap_or(9090),
            log_json: parse_bool(&env_or_default("CAUSE_LIST_LOG_JSON", "false")).unwrap_or(false),
        }
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
