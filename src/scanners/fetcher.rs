// =============================================================================
// fetcher.rs - Talking to the court's cause-list server
// =============================================================================
//
// Three upstream endpoints feed the engine:
//
//   getDate.php?toc=1           -> [{"doc": "2025-11-24"}, ...]
//   causelists/pdf/cause_DDMMYYYY.pdf
//   api/result.php?file=cause_DDMMYYYY.xml   -> JSON array of cases
//
// Every request has a bounded timeout and a small fixed number of attempts,
// retried back to back. A missing PDF (non-200) is a normal outcome for a
// date without a published list, not an error.
// =============================================================================

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::{truncate_detail, FetchError};
use crate::models::DateEntry;

/// The upstream collaborator the orchestrator and discovery pull from.
#[async_trait]
pub trait CauseListSource: Send + Sync {
    /// Dates with a published list, as `YYYY-MM-DD` strings.
    async fn available_dates(&self) -> Result<Vec<String>, FetchError>;

    /// Raw PDF bytes for a date. `Ok(None)` when the server has nothing.
    async fn document_bytes(&self, date: NaiveDate) -> Result<Option<Vec<u8>>, FetchError>;

    /// The structured feed for a date, one JSON value per primary case.
    async fn cause_list_feed(&self, date: NaiveDate) -> Result<Vec<Value>, FetchError>;
}

/// `cause_24112025` for 2025-11-24.
pub fn cause_file_stem(date: NaiveDate) -> String {
    format!("cause_{}", date.format("%d%m%Y"))
}

pub struct HttpSource {
    client: reqwest::Client,
    date_api_url: String,
    pdf_base_url: String,
    feed_url: String,
    attempts: u32,
}

impl HttpSource {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            date_api_url: config.date_api_url.clone(),
            pdf_base_url: config.pdf_base_url.trim_end_matches('/').to_string(),
            feed_url: config.feed_url.clone(),
            attempts: config.fetch_attempts.max(1),
        })
    }

    pub fn feed_url_for(&self, date: NaiveDate) -> Result<Url, FetchError> {
        let file = format!("{}.xml", cause_file_stem(date));
        Ok(Url::parse_with_params(&self.feed_url, &[("file", file)])?)
    }

    pub fn document_url_for(&self, date: NaiveDate) -> String {
        format!("{}/{}.pdf", self.pdf_base_url, cause_file_stem(date))
    }

    /// GET with a fixed number of immediate retries on transport failures.
    /// HTTP status codes are returned to the caller untouched.
    async fn get_with_retry(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let mut last_detail = String::new();

        for attempt in 1..=self.attempts {
            debug!(url, attempt, attempts = self.attempts, "GET");
            match self.client.get(url).send().await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                    last_detail = truncate_detail(&e);
                    warn!(
                        url,
                        attempt,
                        attempts = self.attempts,
                        error = %last_detail,
                        "upstream request failed"
                    );
                }
                Err(e) => return Err(FetchError::Http(e)),
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts: self.attempts,
            detail: last_detail,
        })
    }

    async fn get_json_text(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.get_with_retry(url).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl CauseListSource for HttpSource {
    async fn available_dates(&self) -> Result<Vec<String>, FetchError> {
        let body = self.get_json_text(&self.date_api_url).await?;
        let entries: Vec<DateEntry> = serde_json::from_str(&body)?;
        let dates: Vec<String> = entries.into_iter().map(|e| e.doc).collect();
        info!(count = dates.len(), "fetched available cause-list dates");
        Ok(dates)
    }

    async fn document_bytes(&self, date: NaiveDate) -> Result<Option<Vec<u8>>, FetchError> {
        let url = self.document_url_for(date);
        let resp = self.get_with_retry(&url).await?;
        let status = resp.status();
        if !status.is_success() {
            info!(url = %url, status = status.as_u16(), "no cause-list document for date");
            return Ok(None);
        }
        let bytes = resp.bytes().await?;
        info!(url = %url, size = bytes.len(), "downloaded cause-list document");
        Ok(Some(bytes.to_vec()))
    }

    async fn cause_list_feed(&self, date: NaiveDate) -> Result<Vec<Value>, FetchError> {
        let url = self.feed_url_for(date)?;
        let body = self.get_json_text(url.as_str()).await?;
        let items: Vec<Value> = serde_json::from_str(&body)?;
        info!(url = %url, items = items.len(), "fetched cause-list feed");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        let mut config = Config::from_env();
        config.pdf_base_url = "https://courts.example/causelists/pdf/".into();
        config.feed_url = "https://courts.example/api/result.php".into();
        config
    }

    #[test]
    fn test_file_stem_is_day_month_year() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 4).unwrap();
        assert_eq!(cause_file_stem(date), "cause_04112025");
    }

    #[test]
    fn test_urls_are_derived_from_the_date() {
        let source = HttpSource::new(&test_config()).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 11, 24).unwrap();
        assert_eq!(
            source.document_url_for(date),
            "https://courts.example/causelists/pdf/cause_24112025.pdf"
        );
        assert_eq!(
            source.feed_url_for(date).unwrap().as_str(),
            "https://courts.example/api/result.php?file=cause_24112025.xml"
        );
    }
}
