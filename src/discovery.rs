// =============================================================================
// discovery.rs - Which courts sit on a given date
// =============================================================================
//
// Discovery reads the structured feed for one date and reports every distinct
// court in it, without persisting anything. The first item seen for a court
// supplies the judge. Courts come back numbered-first in ascending order, the
// special courts after them.
// =============================================================================

use std::collections::BTreeMap;
use std::sync::LazyLock;

use aho_corasick::{AhoCorasick, MatchKind};
use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::court::CourtIdentity;
use crate::error::truncate_detail;
use crate::models::CourtDescriptor;
use crate::normalize::sanitize_text;
use crate::run_state::RunHandle;
use crate::scanners::fetcher::CauseListSource;

/// Judge when the feed gives none.
pub const UNKNOWN_JUDGE: &str = "Unknown";

static HONORIFICS: &[&str] = &[
    "The Honourable",
    "Mr.Justice",
    "Mrs.Justice",
    "Ms.Justice",
    "Dr.Justice",
];

static HONORIFIC_AUTOMATON: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostLongest)
        .build(HONORIFICS)
        .expect("honorific patterns must build into an automaton")
});

/// Strip the court's honorifics from a judge line and collapse whitespace.
pub fn clean_judge_name(raw: &str) -> String {
    let blanks = vec![" "; HONORIFICS.len()];
    let stripped = HONORIFIC_AUTOMATON.replace_all(raw, &blanks);
    let name = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        UNKNOWN_JUDGE.to_string()
    } else {
        name
    }
}

/// Distinct courts in a feed, ordered by identity.
pub fn discover_courts(items: &[Value]) -> Vec<CourtDescriptor> {
    let mut found: BTreeMap<CourtIdentity, CourtDescriptor> = BTreeMap::new();

    for item in items {
        let label = sanitize_text(item.get("courtno"));
        if label.is_empty() {
            continue;
        }
        let Some(identity) = CourtIdentity::resolve(&label) else {
            debug!(court = %label, "unrecognised court label, not listed");
            continue;
        };

        found.entry(identity).or_insert_with_key(|identity| CourtDescriptor {
            court_number: identity.court_number(),
            court_name: identity.display_name(),
            judge: clean_judge_name(&sanitize_text(item.get("judge1"))),
            has_data: true,
        });
    }

    found.into_values().collect()
}

/// Fetch the feed for `date` and list its courts. A failed fetch is logged
/// and reported as "no courts".
pub async fn discover_for_date(
    source: &dyn CauseListSource,
    date: NaiveDate,
    handle: &RunHandle,
) -> Vec<CourtDescriptor> {
    handle.log(format!("Starting court discovery for {date}..."));

    let items = match source.cause_list_feed(date).await {
        Ok(items) => items,
        Err(e) => {
            handle.log(format!("Failed to fetch data: {}", truncate_detail(&e)));
            return Vec::new();
        }
    };

    handle.log(format!(
        "Successfully fetched {} records. Analyzing courts...",
        items.len()
    ));
    let courts = discover_courts(&items);
    handle.log(format!(
        "Discovery complete. Found {} active courts.",
        courts.len()
    ));
    courts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedFeed(Result<Vec<Value>, u16>);

    #[async_trait]
    impl CauseListSource for FixedFeed {
        async fn available_dates(&self) -> Result<Vec<String>, FetchError> {
            Ok(Vec::new())
        }

        async fn document_bytes(&self, _date: NaiveDate) -> Result<Option<Vec<u8>>, FetchError> {
            Ok(None)
        }

        async fn cause_list_feed(&self, _date: NaiveDate) -> Result<Vec<Value>, FetchError> {
            match &self.0 {
                Ok(items) => Ok(items.clone()),
                Err(status) => Err(FetchError::Status {
                    url: "https://courts.example/api/result.php".into(),
                    status: *status,
                }),
            }
        }
    }

    fn feed() -> Vec<Value> {
        vec![
            json!({"courtno": "COURT NO. 05", "judge1": "The Honourable Mr.Justice R. Subramanian"}),
            json!({"courtno": "VIDEO CONFERENCING", "judge1": null}),
            json!({"courtno": "COURT NO. 01", "judge1": "The Honourable Dr.Justice  Anita Sumanth"}),
            json!({"courtno": "COURT NO. 5", "judge1": "Someone Else"}),
            json!({"courtno": "REGISTRAR", "judge1": "Not a court"}),
            json!({"courtno": null}),
        ]
    }

    #[test]
    fn test_courts_are_ordered_numbered_then_special() {
        let courts = discover_courts(&feed());
        let numbers: Vec<&str> = courts.iter().map(|c| c.court_number.as_str()).collect();
        assert_eq!(numbers, vec!["01", "05", "VIDEO CONFERENCING"]);
        assert_eq!(courts[0].court_name, "COURT NO. 01");
        assert!(courts.iter().all(|c| c.has_data));
    }

    #[test]
    fn test_first_occurrence_supplies_the_judge() {
        let courts = discover_courts(&feed());
        assert_eq!(courts[0].judge, "Anita Sumanth");
        assert_eq!(courts[1].judge, "R. Subramanian");
        assert_eq!(courts[2].judge, UNKNOWN_JUDGE);
    }

    #[test]
    fn test_clean_judge_name() {
        assert_eq!(clean_judge_name("THE HONOURABLE MRS.JUSTICE  P. T. Asha"), "P. T. Asha");
        assert_eq!(clean_judge_name("   "), UNKNOWN_JUDGE);
    }

    #[tokio::test]
    async fn test_fetch_failure_yields_no_courts() {
        let handle = RunHandle::default();
        let source = FixedFeed(Err(503));
        let date = NaiveDate::from_ymd_opt(2025, 11, 24).unwrap();
        let courts = discover_for_date(&source, date, &handle).await;
        assert!(courts.is_empty());
        assert!(handle.snapshot().logs[0].contains("Failed to fetch data"));
        assert!(!handle.snapshot().is_running);
    }

    #[tokio::test]
    async fn test_discover_for_date_uses_the_feed() {
        let handle = RunHandle::default();
        let source = FixedFeed(Ok(feed()));
        let date = NaiveDate::from_ymd_opt(2025, 11, 24).unwrap();
        let courts = discover_for_date(&source, date, &handle).await;
        assert_eq!(courts.len(), 3);
    }
}
