// =============================================================================
// json_scanner.rs - Structured feed to CaseRecords
// =============================================================================
//
// Each feed item is one primary case with its connected cases nested under
// `extra`. Output is flat: the primary record, then one record per connected
// case, all sharing the primary's serial number, court and hearing date.
//
// Items are transformed independently. One that does not deserialize becomes
// a ParseFault and the rest of the feed carries on. A connected case that does
// not deserialize is a fault of its own: the primary and the other connected
// cases of that item are kept.
// =============================================================================

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

use crate::court::{CourtIdentity, CourtSelector};
use crate::error::ParseFault;
use crate::models::{CaseRecord, CauseListEntry, ConnectedEntry};
use crate::normalize::{sanitize_text, Normalize};
use crate::text_scanner::classify_record;

/// Records produced from a feed plus the items that had to be skipped.
#[derive(Debug, Default)]
pub struct TransformOutcome {
    pub records: Vec<CaseRecord>,
    pub faults: Vec<ParseFault>,
}

impl TransformOutcome {
    fn absorb(&mut self, index: usize, result: Result<TransformOutcome, ParseFault>) {
        match result {
            Ok(item) => {
                self.records.extend(item.records);
                for fault in item.faults {
                    warn!(fault = %fault, item = index, "skipping malformed connected case");
                    self.faults.push(fault);
                }
            }
            Err(fault) => {
                warn!(fault = %fault, item = index, "skipping malformed feed item");
                self.faults.push(fault);
            }
        }
    }
}

/// `type/number/year`, leaving out whichever segments are empty.
pub fn compose_case_number(case_type: &str, number: &str, year: &str) -> String {
    [case_type, number, year]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}

/// The canonical label when the court resolves, the feed's own text otherwise.
fn court_label(raw: &str) -> String {
    CourtIdentity::resolve(raw)
        .map(|identity| identity.display_name())
        .unwrap_or_else(|| raw.to_string())
}

/// Transform one feed item. An item without a court yields no records; an
/// item that is not a feed entry at all is an error.
pub fn transform_item(
    item: &Value,
    index: usize,
    hearing_date: NaiveDate,
) -> Result<TransformOutcome, ParseFault> {
    let entry: CauseListEntry = serde_json::from_value(item.clone())
        .map_err(|e| ParseFault::new(format!("item {index}"), e))?;

    let raw_court = sanitize_text(entry.courtno.as_ref());
    if raw_court.is_empty() {
        debug!(item = index, "feed item has no court, skipping");
        return Ok(TransformOutcome::default());
    }
    let court_identity = court_label(&raw_court);
    let serial_no = sanitize_text(entry.serial_no.as_ref());

    let extras: &[Value] = match &entry.extra {
        Some(Value::Array(extras)) => extras.as_slice(),
        _ => &[],
    };
    let mut outcome = TransformOutcome {
        records: Vec::with_capacity(1 + extras.len()),
        faults: Vec::new(),
    };

    let case_type = sanitize_text(entry.mcasetype.as_ref());
    let case_number = compose_case_number(
        &case_type,
        &sanitize_text(entry.mcaseno.as_ref()),
        &sanitize_text(entry.mcaseyr.as_ref()),
    );
    let petitioner = sanitize_text(entry.pname.as_ref());
    let respondent = sanitize_text(entry.rname.as_ref());
    let raw_text = format!("{serial_no} {case_number} {petitioner} vs {respondent}").normalized();
    outcome.records.push(CaseRecord {
        serial_no: serial_no.clone(),
        court_identity: court_identity.clone(),
        is_flagged: classify_record(&petitioner, &respondent, &raw_text),
        case_number,
        petitioner,
        respondent,
        advocate: sanitize_text(entry.mpadv.as_ref()),
        hearing_date,
        case_category: case_type,
        raw_text,
    });

    for (n, raw_extra) in extras.iter().enumerate() {
        let extra: ConnectedEntry = match serde_json::from_value(raw_extra.clone()) {
            Ok(extra) => extra,
            Err(e) => {
                outcome
                    .faults
                    .push(ParseFault::new(format!("item {index} extra {n}"), e));
                continue;
            }
        };
        let case_type = sanitize_text(extra.excasetype.as_ref());
        let case_number = compose_case_number(
            &case_type,
            &sanitize_text(extra.excaseno.as_ref()),
            &sanitize_text(extra.excaseyr.as_ref()),
        );
        let petitioner = sanitize_text(extra.expname.as_ref());
        let respondent = sanitize_text(extra.exrname.as_ref());
        let raw_text = format!("Connected: {case_number} {petitioner} vs {respondent}").normalized();
        outcome.records.push(CaseRecord {
            serial_no: serial_no.clone(),
            court_identity: court_identity.clone(),
            is_flagged: classify_record(&petitioner, &respondent, &raw_text),
            case_number,
            petitioner,
            respondent,
            advocate: sanitize_text(extra.expadv.as_ref()),
            hearing_date,
            case_category: case_type,
            raw_text,
        });
    }

    Ok(outcome)
}

/// Transform a whole feed, primary-then-connected, in feed order.
pub fn transform_feed(items: &[Value], hearing_date: NaiveDate) -> TransformOutcome {
    let mut outcome = TransformOutcome::default();
    for (index, item) in items.iter().enumerate() {
        outcome.absorb(index, transform_item(item, index, hearing_date));
    }
    outcome
}

/// Transform only the items whose court the selector picks out.
pub fn process_court_cases(
    items: &[Value],
    selector: &CourtSelector,
    hearing_date: NaiveDate,
) -> TransformOutcome {
    let mut outcome = TransformOutcome::default();
    for (index, item) in items.iter().enumerate() {
        let court = sanitize_text(item.get("courtno"));
        if court.is_empty() || !selector.matches(&court) {
            continue;
        }
        outcome.absorb(index, transform_item(item, index, hearing_date));
    }
    debug!(
        court = %selector,
        records = outcome.records.len(),
        faults = outcome.faults.len(),
        "filtered feed by court"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 24).unwrap()
    }

    fn sample_feed() -> Vec<Value> {
        vec![
            json!({
                "courtno": "COURT NO. 1",
                "serial_no": 4,
                "mcasetype": "WP",
                "mcaseno": "1234",
                "mcaseyr": 2025,
                "pname": " Arulmigu Kapaleeswarar Temple ",
                "rname": "The Commissioner",
                "mpadv": "M/S. K. Raman",
                "judge1": "The Honourable Mr.Justice A. Kumar",
                "extra": [
                    {"excasetype": "WMP", "excaseno": "1300", "excaseyr": "2025",
                     "expname": "Arulmigu Kapaleeswarar Temple", "exrname": "The Commissioner",
                     "expadv": "M/S. K. Raman"},
                    {"excasetype": "WMP", "excaseno": null, "excaseyr": "2025",
                     "expname": ["A. Devi", "", "B. Devi"], "exrname": null, "expadv": ""}
                ]
            }),
            json!({"courtno": "", "serial_no": 5, "mcasetype": "CRP"}),
            json!({
                "courtno": "COURT NO. 11",
                "serial_no": "1",
                "mcasetype": "SA",
                "mcaseno": "77",
                "mcaseyr": "2019",
                "pname": "Kumar",
                "rname": "Selvi",
                "mpadv": "R. Iyer"
            }),
        ]
    }

    #[test]
    fn test_primary_then_connected_records() {
        let outcome = transform_feed(&sample_feed()[..1], date());
        assert!(outcome.faults.is_empty());
        let records = outcome.records;
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.serial_no == "4" && r.hearing_date == date()));
        assert!(records.iter().all(|r| r.court_identity == "COURT NO. 01"));

        assert_eq!(records[0].case_number, "WP/1234/2025");
        assert_eq!(records[0].petitioner, "Arulmigu Kapaleeswarar Temple");
        assert_eq!(records[0].case_category, "WP");
        assert_eq!(
            records[0].raw_text,
            "4 WP/1234/2025 Arulmigu Kapaleeswarar Temple vs The Commissioner"
        );
        assert!(records[0].is_flagged);

        assert_eq!(records[1].case_number, "WMP/1300/2025");
        assert!(records[1].raw_text.starts_with("Connected: WMP/1300/2025"));

        assert_eq!(records[2].case_number, "WMP/2025");
        assert_eq!(records[2].petitioner, "A. Devi, B. Devi");
        assert_eq!(records[2].respondent, "");
        assert!(!records[2].is_flagged);
    }

    #[test]
    fn test_items_without_court_are_skipped() {
        let outcome = transform_feed(&sample_feed(), date());
        assert_eq!(outcome.records.len(), 4);
        assert!(outcome.faults.is_empty());
        assert!(outcome.records.iter().all(|r| r.case_category != "CRP"));
    }

    #[test]
    fn test_malformed_item_is_a_fault_and_the_rest_survive() {
        let mut feed = sample_feed();
        feed.insert(1, json!("not an object"));
        feed.push(json!({"courtno": "COURT NO. 2", "extra": [42]}));

        let outcome = transform_feed(&feed, date());
        assert_eq!(outcome.records.len(), 5);
        assert_eq!(outcome.faults.len(), 2);
        assert_eq!(outcome.faults[0].location, "item 1");
        assert_eq!(outcome.faults[1].location, "item 4 extra 0");
    }

    #[test]
    fn test_bad_connected_case_keeps_primary_and_good_extras() {
        let feed = vec![json!({
            "courtno": "COURT NO. 2",
            "serial_no": "9",
            "mcasetype": "WP",
            "mcaseno": "1",
            "mcaseyr": "2025",
            "pname": "Ravi",
            "rname": "State",
            "extra": [
                {"excasetype": "WMP", "excaseno": "2", "excaseyr": "2025",
                 "expname": "Ravi", "exrname": "State"},
                42
            ]
        })];

        let outcome = transform_feed(&feed, date());
        let numbers: Vec<&str> = outcome.records.iter().map(|r| r.case_number.as_str()).collect();
        assert_eq!(numbers, vec!["WP/1/2025", "WMP/2/2025"]);
        assert!(outcome.records.iter().all(|r| r.serial_no == "9"));
        assert_eq!(outcome.faults.len(), 1);
        assert_eq!(outcome.faults[0].location, "item 0 extra 1");
    }

    #[test]
    fn test_non_array_extra_is_ignored() {
        let feed = vec![json!({"courtno": "VIDEO CONFERENCING", "mcasetype": "OP", "extra": "none"})];
        let outcome = transform_feed(&feed, date());
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].court_identity, "VIDEO CONFERENCING");
        assert_eq!(outcome.records[0].case_number, "OP");
    }

    #[test]
    fn test_court_filter_uses_integer_matching() {
        let feed = sample_feed();
        let one = process_court_cases(&feed, &CourtSelector::parse("01"), date());
        assert_eq!(one.records.len(), 3);

        let eleven = process_court_cases(&feed, &CourtSelector::parse("11"), date());
        assert_eq!(eleven.records.len(), 1);
        assert_eq!(eleven.records[0].court_identity, "COURT NO. 11");
    }

    #[test]
    fn test_compose_case_number_omits_missing_segments() {
        assert_eq!(compose_case_number("WP", "", "2025"), "WP/2025");
        assert_eq!(compose_case_number("", "", ""), "");
    }
}
