// =============================================================================
// pdf_scanner.rs - Line-driven parser for the published cause-list PDF
// =============================================================================
//
// The PDF has no structure we can rely on, only a visual layout that
// survives text extraction reasonably well:
//
//   COURT NO. 12
//   1   WP/1234/2025   ARULMIGU TEMPLE TRUST     M/S. K. RAMAN
//       (Writ Petition) VS
//       THE COMMISSIONER, HR&CE     CHENNAI
//       AND
//       WMP/1300/2025  ...
//
// Each page is walked with a cursor. In ExpectCaseStart we look for a line
// that opens a record (a serial + case number, a bare case number continuing
// the current serial, or a lone AND deferring the case number to the next
// line). Once a record is opened we switch to InLookahead and peek at up to
// five following lines for the case category and the respondent, without
// consuming them.
//
// Court context survives page breaks. The serial number does not.
// =============================================================================

use std::sync::LazyLock;

use chrono::NaiveDate;
use lopdf::Document;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::ParseFault;
use crate::models::CaseRecord;
use crate::normalize::Normalize;
use crate::text_scanner::classify_record;

/// Lines peeked at after a case-start line.
pub const LOOKAHEAD_LINES: usize = 5;

/// Minimum length of text after "VS" for it to count as the respondent.
const MIN_INLINE_RESPONDENT_LEN: usize = 3;

static COURT_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"COURT\s+NO\.\s+(\d+(?:\s*[a-zA-Z]\b)?)").expect("court header pattern is valid")
});

static MAIN_CASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s+([A-Z]+(?:[/ ][A-Za-z0-9]+)?[/ ]\d+/\d+)\s+(.*)")
        .expect("main case pattern is valid")
});

static CONNECTED_CASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:AND)?\s*([A-Z]+(?:[/ ][A-Za-z0-9]+)?[/ ]\d+/\d+)\s+(.*)")
        .expect("connected case pattern is valid")
});

static AND_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*AND\s*$").expect("and-only pattern is valid"));

/// The line following a lone AND: a case number with no AND prefix.
static DEFERRED_CASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Z]+(?:[/ ][A-Za-z0-9]+)?[/ ]\d+/\d+)\s+(.*)")
        .expect("deferred case pattern is valid")
});

static ADVOCATE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+(M/S\.|Mr\.|Ms\.|Mrs\.|Dr\.|Adv\.)").expect("advocate prefix pattern is valid")
});

static COLUMN_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("column gap pattern is valid"));

static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((.*?)\)").expect("parenthesized pattern is valid"));

static VS_DIVIDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)vs").expect("vs divider pattern is valid"));

/// Records extracted from a document plus the pages that could not be read.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub records: Vec<CaseRecord>,
    pub faults: Vec<ParseFault>,
}

/// How a single (trimmed) line is classified. At most one kind applies.
#[derive(Debug, PartialEq, Eq)]
pub enum LineKind<'a> {
    Main {
        serial: &'a str,
        case_number: &'a str,
        rest: &'a str,
    },
    Connected {
        case_number: &'a str,
        rest: &'a str,
    },
    AndOnly,
    Other,
}

impl<'a> LineKind<'a> {
    pub fn classify(line: &'a str) -> Self {
        if let Some(caps) = MAIN_CASE.captures(line) {
            let (Some(serial), Some(case_number), Some(rest)) = (caps.get(1), caps.get(2), caps.get(3))
            else {
                return LineKind::Other;
            };
            return LineKind::Main {
                serial: serial.as_str(),
                case_number: case_number.as_str(),
                rest: rest.as_str(),
            };
        }
        if let Some(caps) = CONNECTED_CASE.captures(line) {
            if let (Some(case_number), Some(rest)) = (caps.get(1), caps.get(2)) {
                return LineKind::Connected {
                    case_number: case_number.as_str(),
                    rest: rest.as_str(),
                };
            }
        }
        if AND_ONLY.is_match(line) {
            return LineKind::AndOnly;
        }
        LineKind::Other
    }

    pub fn is_case_start(&self) -> bool {
        !matches!(self, LineKind::Other)
    }
}

/// Split the text after the case number into petitioner and advocate.
///
/// Splits once before the first advocate prefix (`M/S.`, `Mr.`, ...). With no
/// prefix, falls back to the first two columns separated by 2+ spaces.
pub fn split_parties(rest: &str) -> (String, String) {
    if let Some(caps) = ADVOCATE_PREFIX.captures(rest) {
        if let (Some(whole), Some(prefix)) = (caps.get(0), caps.get(1)) {
            let petitioner = rest[..whole.start()].normalized();
            let advocate = rest[prefix.start()..].normalized();
            return (petitioner, advocate);
        }
    }

    let mut columns = COLUMN_GAP.split(rest);
    let petitioner = columns.next().unwrap_or_default().normalized();
    let advocate = columns.next().unwrap_or_default().normalized();
    (petitioner, advocate)
}

/// The last court header on a page, as `COURT NO. <n>`.
pub fn court_header_in(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .filter_map(|line| COURT_HEADER.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().normalized()))
        .last()
        .map(|number| format!("COURT NO. {number}"))
}

/// A record whose first line has been read and whose category and
/// respondent are still being looked for.
#[derive(Debug, Clone)]
struct PendingRecord {
    serial_no: String,
    case_number: String,
    petitioner: String,
    advocate: String,
    raw_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookaheadStep {
    Continue,
    Done,
}

/// Scans the lines after a case start for `(category)` and the respondent.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Lookahead {
    pub case_category: String,
    pub respondent: String,
    found_vs: bool,
}

impl Lookahead {
    /// Feed one (trimmed) line. `Done` means the lookahead is over: either
    /// the line after VS supplied the respondent or the line opens the next
    /// record. A respondent found on the VS line itself keeps the scan going
    /// so a later `(category)` is still picked up. A blank line after VS
    /// counts as the respondent line.
    pub fn feed(&mut self, line: &str) -> LookaheadStep {
        if LineKind::classify(line).is_case_start() {
            return LookaheadStep::Done;
        }

        if self.case_category.is_empty() && line.contains('(') {
            if let Some(category) = PARENTHESIZED.captures(line).and_then(|caps| caps.get(1)) {
                self.case_category = category.as_str().normalized();
            }
        }

        if VS_DIVIDER.is_match(line) {
            self.found_vs = true;
            if let Some(after) = VS_DIVIDER.splitn(line, 3).nth(1) {
                let candidate = after.trim().trim_start_matches('-').trim();
                if candidate.chars().count() > MIN_INLINE_RESPONDENT_LEN {
                    self.respondent = candidate.to_string();
                }
            }
        } else if self.found_vs && self.respondent.is_empty() {
            self.respondent = COLUMN_GAP.split(line).next().unwrap_or_default().normalized();
            return LookaheadStep::Done;
        }

        LookaheadStep::Continue
    }
}

/// Which state the page walker is in.
enum ParserState {
    ExpectCaseStart,
    InLookahead {
        pending: PendingRecord,
        /// Index of the line the case number was read from.
        anchor: usize,
    },
}

/// Walk one page of extracted text. `court` carries over between pages.
pub fn parse_page(
    text: &str,
    court: &mut Option<String>,
    hearing_date: NaiveDate,
) -> Vec<CaseRecord> {
    let lines: Vec<&str> = text.lines().collect();
    if let Some(header) = court_header_in(&lines) {
        *court = Some(header);
    }
    let court_identity = court.clone().unwrap_or_default();

    let mut records = Vec::new();
    let mut serial: Option<String> = None;
    let mut cursor = 0;
    let mut state = ParserState::ExpectCaseStart;

    loop {
        state = match state {
            ParserState::ExpectCaseStart => {
                let Some(raw_line) = lines.get(cursor) else {
                    break;
                };
                let line = raw_line.trim();

                let opened = match LineKind::classify(line) {
                    LineKind::Main {
                        serial: sr,
                        case_number,
                        rest,
                    } => {
                        serial = Some(sr.to_string());
                        Some((sr.to_string(), case_number, rest, line))
                    }
                    LineKind::Connected { case_number, rest } => serial
                        .clone()
                        .map(|sr| (sr, case_number, rest, line)),
                    LineKind::AndOnly => match (&serial, lines.get(cursor + 1)) {
                        (Some(sr), Some(next)) => {
                            let next = next.trim();
                            match DEFERRED_CASE.captures(next) {
                                Some(caps) => match (caps.get(1), caps.get(2)) {
                                    (Some(case_number), Some(rest)) => {
                                        // The deferred line belongs to this record.
                                        cursor += 1;
                                        Some((sr.clone(), case_number.as_str(), rest.as_str(), next))
                                    }
                                    _ => None,
                                },
                                None => None,
                            }
                        }
                        _ => None,
                    },
                    LineKind::Other => None,
                };

                match opened {
                    Some((serial_no, case_number, rest, source_line)) => {
                        let (petitioner, advocate) = split_parties(rest);
                        ParserState::InLookahead {
                            pending: PendingRecord {
                                serial_no,
                                case_number: case_number.normalized(),
                                petitioner,
                                advocate,
                                raw_text: source_line.to_string(),
                            },
                            anchor: cursor,
                        }
                    }
                    None => {
                        cursor += 1;
                        ParserState::ExpectCaseStart
                    }
                }
            }

            ParserState::InLookahead { pending, anchor } => {
                let mut lookahead = Lookahead::default();
                for next in lines.iter().skip(anchor + 1).take(LOOKAHEAD_LINES) {
                    if lookahead.feed(next.trim()) == LookaheadStep::Done {
                        break;
                    }
                }

                let is_flagged =
                    classify_record(&pending.petitioner, &lookahead.respondent, &pending.raw_text);
                records.push(CaseRecord {
                    serial_no: pending.serial_no,
                    court_identity: court_identity.clone(),
                    case_number: pending.case_number,
                    petitioner: pending.petitioner,
                    respondent: lookahead.respondent,
                    advocate: pending.advocate,
                    hearing_date,
                    case_category: lookahead.case_category,
                    raw_text: pending.raw_text,
                    is_flagged,
                });

                cursor = anchor + 1;
                ParserState::ExpectCaseStart
            }
        };
    }

    records
}

/// Parse already-extracted pages. A page that could not be extracted is
/// recorded as a fault and the walk moves on to the next one.
pub fn parse_pages<I>(pages: I, hearing_date: NaiveDate) -> ParseOutcome
where
    I: IntoIterator<Item = Result<String, ParseFault>>,
{
    let mut outcome = ParseOutcome::default();
    let mut court = None;

    for (index, page) in pages.into_iter().enumerate() {
        match page {
            Ok(text) if text.trim().is_empty() => {
                debug!(page = index + 1, "page has no text layer, skipping");
            }
            Ok(text) => {
                let records = parse_page(&text, &mut court, hearing_date);
                debug!(page = index + 1, records = records.len(), "parsed page");
                outcome.records.extend(records);
            }
            Err(fault) => {
                warn!(fault = %fault, "skipping unreadable page");
                outcome.faults.push(fault);
            }
        }
    }

    outcome
}

/// Pull the text layer out of every page, in page order.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<Result<String, ParseFault>>, ParseFault> {
    let document =
        Document::load_mem(bytes).map_err(|e| ParseFault::new("document", e))?;

    Ok(document
        .get_pages()
        .keys()
        .map(|&page_number| {
            document
                .extract_text(&[page_number])
                .map_err(|e| ParseFault::new(format!("page {page_number}"), e))
        })
        .collect())
}

/// Parse a whole cause-list PDF. Never fails outright: an unreadable
/// document yields no records and a single fault.
pub fn parse_document(bytes: &[u8], hearing_date: NaiveDate) -> ParseOutcome {
    let pages = match extract_pages(bytes) {
        Ok(pages) => pages,
        Err(fault) => {
            warn!(fault = %fault, "could not open cause-list document");
            return ParseOutcome {
                records: Vec::new(),
                faults: vec![fault],
            };
        }
    };

    let page_count = pages.len();
    let outcome = parse_pages(pages, hearing_date);
    info!(
        pages = page_count,
        records = outcome.records.len(),
        faults = outcome.faults.len(),
        %hearing_date,
        "parsed cause-list document"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 24).unwrap()
    }

    fn parse(text: &str) -> Vec<CaseRecord> {
        let mut court = None;
        parse_page(text, &mut court, date())
    }

    #[test]
    fn test_two_line_record_with_next_line_respondent() {
        let records = parse(
            "1 WP/1234/2025 John Doe Mr. Smith\n\
             (Civil) VS\n\
             Jane Roe   Chennai",
        );
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.serial_no, "1");
        assert_eq!(r.case_number, "WP/1234/2025");
        assert_eq!(r.petitioner, "John Doe");
        assert!(r.advocate.starts_with("Mr."));
        assert_eq!(r.advocate, "Mr. Smith");
        assert_eq!(r.case_category, "Civil");
        assert_eq!(r.respondent, "Jane Roe");
        assert_eq!(r.hearing_date, date());
        assert_eq!(r.raw_text, "1 WP/1234/2025 John Doe Mr. Smith");
    }

    #[test]
    fn test_respondent_on_the_vs_line() {
        let records = parse(
            "3 CRP/88/2024 Meena K M/S. Rao Associates\n\
             (Revision) VS - The State of Tamil Nadu",
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].advocate, "M/S. Rao Associates");
        assert_eq!(records[0].case_category, "Revision");
        assert_eq!(records[0].respondent, "The State of Tamil Nadu");
    }

    #[test]
    fn test_category_after_inline_respondent_is_still_captured() {
        let records = parse(
            "1 WP/1/2025 John Doe Mr. Smith\n\
             VS The State of Tamil Nadu\n\
             (Writ Petition)",
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].respondent, "The State of Tamil Nadu");
        assert_eq!(records[0].case_category, "Writ Petition");
    }

    #[test]
    fn test_blank_line_after_vs_ends_with_empty_respondent() {
        let records = parse("1 WP/1/2025 John Doe Mr. Smith\n(Civil) VS\n\nMADURAI BENCH   x");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].case_category, "Civil");
        assert_eq!(records[0].respondent, "");

        let mut la = Lookahead::default();
        assert_eq!(la.feed(""), LookaheadStep::Continue);
        assert_eq!(la.feed("(Civil) VS"), LookaheadStep::Continue);
        assert_eq!(la.feed(""), LookaheadStep::Done);
    }

    // The consumed case line, not the bare "AND", is kept as raw_text so the
    // record carries its own case number and parties.
    #[test]
    fn test_and_line_consumes_the_deferred_case_line() {
        let records = parse(
            "7 WP/10/2025 Ravi S   K. Prabhu\n\
             VS\n\
             Union of India   Delhi\n\
             AND\n\
             WMP/11/2025 Ravi S   K. Prabhu\n\
             8 WP/12/2025 Lakshmi   P. Iyer",
        );
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].case_number, "WP/10/2025");
        assert_eq!(records[0].respondent, "Union of India");

        let connected = &records[1];
        assert_eq!(connected.serial_no, "7");
        assert_eq!(connected.case_number, "WMP/11/2025");
        assert_eq!(connected.petitioner, "Ravi S");
        assert_eq!(connected.raw_text, "WMP/11/2025 Ravi S   K. Prabhu");

        assert_eq!(records[2].serial_no, "8");
        assert_eq!(records[2].case_number, "WP/12/2025");
    }

    #[test]
    fn test_connected_line_shares_the_serial() {
        let records = parse(
            "2 SA/400/2023 Arulmigu Temple   M/S. Iyer\n\
             AND CMP/401/2023 Arulmigu Temple   M/S. Iyer",
        );
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].serial_no, "2");
        assert_eq!(records[1].case_number, "CMP/401/2023");
        assert!(records.iter().all(|r| r.is_flagged));
    }

    #[test]
    fn test_connected_line_without_serial_is_ignored() {
        let records = parse("CMP/401/2023 Nobody   Nowhere");
        assert!(records.is_empty());
    }

    #[test]
    fn test_lookahead_stops_at_next_case() {
        let records = parse(
            "1 WP/1/2025 First Petitioner   Adv One\n\
             2 WP/2/2025 Second Petitioner   Adv Two\n\
             (Service) VS\n\
             The Registrar",
        );
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].respondent, "");
        assert_eq!(records[0].case_category, "");
        assert_eq!(records[1].respondent, "The Registrar");
        assert_eq!(records[1].case_category, "Service");
    }

    #[test]
    fn test_double_space_fallback_split() {
        let (petitioner, advocate) = split_parties("Kumar Traders   S. Natarajan   extra");
        assert_eq!(petitioner, "Kumar Traders");
        assert_eq!(advocate, "S. Natarajan");

        let (petitioner, advocate) = split_parties("Single Column");
        assert_eq!(petitioner, "Single Column");
        assert_eq!(advocate, "");
    }

    #[test]
    fn test_court_context_last_header_wins_and_carries_over() {
        let mut court = None;
        let first = parse_page(
            "COURT NO. 3\nCOURT NO. 4 A\n1 WP/5/2025 Somebody   Counsel",
            &mut court,
            date(),
        );
        assert_eq!(first[0].court_identity, "COURT NO. 4 A");

        let second = parse_page("1 WP/6/2025 Somebody Else   Counsel", &mut court, date());
        assert_eq!(second[0].court_identity, "COURT NO. 4 A");
    }

    // A letter suffix counts only as a whole token: "5 THE" and "5 T..." give
    // court 5, while "4 A" stays a lettered court.
    #[test]
    fn test_court_header_ignores_following_words() {
        assert_eq!(
            court_header_in(&["COURT NO. 5 THE HONOURABLE"]),
            Some("COURT NO. 5".to_string())
        );
        assert_eq!(
            court_header_in(&["COURT NO. 4 A"]),
            Some("COURT NO. 4 A".to_string())
        );
    }

    #[test]
    fn test_serial_resets_between_pages() {
        let outcome = parse_pages(
            vec![
                Ok("4 WP/9/2025 Someone   Counsel".to_string()),
                Ok("AND WMP/10/2025 Orphan   Counsel".to_string()),
            ],
            date(),
        );
        assert_eq!(outcome.records.len(), 1);
    }

    #[test]
    fn test_bad_page_is_a_fault_not_a_failure() {
        let outcome = parse_pages(
            vec![
                Ok("1 WP/1/2025 Alpha   Counsel".to_string()),
                Err(ParseFault::new("page 2", "corrupt content stream")),
                Ok("1 WP/2/2025 Beta   Counsel".to_string()),
            ],
            date(),
        );
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.faults.len(), 1);
        assert_eq!(outcome.faults[0].location, "page 2");
    }

    #[test]
    fn test_unreadable_document_yields_single_fault() {
        let outcome = parse_document(b"definitely not a pdf", date());
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.faults.len(), 1);
        assert_eq!(outcome.faults[0].location, "document");
    }

    #[test]
    fn test_line_classification_is_exclusive() {
        assert!(matches!(
            LineKind::classify("12 OSA/3/2024 Someone"),
            LineKind::Main { serial: "12", .. }
        ));
        assert!(matches!(
            LineKind::classify("AND OSA/4/2024 Someone"),
            LineKind::Connected { case_number: "OSA/4/2024", .. }
        ));
        assert_eq!(LineKind::classify("AND"), LineKind::AndOnly);
        assert_eq!(LineKind::classify("(Civil) VS"), LineKind::Other);
    }

    #[test]
    fn test_lookahead_keeps_first_category() {
        let mut la = Lookahead::default();
        assert_eq!(la.feed("(Appeal)"), LookaheadStep::Continue);
        assert_eq!(la.feed("(Other) VS"), LookaheadStep::Continue);
        assert_eq!(la.feed("State Bank   Madurai"), LookaheadStep::Done);
        assert_eq!(la.case_category, "Appeal");
        assert_eq!(la.respondent, "State Bank");
    }
}
