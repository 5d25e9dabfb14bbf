// =============================================================================
// text_scanner.rs - Flagged-category detection
// =============================================================================
//
// Every case record is checked against a fixed keyword list describing the
// flagged category: matters concerning Hindu religious and charitable
// endowments (temples, mutts, devasthanams and the department that runs
// them). One Aho-Corasick automaton scans for all of them in a single pass,
// ASCII case-insensitively.
// =============================================================================

use std::sync::LazyLock;

use aho_corasick::AhoCorasick;
use tracing::trace;

/// Keywords that mark a case as belonging to the flagged category.
/// Matched as case-insensitive substrings.
pub static FLAGGED_KEYWORDS: &[&str] = &[
    "HRCE",
    "Hindu Religious",
    "Charitable Endowments",
    "Temple",
    "Devasthanam",
    "Devaswom",
    "Mutt",
    "Religious Trust",
    "Dharmada",
    "Arulmigu",
];

static FLAGGED_AUTOMATON: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(FLAGGED_KEYWORDS)
        .expect("flagged-category keywords must build into an automaton")
});

/// True iff any flagged keyword occurs in `text`. Empty text never matches.
pub fn is_flagged_text(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    match FLAGGED_AUTOMATON.find(text) {
        Some(hit) => {
            trace!(
                keyword = FLAGGED_KEYWORDS[hit.pattern().as_usize()],
                "flagged keyword matched"
            );
            true
        }
        None => false,
    }
}

/// A record is flagged when its petitioner, its respondent or its raw text
/// matches. Any one of the three is enough.
pub fn classify_record(petitioner: &str, respondent: &str, raw_text: &str) -> bool {
    is_flagged_text(petitioner) || is_flagged_text(respondent) || is_flagged_text(raw_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_not_flagged() {
        assert!(!is_flagged_text(""));
    }

    #[test]
    fn test_keyword_match_ignores_case() {
        assert!(is_flagged_text("Sri Devasthanam, Palani"));
        assert!(is_flagged_text("SRI DEVASTHANAM"));
        assert!(is_flagged_text("the devasthanam committee"));
    }

    #[test]
    fn test_unrelated_text_is_not_flagged() {
        assert!(!is_flagged_text("State Bank of India vs R. Kumar"));
    }

    #[test]
    fn test_classify_record_is_logical_or() {
        assert!(classify_record("Arulmigu Kapaleeswarar", "", ""));
        assert!(classify_record("", "The Commissioner, HRCE", ""));
        assert!(classify_record("", "", "12 WP/1/2025 Temple trustees"));
        assert!(!classify_record("A. Kumar", "B. Rani", "3 CRP/4/2024"));
    }
}
