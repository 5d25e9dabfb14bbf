// =============================================================================
// court.rs - Court identity resolution and selector matching
// =============================================================================
//
// Court labels in the feed are free-form: "COURT NO. 01", "COURT NO.1 a",
// "Court No 7", "VIDEO CONFERENCING". This module turns them into a canonical
// identity and decides whether a caller's selector ("1", "01", "Court 1")
// refers to a given label.
//
// Numbers are compared as integers, never as substrings. "1" must not pick up
// courts 11, 12 or 21.
// =============================================================================

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Non-numbered courts, matched by case-insensitive containment.
pub static SPECIAL_COURTS: &[&str] = &["VIDEO CONFERENCING"];

static NUMBERED_COURT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)COURT\s+NO\.?\s*(\d+)").expect("numbered court pattern is valid")
});

static FIRST_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("integer pattern is valid"));

/// Canonical identity of a court.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CourtIdentity {
    Numbered(u32),
    Special(&'static str),
}

impl CourtIdentity {
    /// Resolve a free-form label. Returns `None` when the label is neither a
    /// numbered court nor one of the special courts.
    pub fn resolve(label: &str) -> Option<Self> {
        if let Some(caps) = NUMBERED_COURT.captures(label) {
            if let Ok(number) = caps[1].parse::<u32>() {
                return Some(CourtIdentity::Numbered(number));
            }
        }
        special_court_in(label).map(CourtIdentity::Special)
    }

    /// `05` for numbered courts, the fixed name for special ones.
    pub fn court_number(&self) -> String {
        match self {
            CourtIdentity::Numbered(n) => format!("{n:02}"),
            CourtIdentity::Special(name) => (*name).to_string(),
        }
    }

    /// `COURT NO. 05` for numbered courts, the fixed name for special ones.
    pub fn display_name(&self) -> String {
        match self {
            CourtIdentity::Numbered(_) => format!("COURT NO. {}", self.court_number()),
            CourtIdentity::Special(name) => (*name).to_string(),
        }
    }
}

impl fmt::Display for CourtIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

impl PartialOrd for CourtIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Numbered courts ascending, then the special courts by name.
impl Ord for CourtIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (CourtIdentity::Numbered(a), CourtIdentity::Numbered(b)) => a.cmp(b),
            (CourtIdentity::Numbered(_), CourtIdentity::Special(_)) => Ordering::Less,
            (CourtIdentity::Special(_), CourtIdentity::Numbered(_)) => Ordering::Greater,
            (CourtIdentity::Special(a), CourtIdentity::Special(b)) => a.cmp(b),
        }
    }
}

/// A caller-supplied court selector, parsed once and matched against many
/// candidate labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourtSelector {
    raw: String,
    /// Upper-cased selector text, used for substring fallback.
    needle: String,
    /// First embedded integer, unless the selector names a special court.
    number: Option<u64>,
}

impl CourtSelector {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_string();
        let needle = raw.to_uppercase();
        let number = if special_court_in(&needle).is_some() {
            None
        } else {
            first_integer(&raw)
        };
        Self { raw, needle, number }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Does this selector pick out the court named by `candidate`?
    ///
    /// * both sides carry an integer: equal integers only
    /// * the selector carries an integer, the candidate does not: no match
    /// * the selector has no integer: case-insensitive containment
    pub fn matches(&self, candidate: &str) -> bool {
        match self.number {
            Some(wanted) => first_integer(candidate) == Some(wanted),
            None => candidate.to_uppercase().contains(&self.needle),
        }
    }
}

impl fmt::Display for CourtSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn special_court_in(label: &str) -> Option<&'static str> {
    let upper = label.to_uppercase();
    SPECIAL_COURTS
        .iter()
        .copied()
        .find(|special| upper.contains(special))
}

fn first_integer(text: &str) -> Option<u64> {
    FIRST_INTEGER
        .find(text)
        .and_then(|m| m.as_str().parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_numbered_court_pads_two_digits() {
        let id = CourtIdentity::resolve("COURT NO. 5").unwrap();
        assert_eq!(id, CourtIdentity::Numbered(5));
        assert_eq!(id.court_number(), "05");
        assert_eq!(id.display_name(), "COURT NO. 05");
    }

    #[test]
    fn test_resolve_tolerates_missing_dot_and_suffix() {
        assert_eq!(
            CourtIdentity::resolve("court no 12 a"),
            Some(CourtIdentity::Numbered(12))
        );
        assert_eq!(
            CourtIdentity::resolve("COURT NO.01"),
            Some(CourtIdentity::Numbered(1))
        );
    }

    #[test]
    fn test_resolve_special_court() {
        let id = CourtIdentity::resolve("Video Conferencing - Hall 2").unwrap();
        assert_eq!(id, CourtIdentity::Special("VIDEO CONFERENCING"));
        assert_eq!(id.court_number(), "VIDEO CONFERENCING");
    }

    #[test]
    fn test_unrecognised_label_has_no_identity() {
        assert_eq!(CourtIdentity::resolve("REGISTRAR'S CHAMBER"), None);
    }

    #[test]
    fn test_selector_does_not_collide_on_substrings() {
        let one = CourtSelector::parse("1");
        assert!(one.matches("COURT NO. 01"));
        assert!(!one.matches("COURT NO. 11"));
        assert!(!one.matches("COURT NO. 21"));

        let eleven = CourtSelector::parse("11");
        assert!(eleven.matches("COURT NO. 11"));
        assert!(!eleven.matches("COURT NO. 01"));
        assert!(!eleven.matches("COURT NO. 1"));
    }

    #[test]
    fn test_numeric_selector_needs_a_numeric_candidate() {
        let one = CourtSelector::parse("Court 1");
        assert!(!one.matches("VIDEO CONFERENCING"));
    }

    #[test]
    fn test_special_selector_uses_containment() {
        let vc = CourtSelector::parse("video conferencing");
        assert!(vc.matches("VIDEO CONFERENCING"));
        assert!(!vc.matches("COURT NO. 01"));
    }

    #[test]
    fn test_non_numeric_selector_falls_back_to_substring() {
        let sel = CourtSelector::parse("chamber");
        assert!(sel.matches("REGISTRAR CHAMBER"));
        assert!(!sel.matches("COURT NO. 04"));
    }

    #[test]
    fn test_ordering_puts_special_courts_last() {
        let mut ids = vec![
            CourtIdentity::Special("VIDEO CONFERENCING"),
            CourtIdentity::Numbered(5),
            CourtIdentity::Numbered(1),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                CourtIdentity::Numbered(1),
                CourtIdentity::Numbered(5),
                CourtIdentity::Special("VIDEO CONFERENCING"),
            ]
        );
    }
}
