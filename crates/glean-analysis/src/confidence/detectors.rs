//! Built-in context detectors.
//!
//! Each detector is a pure `(match, full_text, context) -> bool` function with
//! no shared mutable state. Factors refer to them through the closed
//! [`ContextDetector`] enum, resolved once when the factor is built.

use std::fmt;
use std::sync::LazyLock;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use regex::Regex;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use glean_core::errors::PatternError;

use crate::detection::context::surrounding_context;
use crate::patterns::library;
use crate::patterns::PatternMatch;

/// Signature shared by every built-in detector.
pub type DetectorFn = fn(Option<&PatternMatch>, &str, &str) -> bool;

/// Distinct domain keywords needed before keyword density fires.
pub const KEYWORD_DENSITY_THRESHOLD: usize = 2;

/// Characters on each side of a match searched for negation cues.
pub const NEGATION_WINDOW: usize = 30;

macro_rules! context_regex {
    ($name:ident, $regex_str:expr) => {
        static $name: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new($regex_str).ok());
    };
}

context_regex!(
    RE_NEGATION,
    r"(?i)\b(?:not|no|never|none|neither|nor|without|isn't|aren't|wasn't|weren't|doesn't|don't|didn't|cannot|can't|won't|false\s+positive)\b"
);
context_regex!(
    RE_MONETARY,
    r"(?i)\$\s?\d[\d,]*(?:\.\d+)?|\b\d[\d,]*(?:\.\d+)?\s?(?:usd|eur|gbp|dollars?)\b|[€£]\s?\d[\d,]*"
);
context_regex!(
    RE_PERCENTAGE,
    r"(?i)\d+(?:\.\d+)?\s?%|\b\d+(?:\.\d+)?\s?percent\b"
);
context_regex!(
    RE_TEMPORAL,
    r"(?i)\b(?:\d{4}-\d{2}-\d{2}|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2}(?:,?\s+\d{4})?|\d+\s+(?:minutes?|hours?|days?|weeks?|months?|years?)\s+ago|yesterday|today|tonight|last\s+(?:week|month|quarter|year)|since\s+\d{4}|in\s+\d{4}|q[1-4]\s+\d{4})\b"
);
context_regex!(
    RE_HEDGING,
    r"(?i)\b(?:may|might|could|possibly|potentially|allegedly|reportedly|suspected|unconfirmed|unverified|perhaps)\b"
);
context_regex!(
    RE_CONFIRMATION,
    r"(?i)\b(?:confirmed|verified|observed|validated|reproduced|actively\s+exploited|in\s+the\s+wild|proof[\s-]of[\s-]concept)\b"
);
context_regex!(
    RE_HYPOTHETICAL,
    r"(?i)\b(?:for\s+example|for\s+instance|e\.g\.|hypothetical(?:ly)?|sample|dummy|placeholder|example)\b"
);

/// One automaton over every domain's keywords. Entry `i` of the table is
/// the `(domain, keyword)` pair for automaton pattern `i`.
static KEYWORD_AUTOMATON: LazyLock<Option<(AhoCorasick, Vec<(&'static str, &'static str)>)>> =
    LazyLock::new(|| {
        let mut table = Vec::new();
        for domain in library::keyword_domains() {
            for keyword in library::domain_keywords(domain) {
                table.push((*domain, *keyword));
            }
        }
        AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(table.iter().map(|(_, k)| *k))
            .ok()
            .map(|ac| (ac, table))
    });

/// The closed set of built-in context detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextDetector {
    Negation,
    Monetary,
    Percentage,
    Temporal,
    KeywordDensity,
    Hedging,
    Confirmation,
    Hypothetical,
}

impl ContextDetector {
    pub fn all() -> &'static [ContextDetector] {
        &[
            Self::Negation,
            Self::Monetary,
            Self::Percentage,
            Self::Temporal,
            Self::KeywordDensity,
            Self::Hedging,
            Self::Confirmation,
            Self::Hypothetical,
        ]
    }

    /// Registered identifier, e.g. `detect_negation`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Negation => "detect_negation",
            Self::Monetary => "detect_monetary",
            Self::Percentage => "detect_percentage",
            Self::Temporal => "detect_temporal",
            Self::KeywordDensity => "detect_keyword_density",
            Self::Hedging => "detect_hedging",
            Self::Confirmation => "detect_confirmation",
            Self::Hypothetical => "detect_hypothetical",
        }
    }

    /// Resolve a detector identifier. Unknown names are a configuration error.
    pub fn from_name(name: &str) -> Result<Self, PatternError> {
        Self::all()
            .iter()
            .copied()
            .find(|d| d.name() == name)
            .ok_or_else(|| PatternError::UnknownDetector(name.to_string()))
    }

    pub fn function(&self) -> DetectorFn {
        match self {
            Self::Negation => detect_negation,
            Self::Monetary => detect_monetary,
            Self::Percentage => detect_percentage,
            Self::Temporal => detect_temporal,
            Self::KeywordDensity => detect_keyword_density,
            Self::Hedging => detect_hedging,
            Self::Confirmation => detect_confirmation,
            Self::Hypothetical => detect_hypothetical,
        }
    }

    pub fn detect(&self, pattern_match: Option<&PatternMatch>, text: &str, context: &str) -> bool {
        (self.function())(pattern_match, text, context)
    }
}

impl fmt::Display for ContextDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn regex_hit(regex: &LazyLock<Option<Regex>>, context: &str) -> bool {
    regex.as_ref().is_some_and(|re| re.is_match(context))
}

/// Negation cues ("not", "no", "isn't", ...) within [`NEGATION_WINDOW`]
/// characters of the match. Without a match, or when the match cannot be
/// located in the context, the whole context is searched.
pub fn detect_negation(m: Option<&PatternMatch>, text: &str, context: &str) -> bool {
    let scope = m.and_then(|m| negation_scope(m, text, context)).unwrap_or(context);
    regex_hit(&RE_NEGATION, scope)
}

fn negation_scope<'a>(m: &PatternMatch, text: &str, context: &'a str) -> Option<&'a str> {
    let (start, end) = if std::ptr::eq(context, text)
        && context.get(m.start_position..m.end_position) == Some(m.matched_text.as_str())
    {
        (m.start_position, m.end_position)
    } else {
        let start = context.find(m.matched_text.as_str())?;
        (start, start + m.matched_text.len())
    };
    Some(surrounding_context(context, start, end, NEGATION_WINDOW))
}

/// A currency amount such as `$50,000` near the match.
pub fn detect_monetary(_m: Option<&PatternMatch>, _text: &str, context: &str) -> bool {
    regex_hit(&RE_MONETARY, context)
}

pub fn detect_percentage(_m: Option<&PatternMatch>, _text: &str, context: &str) -> bool {
    regex_hit(&RE_PERCENTAGE, context)
}

/// Absolute dates or relative time expressions near the match.
pub fn detect_temporal(_m: Option<&PatternMatch>, _text: &str, context: &str) -> bool {
    regex_hit(&RE_TEMPORAL, context)
}

/// Speculative language ("may", "allegedly", "unconfirmed").
pub fn detect_hedging(_m: Option<&PatternMatch>, _text: &str, context: &str) -> bool {
    regex_hit(&RE_HEDGING, context)
}

pub fn detect_confirmation(_m: Option<&PatternMatch>, _text: &str, context: &str) -> bool {
    regex_hit(&RE_CONFIRMATION, context)
}

/// Illustrative or placeholder framing ("for example", "sample").
pub fn detect_hypothetical(_m: Option<&PatternMatch>, _text: &str, context: &str) -> bool {
    regex_hit(&RE_HYPOTHETICAL, context)
}

/// At least [`KEYWORD_DENSITY_THRESHOLD`] distinct domain keywords co-occur
/// in the context. With a match, only its own domain's vocabulary counts.
pub fn detect_keyword_density(m: Option<&PatternMatch>, _text: &str, context: &str) -> bool {
    let Some((automaton, table)) = KEYWORD_AUTOMATON.as_ref() else {
        return false;
    };
    let domain = m.map(|m| m.domain.as_str());
    let mut seen = FxHashSet::default();

    for hit in automaton.find_iter(context) {
        let (kw_domain, keyword) = table[hit.pattern().as_usize()];
        if domain.is_some_and(|d| d != kw_domain) {
            continue;
        }
        let before_ok = context[..hit.start()]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = context[hit.end()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if before_ok && after_ok {
            seen.insert(keyword);
            if seen.len() >= KEYWORD_DENSITY_THRESHOLD {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fires(detector: ContextDetector, context: &str) -> bool {
        detector.detect(None, context, context)
    }

    #[test]
    fn test_all_regexes_compile() {
        for re in [
            &RE_NEGATION,
            &RE_MONETARY,
            &RE_PERCENTAGE,
            &RE_TEMPORAL,
            &RE_HEDGING,
            &RE_CONFIRMATION,
            &RE_HYPOTHETICAL,
        ] {
            assert!(re.is_some());
        }
        assert!(KEYWORD_AUTOMATON.is_some());
    }

    #[test]
    fn test_name_round_trip() {
        for d in ContextDetector::all() {
            assert_eq!(ContextDetector::from_name(d.name()).unwrap(), *d);
        }
        assert_eq!(
            ContextDetector::from_name("detect_vibes"),
            Err(PatternError::UnknownDetector("detect_vibes".into()))
        );
    }

    #[test]
    fn test_negation() {
        assert!(fires(ContextDetector::Negation, "This is not a CVE-2021-44228 vulnerability"));
        assert!(fires(ContextDetector::Negation, "the host isn't affected"));
        assert!(!fires(ContextDetector::Negation, "Costs $50,000 to fix CVE-2021-44228"));
        assert!(!fires(ContextDetector::Negation, "another notable issue"));
    }

    #[test]
    fn test_monetary() {
        assert!(fires(ContextDetector::Monetary, "Costs $50,000 to fix"));
        assert!(fires(ContextDetector::Monetary, "losses of 2,500,000 USD"));
        assert!(!fires(ContextDetector::Monetary, "to fix CVE-2021-44228"));
    }

    #[test]
    fn test_percentage() {
        assert!(fires(ContextDetector::Percentage, "affects 40% of hosts"));
        assert!(fires(ContextDetector::Percentage, "roughly 12.5 percent"));
        assert!(!fires(ContextDetector::Percentage, "affects most hosts"));
    }

    #[test]
    fn test_temporal() {
        assert!(fires(ContextDetector::Temporal, "patched on 2021-12-10"));
        assert!(fires(ContextDetector::Temporal, "disclosed 3 days ago"));
        assert!(fires(ContextDetector::Temporal, "first seen Dec 9, 2021"));
        assert!(!fires(ContextDetector::Temporal, "the scanner flagged it"));
    }

    #[test]
    fn test_hedging_confirmation_hypothetical() {
        assert!(fires(ContextDetector::Hedging, "this may be exploitable"));
        assert!(fires(ContextDetector::Confirmation, "actively exploited in the wild"));
        assert!(fires(ContextDetector::Hypothetical, "for example, CVE-0000-0000"));
        assert!(!fires(ContextDetector::Hypothetical, "the incident report"));
    }

    #[test]
    fn test_keyword_density_requires_distinct_whole_words() {
        assert!(fires(ContextDetector::KeywordDensity, "CVE-2021-44228 vulnerability"));
        assert!(!fires(ContextDetector::KeywordDensity, "CVE-2021-44228 and CVE-2021-45046"));
        // "iam" inside "william" and "role" inside "parole" are not keywords.
        assert!(!fires(ContextDetector::KeywordDensity, "william was on parole"));
    }

    #[test]
    fn test_keyword_density_word_boundaries_are_unicode_aware() {
        assert!(!fires(ContextDetector::KeywordDensity, "évulnerabilityé cve"));
        assert!(!fires(ContextDetector::KeywordDensity, "exploitñ vulnerability"));
        assert!(fires(ContextDetector::KeywordDensity, "« exploit » vulnerability"));
    }

    fn cve_match_in(text: &str) -> PatternMatch {
        let def = crate::patterns::PatternDefinition::new(
            "sec-cve",
            "CVE identifier",
            "security",
            crate::patterns::PatternCategory::Entity,
            r"CVE-\d{4}-\d{4,7}",
            "vulnerability",
        )
        .unwrap();
        let start = text.find("CVE-").unwrap();
        let end = start + "CVE-2021-44228".len();
        PatternMatch::from_definition(&def, &text[start..end], start, end).unwrap()
    }

    #[test]
    fn test_negation_limited_to_window_around_match() {
        let far = "No issues in module A. The team later patched CVE-2021-44228 in production";
        let m = cve_match_in(far);
        assert!(!detect_negation(Some(&m), far, far));
        assert!(detect_negation(None, far, far));

        let near = "This is not a CVE-2021-44228 vulnerability";
        let m = cve_match_in(near);
        assert!(detect_negation(Some(&m), near, near));

        let after = "CVE-2021-44228 is not exploitable here";
        let m = cve_match_in(after);
        assert!(detect_negation(Some(&m), after, after));
    }

    #[test]
    fn test_negation_window_inside_detached_context() {
        let text = "No issues in module A. The team later patched CVE-2021-44228 in production";
        let m = cve_match_in(text);
        let context = text.to_string();
        assert!(!detect_negation(Some(&m), text, &context));

        let unrelated = "not relevant to this match";
        assert!(detect_negation(Some(&m), text, unrelated));
    }
}
