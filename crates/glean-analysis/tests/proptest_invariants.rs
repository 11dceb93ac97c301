//! Property tests for scoring and detection invariants.

use proptest::prelude::*;

use glean_analysis::confidence::{ConfidenceFactor, ConfidenceScorer, ContextDetector};
use glean_analysis::detection::{compile_statistics, DetectionFilter, PatternDetector};
use glean_analysis::patterns::{PatternCategory, PatternDefinition, PatternMatch};

const SNIPPETS: &[&str] = &[
    "not",
    "$50,000",
    "40%",
    "2021-12-09",
    "3 days ago",
    "vulnerability",
    "exploit",
    "may",
    "confirmed",
    "for example",
    "CVE-2021-44228",
    "IAM policy",
    "mitigates",
    "arn:aws:iam::123456789012:role/admin",
    "the",
    "host",
];

fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(SNIPPETS), 0..24).prop_map(|words| words.join(" "))
}

fn factor_strategy() -> impl Strategy<Value = ConfidenceFactor> {
    (
        prop::sample::select(ContextDetector::all()),
        0.0f64..=1.0,
        0.0f64..=1.0,
        any::<bool>(),
    )
        .prop_map(|(detector, weight, max, positive)| {
            let f = ConfidenceFactor::with_detector(detector.name(), "", detector, weight, max).unwrap();
            if positive {
                f
            } else {
                f.negative()
            }
        })
}

fn cve_match(base: f64) -> PatternMatch {
    let def = PatternDefinition::new(
        "cve",
        "CVE",
        "security",
        PatternCategory::Entity,
        r"CVE-\d{4}-\d+",
        "vulnerability",
    )
    .unwrap()
    .with_base_confidence(base)
    .unwrap();
    PatternMatch::from_definition(&def, "CVE-2021-44228", 0, 14).unwrap()
}

proptest! {
    #[test]
    fn final_confidence_always_in_unit_interval(
        text in text_strategy(),
        base in 0.0f64..=1.0,
        factors in prop::collection::vec(factor_strategy(), 0..16),
    ) {
        let scorer = ConfidenceScorer::new(factors);
        let mut m = cve_match(base);
        let score = scorer.score(&mut m, &text);
        prop_assert!((0.0..=1.0).contains(&score));
        prop_assert_eq!(score, m.final_confidence());
    }

    #[test]
    fn trail_reconstructs_running_total(
        text in text_strategy(),
        base in 0.0f64..=1.0,
        factors in prop::collection::vec(factor_strategy(), 0..16),
    ) {
        let scorer = ConfidenceScorer::new(factors);
        let m = cve_match(base);
        let (score, trail) = scorer.apply_factors(&m, &text);
        let mut running = base;
        for applied in &trail {
            prop_assert_eq!(applied.old_score, running);
            running += applied.adjustment;
            prop_assert_eq!(applied.new_score, running);
        }
        prop_assert_eq!(score, running.clamp(0.0, 1.0));
    }

    #[test]
    fn no_factors_leaves_base_confidence(text in text_strategy(), base in 0.0f64..=1.0) {
        let mut m = cve_match(base);
        let score = ConfidenceScorer::new(Vec::new()).score(&mut m, &text);
        prop_assert_eq!(score, base);
        prop_assert!(m.applied_factors().is_empty());
    }

    #[test]
    fn detection_is_deterministic_and_bounded(text in text_strategy()) {
        let detector = PatternDetector::with_defaults().unwrap();
        let first = detector.detect_patterns(&text, &DetectionFilter::all()).unwrap();
        let second = detector.detect_patterns(&text, &DetectionFilter::all()).unwrap();
        prop_assert_eq!(&first, &second);
        for m in &first {
            prop_assert!((0.0..=1.0).contains(&m.final_confidence()));
            prop_assert!(m.start_position < m.end_position);
            prop_assert_eq!(&text[m.start_position..m.end_position], m.matched_text.as_str());
        }
    }

    #[test]
    fn statistics_match_entities(text in text_strategy()) {
        let detector = PatternDetector::with_defaults().unwrap();
        let entities = detector.detect_entities(&text, None, None).unwrap();
        let stats = compile_statistics(&entities, &[]);
        prop_assert_eq!(stats.total_entities, entities.len());
        if entities.is_empty() {
            prop_assert_eq!(stats.avg_entity_confidence, 0.0);
        } else {
            let mean = entities.iter().map(|m| m.final_confidence()).sum::<f64>() / entities.len() as f64;
            prop_assert!((stats.avg_entity_confidence - mean).abs() < 1e-9);
        }
    }
}
