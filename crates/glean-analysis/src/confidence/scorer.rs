//! ConfidenceScorer: runs an ordered factor list over a match and records
//! every adjustment it makes.
//!
//! Adjustments are additive on an unclamped running total; the result is
//! clamped into `[0, 1]` exactly once, after the last factor.

use glean_core::config::ScoringConfig;
use glean_core::errors::PatternError;

use super::factor::{default_factors, ConfidenceFactor};
use crate::patterns::{AppliedFactor, PatternMatch};

/// Applies confidence factors to pattern matches.
///
/// Holds no per-call state, so a single scorer can be shared across
/// threads for concurrent detection calls.
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    factors: Vec<ConfidenceFactor>,
}

impl ConfidenceScorer {
    /// A scorer applying `factors` in the given order.
    pub fn new(factors: Vec<ConfidenceFactor>) -> Self {
        Self { factors }
    }

    /// A scorer with the eight built-in factors.
    pub fn with_defaults() -> Result<Self, PatternError> {
        Ok(Self::new(default_factors()?))
    }

    /// Built-in factors, minus disabled ones, with weight overrides applied.
    ///
    /// Naming a factor that does not exist, in either list, is an error
    /// rather than a silent no-op.
    pub fn from_config(config: &ScoringConfig) -> Result<Self, PatternError> {
        let defaults = default_factors()?;
        let known = |name: &str| defaults.iter().any(|f| f.name() == name);

        for name in config
            .disabled_factors
            .iter()
            .chain(config.factor_weights.keys())
        {
            if !known(name) {
                return Err(PatternError::invalid(
                    "scoring",
                    format!("unknown confidence factor '{name}'"),
                ));
            }
        }

        let mut factors = Vec::with_capacity(defaults.len());
        for factor in defaults {
            if config.is_disabled(factor.name()) {
                tracing::debug!(factor = factor.name(), "confidence factor disabled");
                continue;
            }
            let factor = match config.weight_override(factor.name()) {
                Some(weight) => factor.reweighted(weight)?,
                None => factor,
            };
            factors.push(factor);
        }
        Ok(Self::new(factors))
    }

    pub fn factors(&self) -> &[ConfidenceFactor] {
        &self.factors
    }

    /// Compute the score for `m` without mutating it.
    ///
    /// Returns the clamped final score and the trail of factors that fired,
    /// in application order. Detectors see the match's
    /// `surrounding_context` when it is set, otherwise `full_text`.
    pub fn apply_factors(&self, m: &PatternMatch, full_text: &str) -> (f64, Vec<AppliedFactor>) {
        let context = m.surrounding_context.as_deref().unwrap_or(full_text);
        let mut running = m.base_confidence();
        let mut trail = Vec::new();

        for factor in &self.factors {
            if !factor.applies_to(m) {
                continue;
            }
            if !factor.detector().detect(Some(m), full_text, context) {
                continue;
            }
            let adjustment = factor.signed_adjustment();
            let old_score = running;
            running += adjustment;
            trail.push(AppliedFactor {
                name: factor.name().to_string(),
                adjustment,
                old_score,
                new_score: running,
            });
        }

        (running.clamp(0.0, 1.0), trail)
    }

    /// Score `m` in place and return its new final confidence.
    pub fn score(&self, m: &mut PatternMatch, full_text: &str) -> f64 {
        let (score, trail) = self.apply_factors(m, full_text);
        m.finalize_score(score, trail);
        m.final_confidence()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confidence::detectors::ContextDetector;
    use crate::confidence::factor::{KEYWORD_DENSITY, MONETARY_CONTEXT, NEGATION};
    use crate::patterns::{PatternCategory, PatternDefinition};

    fn cve_match(text: &str, base: f64) -> PatternMatch {
        let def = PatternDefinition::new(
            "sec-cve",
            "CVE identifier",
            "security",
            PatternCategory::Entity,
            r"CVE-\d{4}-\d{4,7}",
            "vulnerability",
        )
        .unwrap()
        .with_base_confidence(base)
        .unwrap();
        let start = text.find("CVE-").unwrap();
        let end = start + "CVE-2021-44228".len();
        PatternMatch::from_definition(&def, &text[start..end], start, end).unwrap()
    }

    fn factor(name: &str, detector: ContextDetector, weight: f64, max: f64) -> ConfidenceFactor {
        ConfidenceFactor::with_detector(name, "", detector, weight, max).unwrap()
    }

    #[test]
    fn test_monetary_context_raises_score() {
        let text = "Costs $50,000 to fix CVE-2021-44228";
        let mut m = cve_match(text, 0.75);
        let score = ConfidenceScorer::with_defaults().unwrap().score(&mut m, text);
        assert!(score > 0.75, "score {score}");
        assert_eq!(m.applied_factors()[0].name, MONETARY_CONTEXT);
    }

    #[test]
    fn test_negation_lowers_score() {
        let text = "This is not a CVE-2021-44228 vulnerability";
        let mut m = cve_match(text, 0.75);
        let score = ConfidenceScorer::with_defaults().unwrap().score(&mut m, text);
        assert!(score < 0.75, "score {score}");
        let names: Vec<_> = m.applied_factors().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec![NEGATION, KEYWORD_DENSITY]);
    }

    #[test]
    fn test_no_factors_is_identity() {
        let text = "This is not a CVE-2021-44228 vulnerability";
        let mut m = cve_match(text, 0.42);
        let score = ConfidenceScorer::new(Vec::new()).score(&mut m, text);
        assert_eq!(score, 0.42);
        assert!(m.applied_factors().is_empty());
    }

    #[test]
    fn test_clamped_at_upper_bound_with_unclamped_trail() {
        let text = "confirmed CVE-2021-44228, $10 cost";
        let mut m = cve_match(text, 0.9);
        let scorer = ConfidenceScorer::new(vec![
            factor("a", ContextDetector::Confirmation, 1.0, 1.0),
            factor("b", ContextDetector::Monetary, 1.0, 1.0),
        ]);
        assert_eq!(scorer.score(&mut m, text), 1.0);
        let trail = m.applied_factors();
        assert_eq!(trail.len(), 2);
        assert!((trail[1].new_score - 2.9).abs() < 1e-9);
        assert_eq!(trail[1].old_score, trail[0].new_score);
    }

    #[test]
    fn test_clamped_at_lower_bound() {
        let text = "not confirmed: maybe CVE-2021-44228";
        let mut m = cve_match(text, 0.1);
        let scorer = ConfidenceScorer::new(vec![factor("neg", ContextDetector::Negation, 1.0, 1.0).negative()]);
        assert_eq!(scorer.score(&mut m, text), 0.0);
    }

    #[test]
    fn test_surrounding_context_preferred_over_full_text() {
        let text = "Costs $50,000 to fix. Much later in the report: CVE-2021-44228";
        let mut m = cve_match(text, 0.75);
        m.surrounding_context = Some("report: CVE-2021-44228".to_string());
        let score = ConfidenceScorer::with_defaults().unwrap().score(&mut m, text);
        assert_eq!(score, 0.75);
    }

    #[test]
    fn test_rescoring_replaces_trail() {
        let text = "Costs $50,000 to fix CVE-2021-44228";
        let mut m = cve_match(text, 0.75);
        let scorer = ConfidenceScorer::with_defaults().unwrap();
        let first = scorer.score(&mut m, text);
        let second = scorer.score(&mut m, text);
        assert_eq!(first, second);
        assert_eq!(m.applied_factors().len(), 1);
    }

    #[test]
    fn test_with_defaults_carries_every_builtin_factor() {
        let scorer = ConfidenceScorer::with_defaults().unwrap();
        let names: Vec<_> = scorer.factors().iter().map(|f| f.name()).collect();
        let expected: Vec<_> = default_factors().unwrap().iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names.len(), 8);
        assert_eq!(names, expected);
    }

    #[test]
    fn test_from_config_disables_and_reweights() {
        let mut config = ScoringConfig::default();
        config.disabled_factors.push(NEGATION.to_string());
        config.factor_weights.insert(MONETARY_CONTEXT.to_string(), 0.2);
        let scorer = ConfidenceScorer::from_config(&config).unwrap();
        assert_eq!(scorer.factors().len(), 7);
        assert!(scorer.factors().iter().all(|f| f.name() != NEGATION));
        let monetary = scorer.factors().iter().find(|f| f.name() == MONETARY_CONTEXT).unwrap();
        assert_eq!(monetary.weight(), 0.2);
    }

    #[test]
    fn test_from_config_rejects_unknown_names_and_bad_weights() {
        let mut config = ScoringConfig::default();
        config.disabled_factors.push("sarcasm".to_string());
        assert!(matches!(
            ConfidenceScorer::from_config(&config),
            Err(PatternError::InvalidArgument { .. })
        ));

        let mut config = ScoringConfig::default();
        config.factor_weights.insert(NEGATION.to_string(), 3.0);
        assert!(ConfidenceScorer::from_config(&config).is_err());
    }
}
