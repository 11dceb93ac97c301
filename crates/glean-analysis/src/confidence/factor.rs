//! Confidence factors: signed, bounded adjustments to a match score.

use serde::Serialize;
use smallvec::SmallVec;

use glean_core::errors::PatternError;

use super::detectors::ContextDetector;
use crate::patterns::{PatternCategory, PatternMatch};

/// A reusable rule that nudges a match's confidence when its context
/// detector fires. Immutable once built and shared read-only by the scorer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceFactor {
    name: String,
    description: String,
    weight: f64,
    detector: ContextDetector,
    is_positive: bool,
    max_adjustment: f64,
    applies_to_categories: Option<SmallVec<[PatternCategory; 4]>>,
    applies_to_domains: Option<Vec<String>>,
}

impl ConfidenceFactor {
    /// Build a positive factor, resolving `detector` by its registered name.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        detector: &str,
        weight: f64,
        max_adjustment: f64,
    ) -> Result<Self, PatternError> {
        Self::with_detector(
            name,
            description,
            ContextDetector::from_name(detector)?,
            weight,
            max_adjustment,
        )
    }

    /// Build a positive factor from an already-resolved detector.
    pub fn with_detector(
        name: impl Into<String>,
        description: impl Into<String>,
        detector: ContextDetector,
        weight: f64,
        max_adjustment: f64,
    ) -> Result<Self, PatternError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PatternError::invalid("name", "must not be empty"));
        }
        Ok(Self {
            name,
            description: description.into(),
            weight: PatternError::check_unit_interval("weight", weight)?,
            detector,
            is_positive: true,
            max_adjustment: PatternError::check_unit_interval("max_adjustment", max_adjustment)?,
            applies_to_categories: None,
            applies_to_domains: None,
        })
    }

    /// Make the factor lower confidence instead of raising it.
    pub fn negative(mut self) -> Self {
        self.is_positive = false;
        self
    }

    /// Restrict the factor to matches in these categories.
    pub fn for_categories(mut self, categories: impl IntoIterator<Item = PatternCategory>) -> Self {
        self.applies_to_categories = Some(categories.into_iter().collect());
        self
    }

    /// Restrict the factor to matches in these domains.
    pub fn for_domains<S: Into<String>>(mut self, domains: impl IntoIterator<Item = S>) -> Self {
        self.applies_to_domains = Some(domains.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the weight, keeping every other setting.
    pub fn reweighted(mut self, weight: f64) -> Result<Self, PatternError> {
        self.weight = PatternError::check_unit_interval("weight", weight)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn detector(&self) -> ContextDetector {
        self.detector
    }

    pub fn is_positive(&self) -> bool {
        self.is_positive
    }

    pub fn max_adjustment(&self) -> f64 {
        self.max_adjustment
    }

    /// `weight * max_adjustment`, negated for negative factors.
    pub fn signed_adjustment(&self) -> f64 {
        let magnitude = self.weight * self.max_adjustment;
        if self.is_positive {
            magnitude
        } else {
            -magnitude
        }
    }

    /// Whether the category/domain restrictions admit this match.
    pub fn applies_to(&self, m: &PatternMatch) -> bool {
        let category_ok = self
            .applies_to_categories
            .as_ref()
            .map_or(true, |cats| cats.contains(&m.category));
        let domain_ok = self
            .applies_to_domains
            .as_ref()
            .map_or(true, |domains| domains.iter().any(|d| *d == m.domain));
        category_ok && domain_ok
    }
}

/// Names of the built-in factors, in application order.
pub const NEGATION: &str = "negation";
pub const MONETARY_CONTEXT: &str = "monetary_context";
pub const PERCENTAGE_CONTEXT: &str = "percentage_context";
pub const TEMPORAL_CONTEXT: &str = "temporal_context";
pub const KEYWORD_DENSITY: &str = "keyword_density";
pub const HEDGING: &str = "hedging";
pub const CONFIRMATION: &str = "confirmation";
pub const HYPOTHETICAL: &str = "hypothetical";

/// The eight built-in factors.
///
/// Quantity detectors skip quantitative matches and the temporal detector
/// skips temporal matches, so a pattern never boosts itself.
pub fn default_factors() -> Result<Vec<ConfidenceFactor>, PatternError> {
    use PatternCategory::*;

    Ok(vec![
        ConfidenceFactor::with_detector(
            NEGATION,
            "Negation cue near the match",
            ContextDetector::Negation,
            0.9,
            0.30,
        )?
        .negative(),
        ConfidenceFactor::with_detector(
            MONETARY_CONTEXT,
            "Currency amount near the match",
            ContextDetector::Monetary,
            0.8,
            0.15,
        )?
        .for_categories([Entity, Relationship, Context]),
        ConfidenceFactor::with_detector(
            PERCENTAGE_CONTEXT,
            "Percentage near the match",
            ContextDetector::Percentage,
            0.6,
            0.10,
        )?
        .for_categories([Entity, Relationship, Context]),
        ConfidenceFactor::with_detector(
            TEMPORAL_CONTEXT,
            "Date or time expression near the match",
            ContextDetector::Temporal,
            0.5,
            0.10,
        )?
        .for_categories([Entity, Relationship, Context, Quantitative]),
        ConfidenceFactor::with_detector(
            KEYWORD_DENSITY,
            "Several domain keywords co-occur near the match",
            ContextDetector::KeywordDensity,
            0.5,
            0.10,
        )?,
        ConfidenceFactor::with_detector(
            HEDGING,
            "Speculative language near the match",
            ContextDetector::Hedging,
            0.7,
            0.20,
        )?
        .negative(),
        ConfidenceFactor::with_detector(
            CONFIRMATION,
            "Confirmation language near the match",
            ContextDetector::Confirmation,
            0.8,
            0.15,
        )?,
        ConfidenceFactor::with_detector(
            HYPOTHETICAL,
            "Illustrative or placeholder framing near the match",
            ContextDetector::Hypothetical,
            0.6,
            0.25,
        )?
        .negative(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::PatternDefinition;

    fn entity_match(domain: &str) -> PatternMatch {
        let def = PatternDefinition::new("cve", "CVE", domain, PatternCategory::Entity, r"CVE-\d+", "vulnerability")
            .unwrap();
        PatternMatch::from_definition(&def, "CVE-1", 0, 5).unwrap()
    }

    #[test]
    fn test_weight_and_max_adjustment_validated() {
        assert!(ConfidenceFactor::new("f", "", "detect_negation", 1.1, 0.2).is_err());
        assert!(ConfidenceFactor::new("f", "", "detect_negation", 0.5, -0.2).is_err());
        assert!(ConfidenceFactor::new("f", "", "detect_negation", 1.0, 1.0).is_ok());
        let f = ConfidenceFactor::new("f", "", "detect_negation", 0.5, 0.2).unwrap();
        assert!(f.reweighted(2.0).is_err());
    }

    #[test]
    fn test_unknown_detector_rejected_at_construction() {
        let err = ConfidenceFactor::new("f", "", "detect_sarcasm", 0.5, 0.2).unwrap_err();
        assert_eq!(err, PatternError::UnknownDetector("detect_sarcasm".into()));
    }

    #[test]
    fn test_signed_adjustment() {
        let f = ConfidenceFactor::new("f", "", "detect_monetary", 0.5, 0.2).unwrap();
        assert!((f.signed_adjustment() - 0.1).abs() < 1e-12);
        assert!((f.negative().signed_adjustment() + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_category_and_domain_restrictions() {
        let m = entity_match("security");
        let f = ConfidenceFactor::new("f", "", "detect_monetary", 0.5, 0.2).unwrap();
        assert!(f.applies_to(&m));
        assert!(!f.clone().for_categories([PatternCategory::Temporal]).applies_to(&m));
        assert!(f.clone().for_domains(["security"]).applies_to(&m));
        assert!(!f.for_domains(["aws"]).applies_to(&m));
    }

    #[test]
    fn test_default_factor_set() {
        let factors = default_factors().unwrap();
        assert_eq!(factors.len(), 8);
        let detectors: Vec<_> = factors.iter().map(|f| f.detector()).collect();
        for d in ContextDetector::all() {
            assert!(detectors.contains(d), "{d} missing from defaults");
        }
        let negation = factors.iter().find(|f| f.name() == NEGATION).unwrap();
        assert!(!negation.is_positive());
    }
}
