//! PatternDetector: runs registry patterns over text, scores every match,
//! links relationships to nearby entities, and summarizes the result.

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use glean_core::config::{DetectionConfig, GleanConfig};
use glean_core::errors::{DetectionError, PatternError};

use super::context::{char_distance, surrounding_context};
use super::stats::{compile_statistics, DetectionStats};
use crate::confidence::ConfidenceScorer;
use crate::patterns::library;
use crate::patterns::{
    CompiledPattern, NearbyEntity, PatternCategory, PatternFilter, PatternMatch, PatternRegistry,
};

/// Name of the regex group that, when present, supplies `output_value`.
pub const VALUE_GROUP: &str = "value";

/// Per-call restrictions for [`PatternDetector::detect_patterns`].
///
/// `None` on any axis falls back to the detector's configured default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionFilter {
    pub domains: Option<Vec<String>>,
    pub categories: Option<Vec<PatternCategory>>,
    pub min_confidence: Option<f64>,
}

impl DetectionFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_domains<S: Into<String>>(mut self, domains: impl IntoIterator<Item = S>) -> Self {
        self.domains = Some(domains.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = PatternCategory>) -> Self {
        self.categories = Some(categories.into_iter().collect());
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = Some(min_confidence);
        self
    }

    /// Reject malformed arguments instead of silently matching nothing.
    pub fn validate(&self) -> Result<(), DetectionError> {
        if let Some(domains) = &self.domains {
            if domains.iter().any(|d| d.trim().is_empty()) {
                return Err(DetectionError::InvalidFilter(
                    "domain names must not be blank".to_string(),
                ));
            }
        }
        if let Some(min) = self.min_confidence {
            if !(min.is_finite() && (0.0..=1.0).contains(&min)) {
                return Err(DetectionError::InvalidFilter(format!(
                    "min_confidence must be between 0.0 and 1.0, got {min}"
                )));
            }
        }
        Ok(())
    }
}

/// One input to [`PatternDetector::process_documents`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentInput {
    pub document_id: Option<String>,
    pub text: String,
    pub domains: Option<Vec<String>>,
}

impl DocumentInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    pub fn with_domains<S: Into<String>>(mut self, domains: impl IntoIterator<Item = S>) -> Self {
        self.domains = Some(domains.into_iter().map(Into::into).collect());
        self
    }
}

/// Everything extracted from one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub document_id: String,
    pub entities: Vec<PatternMatch>,
    pub relationships: Vec<PatternMatch>,
    pub stats: DetectionStats,
}

/// The detection orchestrator.
///
/// Registry and scorer are read-only after construction and held behind
/// `Arc`, so one detector (or clones of it) can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct PatternDetector {
    registry: Arc<PatternRegistry>,
    scorer: Arc<ConfidenceScorer>,
    context_window: usize,
    proximity_window: usize,
    min_confidence: f64,
    default_domains: Vec<String>,
    max_text_bytes: Option<usize>,
}

impl PatternDetector {
    pub fn new(registry: PatternRegistry, scorer: ConfidenceScorer) -> Self {
        Self::from_shared(Arc::new(registry), Arc::new(scorer))
    }

    /// Build over an already-shared registry and scorer.
    pub fn from_shared(registry: Arc<PatternRegistry>, scorer: Arc<ConfidenceScorer>) -> Self {
        let defaults = DetectionConfig::default();
        Self {
            registry,
            scorer,
            context_window: defaults.effective_context_window(),
            proximity_window: defaults.effective_proximity_window(),
            min_confidence: defaults.effective_min_confidence(),
            default_domains: defaults.default_domains,
            max_text_bytes: defaults.max_text_bytes,
        }
    }

    /// Built-in pattern library with the default factor set.
    pub fn with_defaults() -> Result<Self, PatternError> {
        Ok(Self::new(
            library::default_registry()?,
            ConfidenceScorer::with_defaults()?,
        ))
    }

    /// Built-in pattern library, scored and tuned per `config`.
    pub fn from_config(config: &GleanConfig) -> Result<Self, PatternError> {
        Ok(Self::new(
            library::default_registry()?,
            ConfidenceScorer::from_config(&config.scoring)?,
        )
        .with_config(&config.detection))
    }

    /// Apply windows, thresholds, and limits from `config`.
    pub fn with_config(mut self, config: &DetectionConfig) -> Self {
        self.context_window = config.effective_context_window();
        self.proximity_window = config.effective_proximity_window();
        self.min_confidence = config.effective_min_confidence();
        self.default_domains = config.default_domains.clone();
        self.max_text_bytes = config.max_text_bytes;
        self
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    pub fn scorer(&self) -> &ConfidenceScorer {
        &self.scorer
    }

    pub fn context_window(&self) -> usize {
        self.context_window
    }

    pub fn proximity_window(&self) -> usize {
        self.proximity_window
    }

    /// Run every applicable pattern over `text` and return scored matches.
    ///
    /// Matches scoring strictly below the effective minimum are dropped.
    /// Output is ordered by start position, then priority, then pattern
    /// registration order, so repeated calls return identical results.
    pub fn detect_patterns(
        &self,
        text: &str,
        filter: &DetectionFilter,
    ) -> Result<Vec<PatternMatch>, DetectionError> {
        filter.validate()?;
        self.check_text_size(text)?;
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let domains = filter.domains.as_deref().or_else(|| {
            (!self.default_domains.is_empty()).then_some(self.default_domains.as_slice())
        });
        let min_confidence = filter.min_confidence.unwrap_or(self.min_confidence);
        let pattern_filter = PatternFilter {
            domains,
            categories: filter.categories.as_deref(),
        };

        let mut patterns_evaluated = 0usize;
        let mut matches_found = 0usize;
        let mut factors_triggered = 0usize;
        let mut kept: Vec<(usize, PatternMatch)> = Vec::new();

        for compiled in self.registry.applicable(pattern_filter) {
            patterns_evaluated += 1;
            for m in self.scan(compiled, text)? {
                matches_found += 1;
                factors_triggered += m.applied_factors().len();
                if m.final_confidence() >= min_confidence {
                    kept.push((compiled.ordinal(), m));
                }
            }
        }

        kept.sort_by_key(|(ordinal, m)| (m.start_position, m.priority.rank(), *ordinal));
        let matches: Vec<PatternMatch> = kept.into_iter().map(|(_, m)| m).collect();

        tracing::debug!(
            patterns_evaluated,
            matches_found,
            matches_filtered = matches_found - matches.len(),
            factors_triggered,
            detection_time_ms = started.elapsed().as_millis() as u64,
            "pattern detection complete"
        );
        Ok(matches)
    }

    /// Entity-category matches only.
    pub fn detect_entities(
        &self,
        text: &str,
        domains: Option<&[String]>,
        min_confidence: Option<f64>,
    ) -> Result<Vec<PatternMatch>, DetectionError> {
        let filter = DetectionFilter {
            domains: domains.map(<[String]>::to_vec),
            categories: Some(vec![PatternCategory::Entity]),
            min_confidence,
        };
        self.detect_patterns(text, &filter)
    }

    /// Relationship-category matches, each annotated with the `entities`
    /// whose spans lie within the proximity window of its own span.
    ///
    /// `entities` should come from an earlier entity pass over the same
    /// text; entries whose spans do not fit `text` are ignored.
    pub fn detect_relationships(
        &self,
        text: &str,
        entities: &[PatternMatch],
        domains: Option<&[String]>,
    ) -> Result<Vec<PatternMatch>, DetectionError> {
        let filter = DetectionFilter {
            domains: domains.map(<[String]>::to_vec),
            categories: Some(vec![PatternCategory::Relationship]),
            min_confidence: None,
        };
        let mut relationships = self.detect_patterns(text, &filter)?;

        for rel in &mut relationships {
            let span = (rel.start_position, rel.end_position);
            for (entity_index, entity) in entities.iter().enumerate() {
                let Some(distance) =
                    char_distance(text, span, (entity.start_position, entity.end_position))
                else {
                    continue;
                };
                if distance <= self.proximity_window {
                    rel.metadata.nearby_entities.push(NearbyEntity {
                        entity_index,
                        pattern_id: entity.pattern_id.clone(),
                        output_type: entity.output_type.clone(),
                        output_value: entity.output_value.clone(),
                        start_position: entity.start_position,
                        end_position: entity.end_position,
                        distance,
                    });
                }
            }
        }
        Ok(relationships)
    }

    /// Entities, then relationships seeded with them, then statistics.
    ///
    /// A v4 UUID is generated when `document_id` is `None`.
    pub fn process_document(
        &self,
        text: &str,
        document_id: Option<&str>,
        domains: Option<&[String]>,
    ) -> Result<DocumentAnalysis, DetectionError> {
        let document_id = document_id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let entities = self.detect_entities(text, domains, None)?;
        let relationships = self.detect_relationships(text, &entities, domains)?;
        let stats = compile_statistics(&entities, &relationships);

        tracing::info!(
            document_id = %document_id,
            text_bytes = text.len(),
            entities = stats.total_entities,
            relationships = stats.total_relationships,
            avg_entity_confidence = stats.avg_entity_confidence,
            "document processed"
        );

        Ok(DocumentAnalysis {
            document_id,
            entities,
            relationships,
            stats,
        })
    }

    /// Process independent documents in parallel. Results keep input order;
    /// one document failing does not affect the others.
    pub fn process_documents(
        &self,
        documents: &[DocumentInput],
    ) -> Vec<Result<DocumentAnalysis, DetectionError>> {
        documents
            .par_iter()
            .map(|doc| {
                self.process_document(&doc.text, doc.document_id.as_deref(), doc.domains.as_deref())
            })
            .collect()
    }

    fn check_text_size(&self, text: &str) -> Result<(), DetectionError> {
        match self.max_text_bytes {
            Some(limit) if text.len() > limit => Err(DetectionError::InvalidFilter(format!(
                "text is {} bytes, limit is {limit}",
                text.len()
            ))),
            _ => Ok(()),
        }
    }

    /// Every scored, non-empty match of one pattern, in text order.
    fn scan(&self, compiled: &CompiledPattern, text: &str) -> Result<Vec<PatternMatch>, PatternError> {
        let definition = compiled.definition();
        let mut matches = Vec::new();

        for caps in compiled.regex().captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.is_empty() {
                continue;
            }

            let mut m =
                PatternMatch::from_definition(definition, whole.as_str(), whole.start(), whole.end())?;
            if let Some(value) = caps.name(VALUE_GROUP) {
                m.output_value = definition.normalization().apply(value.as_str());
            }
            for (group, role) in definition.capture_groups() {
                if let Some(capture) = caps.name(group) {
                    m.captured_groups
                        .insert(role.clone(), capture.as_str().trim().to_string());
                }
            }
            m.surrounding_context = Some(
                surrounding_context(text, whole.start(), whole.end(), self.context_window)
                    .to_string(),
            );

            self.scorer.score(&mut m, text);
            matches.push(m);
        }
        Ok(matches)
    }
}
