//! Core pattern model: definitions, matches, and the scoring audit trail.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use glean_core::errors::PatternError;

/// Default base confidence for a pattern that does not set one.
pub const DEFAULT_BASE_CONFIDENCE: f64 = 0.75;

/// Default version string for a pattern definition.
pub const DEFAULT_PATTERN_VERSION: &str = "1.0.0";

/// What kind of thing a pattern extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    Entity,
    Relationship,
    Context,
    Temporal,
    Quantitative,
}

impl PatternCategory {
    pub fn all() -> &'static [PatternCategory] {
        &[
            Self::Entity,
            Self::Relationship,
            Self::Context,
            Self::Temporal,
            Self::Quantitative,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Relationship => "relationship",
            Self::Context => "context",
            Self::Temporal => "temporal",
            Self::Quantitative => "quantitative",
        }
    }

    /// Parse a category name, case-insensitively.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "entity" => Some(Self::Entity),
            "relationship" => Some(Self::Relationship),
            "context" => Some(Self::Context),
            "temporal" => Some(Self::Temporal),
            "quantitative" => Some(Self::Quantitative),
            _ => None,
        }
    }
}

impl fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pattern priority. Breaks ordering ties between matches at the same offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternPriority {
    Critical,
    High,
    #[default]
    Normal,
    Low,
}

impl PatternPriority {
    /// Sort rank; lower ranks first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Normal => 2,
            Self::Low => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

/// Regex flags applied when a pattern is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternFlags {
    pub case_insensitive: bool,
    pub multi_line: bool,
    pub dot_matches_new_line: bool,
}

impl Default for PatternFlags {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            multi_line: false,
            dot_matches_new_line: false,
        }
    }
}

/// How the extracted value of a match is normalized into `output_value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    Verbatim,
    #[default]
    Trim,
    Upper,
    Lower,
}

impl Normalization {
    pub fn apply(&self, raw: &str) -> String {
        match self {
            Self::Verbatim => raw.to_string(),
            Self::Trim => raw.trim().to_string(),
            Self::Upper => raw.trim().to_uppercase(),
            Self::Lower => raw.trim().to_lowercase(),
        }
    }
}

/// A named, versioned detection rule.
///
/// Immutable once built. Fields are read through accessors so the
/// validated invariants (non-empty id, `base_confidence` in `[0, 1]`)
/// cannot be broken after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternDefinition {
    id: String,
    name: String,
    description: Option<String>,
    domain: String,
    category: PatternCategory,
    priority: PatternPriority,
    regex_pattern: String,
    flags: PatternFlags,
    output_type: String,
    capture_groups: BTreeMap<String, String>,
    normalization: Normalization,
    base_confidence: f64,
    version: String,
}

impl PatternDefinition {
    /// Create a definition with default priority, flags, confidence, and version.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        domain: impl Into<String>,
        category: PatternCategory,
        regex_pattern: impl Into<String>,
        output_type: impl Into<String>,
    ) -> Result<Self, PatternError> {
        let def = Self {
            id: id.into(),
            name: name.into(),
            description: None,
            domain: domain.into(),
            category,
            priority: PatternPriority::default(),
            regex_pattern: regex_pattern.into(),
            flags: PatternFlags::default(),
            output_type: output_type.into(),
            capture_groups: BTreeMap::new(),
            normalization: Normalization::default(),
            base_confidence: DEFAULT_BASE_CONFIDENCE,
            version: DEFAULT_PATTERN_VERSION.to_string(),
        };
        def.validate()?;
        Ok(def)
    }

    pub fn with_base_confidence(mut self, base_confidence: f64) -> Result<Self, PatternError> {
        self.base_confidence = PatternError::check_unit_interval("base_confidence", base_confidence)?;
        Ok(self)
    }

    pub fn with_priority(mut self, priority: PatternPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_flags(mut self, flags: PatternFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Map a named regex group onto a semantic role (e.g. `src` -> `source`).
    pub fn with_capture_group(mut self, group: impl Into<String>, role: impl Into<String>) -> Self {
        self.capture_groups.insert(group.into(), role.into());
        self
    }

    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Result<Self, PatternError> {
        let version = version.into();
        if version.trim().is_empty() {
            return Err(PatternError::invalid("version", "must not be empty"));
        }
        self.version = version;
        Ok(self)
    }

    fn validate(&self) -> Result<(), PatternError> {
        for (field, value) in [
            ("id", &self.id),
            ("name", &self.name),
            ("domain", &self.domain),
            ("output_type", &self.output_type),
            ("regex_pattern", &self.regex_pattern),
        ] {
            if value.trim().is_empty() {
                return Err(PatternError::invalid(field, "must not be empty"));
            }
        }
        PatternError::check_unit_interval("base_confidence", self.base_confidence)?;
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn category(&self) -> PatternCategory {
        self.category
    }

    pub fn priority(&self) -> PatternPriority {
        self.priority
    }

    pub fn regex_pattern(&self) -> &str {
        &self.regex_pattern
    }

    pub fn flags(&self) -> PatternFlags {
        self.flags
    }

    pub fn output_type(&self) -> &str {
        &self.output_type
    }

    pub fn capture_groups(&self) -> &BTreeMap<String, String> {
        &self.capture_groups
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn base_confidence(&self) -> f64 {
        self.base_confidence
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Graduated confidence tiers for a scored match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    /// score ≥ 0.85
    Established,
    /// score ≥ 0.70
    Emerging,
    /// score ≥ 0.50
    Tentative,
    /// score < 0.50
    Uncertain,
}

impl ConfidenceTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.85 {
            Self::Established
        } else if score >= 0.70 {
            Self::Emerging
        } else if score >= 0.50 {
            Self::Tentative
        } else {
            Self::Uncertain
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Established => "established",
            Self::Emerging => "emerging",
            Self::Tentative => "tentative",
            Self::Uncertain => "uncertain",
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One score adjustment recorded by the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedFactor {
    pub name: String,
    /// Signed adjustment contributed by this factor.
    pub adjustment: f64,
    /// Running score before this factor.
    pub old_score: f64,
    /// Running score after this factor (unclamped).
    pub new_score: f64,
}

/// An entity found close to a relationship match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyEntity {
    /// Index of the entity in the list passed to relationship detection.
    pub entity_index: usize,
    pub pattern_id: String,
    pub output_type: String,
    pub output_value: String,
    pub start_position: usize,
    pub end_position: usize,
    /// Characters between the two spans; 0 when they overlap.
    pub distance: usize,
}

/// Free-form per-match extension data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nearby_entities: Vec<NearbyEntity>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One occurrence of a pattern in a text.
///
/// Deserialization runs the same checks as construction: both confidences
/// must lie in `[0, 1]` and the span must be non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPatternMatch")]
pub struct PatternMatch {
    pub pattern_id: String,
    pub pattern_name: String,
    pub domain: String,
    pub category: PatternCategory,
    pub priority: PatternPriority,
    pub matched_text: String,
    /// Byte offset of the match start in the source text.
    pub start_position: usize,
    /// Byte offset one past the match end.
    pub end_position: usize,
    pub output_type: String,
    pub output_value: String,
    pub captured_groups: BTreeMap<String, String>,
    base_confidence: f64,
    final_confidence: f64,
    pub surrounding_context: Option<String>,
    pub metadata: MatchMetadata,
    applied_factors: Vec<AppliedFactor>,
}

/// Unchecked wire shape of [`PatternMatch`].
#[derive(Deserialize)]
struct RawPatternMatch {
    pattern_id: String,
    pattern_name: String,
    domain: String,
    category: PatternCategory,
    priority: PatternPriority,
    matched_text: String,
    start_position: usize,
    end_position: usize,
    output_type: String,
    output_value: String,
    #[serde(default)]
    captured_groups: BTreeMap<String, String>,
    base_confidence: f64,
    final_confidence: f64,
    #[serde(default)]
    surrounding_context: Option<String>,
    #[serde(default)]
    metadata: MatchMetadata,
    #[serde(default)]
    applied_factors: Vec<AppliedFactor>,
}

impl TryFrom<RawPatternMatch> for PatternMatch {
    type Error = PatternError;

    fn try_from(raw: RawPatternMatch) -> Result<Self, Self::Error> {
        check_span(raw.start_position, raw.end_position)?;
        Ok(Self {
            base_confidence: PatternError::check_unit_interval("base_confidence", raw.base_confidence)?,
            final_confidence: PatternError::check_unit_interval("final_confidence", raw.final_confidence)?,
            pattern_id: raw.pattern_id,
            pattern_name: raw.pattern_name,
            domain: raw.domain,
            category: raw.category,
            priority: raw.priority,
            matched_text: raw.matched_text,
            start_position: raw.start_position,
            end_position: raw.end_position,
            output_type: raw.output_type,
            output_value: raw.output_value,
            captured_groups: raw.captured_groups,
            surrounding_context: raw.surrounding_context,
            metadata: raw.metadata,
            applied_factors: raw.applied_factors,
        })
    }
}

fn check_span(start: usize, end: usize) -> Result<(), PatternError> {
    if start >= end {
        return Err(PatternError::invalid(
            "end_position",
            format!("span {start}..{end} is empty or inverted"),
        ));
    }
    Ok(())
}

impl PatternMatch {
    /// Build an unscored match for `definition` spanning `start..end`.
    ///
    /// `final_confidence` starts equal to the pattern's base confidence.
    pub fn from_definition(
        definition: &PatternDefinition,
        matched_text: impl Into<String>,
        start: usize,
        end: usize,
    ) -> Result<Self, PatternError> {
        check_span(start, end)?;
        let matched_text = matched_text.into();
        Ok(Self {
            pattern_id: definition.id().to_string(),
            pattern_name: definition.name().to_string(),
            domain: definition.domain().to_string(),
            category: definition.category(),
            priority: definition.priority(),
            output_type: definition.output_type().to_string(),
            output_value: definition.normalization().apply(&matched_text),
            matched_text,
            start_position: start,
            end_position: end,
            captured_groups: BTreeMap::new(),
            base_confidence: definition.base_confidence(),
            final_confidence: definition.base_confidence(),
            surrounding_context: None,
            metadata: MatchMetadata::default(),
            applied_factors: Vec::new(),
        })
    }

    pub fn base_confidence(&self) -> f64 {
        self.base_confidence
    }

    pub fn final_confidence(&self) -> f64 {
        self.final_confidence
    }

    /// Set the final confidence; values outside `[0, 1]` are rejected.
    pub fn set_final_confidence(&mut self, value: f64) -> Result<(), PatternError> {
        self.final_confidence = PatternError::check_unit_interval("final_confidence", value)?;
        Ok(())
    }

    pub fn applied_factors(&self) -> &[AppliedFactor] {
        &self.applied_factors
    }

    /// Record a completed scoring pass, clamping the score into `[0, 1]`.
    /// Replaces any earlier trail.
    pub(crate) fn finalize_score(&mut self, final_confidence: f64, trail: Vec<AppliedFactor>) {
        self.final_confidence = if final_confidence.is_nan() {
            self.base_confidence
        } else {
            final_confidence.clamp(0.0, 1.0)
        };
        self.applied_factors = trail;
    }

    pub fn tier(&self) -> ConfidenceTier {
        ConfidenceTier::from_score(self.final_confidence)
    }

    pub fn len(&self) -> usize {
        self.end_position - self.start_position
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
