//! Pattern registry: a queryable store of definitions and their compiled matchers.
//!
//! Regexes are compiled once at registration, so a registry is read-only
//! after startup and can be shared across threads without locking.

use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use rustc_hash::FxHashSet;

use glean_core::errors::PatternError;

use super::types::{PatternCategory, PatternDefinition};

/// Upper bound on a compiled program's size. Rejects patterns that would
/// blow up the automaton instead of letting them through to detection time.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// A definition paired with its compiled matcher.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    definition: Arc<PatternDefinition>,
    regex: Regex,
    /// Position in registration order.
    ordinal: usize,
}

impl CompiledPattern {
    fn compile(definition: PatternDefinition, ordinal: usize) -> Result<Self, PatternError> {
        let flags = definition.flags();
        let regex = RegexBuilder::new(definition.regex_pattern())
            .case_insensitive(flags.case_insensitive)
            .multi_line(flags.multi_line)
            .dot_matches_new_line(flags.dot_matches_new_line)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
            .map_err(|e| PatternError::RegexCompilation {
                pattern_id: definition.id().to_string(),
                message: e.to_string(),
            })?;

        for group in definition.capture_groups().keys() {
            if !regex.capture_names().flatten().any(|name| name == group) {
                return Err(PatternError::invalid(
                    "capture_groups",
                    format!(
                        "pattern '{}' maps group '{group}' which the regex does not define",
                        definition.id()
                    ),
                ));
            }
        }

        Ok(Self {
            definition: Arc::new(definition),
            regex,
            ordinal,
        })
    }

    pub fn definition(&self) -> &PatternDefinition {
        &self.definition
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }
}

/// Optional domain/category filter for registry lookups.
///
/// `None` on either axis means "no restriction". `Some` with an empty list
/// excludes everything on that axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternFilter<'a> {
    pub domains: Option<&'a [String]>,
    pub categories: Option<&'a [PatternCategory]>,
}

impl<'a> PatternFilter<'a> {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, definition: &PatternDefinition) -> bool {
        let domain_ok = self
            .domains
            .map_or(true, |ds| ds.iter().any(|d| d == definition.domain()));
        let category_ok = self
            .categories
            .map_or(true, |cs| cs.contains(&definition.category()));
        domain_ok && category_ok
    }
}

/// Registry of pattern definitions, kept in registration order.
#[derive(Debug, Default, Clone)]
pub struct PatternRegistry {
    patterns: Vec<CompiledPattern>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and add a definition.
    ///
    /// Duplicate ids and names are allowed; a definition that fails to
    /// compile is rejected and the registry is left unchanged.
    pub fn register(&mut self, definition: PatternDefinition) -> Result<(), PatternError> {
        let compiled = CompiledPattern::compile(definition, self.patterns.len())?;
        tracing::debug!(
            pattern_id = compiled.definition().id(),
            domain = compiled.definition().domain(),
            category = %compiled.definition().category(),
            "registered pattern"
        );
        self.patterns.push(compiled);
        Ok(())
    }

    /// Register every definition, stopping at the first failure.
    pub fn register_all(
        &mut self,
        definitions: impl IntoIterator<Item = PatternDefinition>,
    ) -> Result<(), PatternError> {
        for def in definitions {
            self.register(def)?;
        }
        Ok(())
    }

    /// Definitions matching the filter, in registration order.
    pub fn get_applicable<'r>(&'r self, filter: PatternFilter<'r>) -> Vec<&'r PatternDefinition> {
        self.applicable(filter).map(CompiledPattern::definition).collect()
    }

    /// Compiled patterns matching the filter, in registration order.
    pub fn applicable<'r>(
        &'r self,
        filter: PatternFilter<'r>,
    ) -> impl Iterator<Item = &'r CompiledPattern> + 'r {
        self.patterns
            .iter()
            .filter(move |p| filter.matches(p.definition()))
    }

    /// First definition registered under `id`.
    pub fn get(&self, id: &str) -> Option<&PatternDefinition> {
        self.patterns
            .iter()
            .map(CompiledPattern::definition)
            .find(|d| d.id() == id)
    }

    /// Distinct domains, in first-registration order.
    pub fn domains(&self) -> Vec<&str> {
        let mut seen = FxHashSet::default();
        self.patterns
            .iter()
            .map(|p| p.definition().domain())
            .filter(|d| seen.insert(*d))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
