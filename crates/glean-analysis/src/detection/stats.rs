//! Aggregate statistics over one document's detections.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::patterns::PatternMatch;

/// Summary of a detection run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionStats {
    pub total_entities: usize,
    pub total_relationships: usize,
    /// Entity count per `output_type`.
    pub entity_types: BTreeMap<String, usize>,
    /// Mean entity `final_confidence`; 0.0 when there are no entities.
    pub avg_entity_confidence: f64,
    /// Entity count per confidence tier name.
    pub confidence_tiers: BTreeMap<String, usize>,
}

pub fn compile_statistics(entities: &[PatternMatch], relationships: &[PatternMatch]) -> DetectionStats {
    let mut entity_types = BTreeMap::new();
    let mut confidence_tiers = BTreeMap::new();
    let mut total_confidence = 0.0;

    for entity in entities {
        *entity_types.entry(entity.output_type.clone()).or_insert(0) += 1;
        *confidence_tiers
            .entry(entity.tier().name().to_string())
            .or_insert(0) += 1;
        total_confidence += entity.final_confidence();
    }

    let avg_entity_confidence = if entities.is_empty() {
        0.0
    } else {
        total_confidence / entities.len() as f64
    };

    DetectionStats {
        total_entities: entities.len(),
        total_relationships: relationships.len(),
        entity_types,
        avg_entity_confidence,
        confidence_tiers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{PatternCategory, PatternDefinition};

    fn entity(output_type: &str, confidence: f64) -> PatternMatch {
        let def = PatternDefinition::new("p", "p", "security", PatternCategory::Entity, "x", output_type)
            .unwrap();
        let mut m = PatternMatch::from_definition(&def, "x", 0, 1).unwrap();
        m.set_final_confidence(confidence).unwrap();
        m
    }

    #[test]
    fn test_empty_input_gives_zeroed_stats() {
        let stats = compile_statistics(&[], &[]);
        assert_eq!(stats, DetectionStats::default());
        assert_eq!(stats.avg_entity_confidence, 0.0);
    }

    #[test]
    fn test_histograms_and_mean() {
        let entities = vec![
            entity("vulnerability", 0.9),
            entity("vulnerability", 0.6),
            entity("ip_address", 0.3),
        ];
        let stats = compile_statistics(&entities, &entities[..1]);
        assert_eq!(stats.total_entities, 3);
        assert_eq!(stats.total_relationships, 1);
        assert_eq!(stats.entity_types["vulnerability"], 2);
        assert_eq!(stats.entity_types["ip_address"], 1);
        assert!((stats.avg_entity_confidence - 0.6).abs() < 1e-12);
        assert_eq!(stats.confidence_tiers["established"], 1);
        assert_eq!(stats.confidence_tiers["tentative"], 1);
        assert_eq!(stats.confidence_tiers["uncertain"], 1);
    }
}
