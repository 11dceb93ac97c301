//! Built-in pattern library for the `security` and `aws` domains.
//!
//! Deployments normally load their own libraries through
//! [`TomlPatternLoader`](super::loader::TomlPatternLoader); these defaults
//! cover the common report vocabulary and back the engine's own tests.

use glean_core::errors::PatternError;

use super::registry::PatternRegistry;
use super::types::{
    Normalization, PatternCategory, PatternDefinition, PatternFlags, PatternPriority,
};

pub const SECURITY_DOMAIN: &str = "security";
pub const AWS_DOMAIN: &str = "aws";

/// Subject words counted by the keyword-density detector, per domain.
const SECURITY_KEYWORDS: &[&str] = &[
    "advisory",
    "attack",
    "breach",
    "cve",
    "cvss",
    "cwe",
    "exploit",
    "exploited",
    "malware",
    "mitigation",
    "patch",
    "payload",
    "ransomware",
    "remediation",
    "threat",
    "vulnerability",
    "vulnerable",
    "zero-day",
];

const AWS_KEYWORDS: &[&str] = &[
    "arn",
    "bucket",
    "cloudtrail",
    "ec2",
    "guardduty",
    "iam",
    "kms",
    "lambda",
    "policy",
    "region",
    "role",
    "s3",
    "security group",
    "vpc",
];

/// Keyword vocabulary for `domain`. Unknown domains have none.
pub fn domain_keywords(domain: &str) -> &'static [&'static str] {
    match domain {
        SECURITY_DOMAIN => SECURITY_KEYWORDS,
        AWS_DOMAIN => AWS_KEYWORDS,
        _ => &[],
    }
}

/// Every domain that ships keywords.
pub fn keyword_domains() -> &'static [&'static str] {
    &[SECURITY_DOMAIN, AWS_DOMAIN]
}

fn pattern(
    id: &str,
    name: &str,
    domain: &str,
    category: PatternCategory,
    regex: &str,
    output_type: &str,
) -> Result<PatternDefinition, PatternError> {
    PatternDefinition::new(id, name, domain, category, regex, output_type)
}

fn relationship(
    id: &str,
    name: &str,
    domain: &str,
    regex: &str,
    output_type: &str,
) -> Result<PatternDefinition, PatternError> {
    Ok(
        pattern(id, name, domain, PatternCategory::Relationship, regex, output_type)?
            .with_capture_group("source", "source")
            .with_capture_group("relation", "relation")
            .with_capture_group("target", "target"),
    )
}

/// Patterns for vulnerability reports and threat write-ups.
pub fn security_patterns() -> Result<Vec<PatternDefinition>, PatternError> {
    let d = SECURITY_DOMAIN;
    Ok(vec![
        pattern(
            "sec-cve",
            "CVE identifier",
            d,
            PatternCategory::Entity,
            r"\bCVE-\d{4}-\d{4,7}\b",
            "vulnerability",
        )?
        .with_priority(PatternPriority::High)
        .with_normalization(Normalization::Upper)
        .with_description("MITRE CVE identifier, e.g. CVE-2021-44228"),
        pattern("sec-cwe", "CWE identifier", d, PatternCategory::Entity, r"\bCWE-\d{1,5}\b", "weakness")?
            .with_normalization(Normalization::Upper)
            .with_base_confidence(0.8)?,
        pattern(
            "sec-attack-technique",
            "ATT&CK technique",
            d,
            PatternCategory::Entity,
            r"\bT1\d{3}(?:\.\d{3})?\b",
            "attack_technique",
        )?
        .with_normalization(Normalization::Upper)
        .with_base_confidence(0.7)?,
        pattern(
            "sec-ipv4",
            "IPv4 address",
            d,
            PatternCategory::Entity,
            r"\b(?:(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\b",
            "ip_address",
        )?
        .with_base_confidence(0.8)?,
        pattern(
            "sec-sha256",
            "SHA-256 hash",
            d,
            PatternCategory::Entity,
            r"\b[a-f0-9]{64}\b",
            "file_hash",
        )?
        .with_normalization(Normalization::Lower)
        .with_base_confidence(0.85)?,
        pattern(
            "sec-cvss-score",
            "CVSS score",
            d,
            PatternCategory::Quantitative,
            r"\bCVSS(?:v[23](?:\.\d)?)?(?:\s+base)?(?:\s+score)?\s*(?:of|:|=)?\s*(?P<value>10(?:\.0)?|\d(?:\.\d)?)\b",
            "cvss_score",
        )?
        .with_base_confidence(0.85)?,
        pattern(
            "sec-severity",
            "Severity rating",
            d,
            PatternCategory::Context,
            r"\b(?P<value>critical|high|medium|low)[\s-]+(?:severity|risk|priority)\b",
            "severity",
        )?
        .with_normalization(Normalization::Lower)
        .with_base_confidence(0.7)?,
        pattern(
            "sec-monetary",
            "Monetary amount",
            d,
            PatternCategory::Quantitative,
            r"\$\s?\d[\d,]*(?:\.\d+)?(?:\s?(?:k|m|bn?|thousand|million|billion)\b)?",
            "monetary_amount",
        )?
        .with_base_confidence(0.8)?,
        pattern(
            "sec-percentage",
            "Percentage",
            d,
            PatternCategory::Quantitative,
            r"\b\d+(?:\.\d+)?\s?(?:%|percent\b)",
            "percentage",
        )?
        .with_base_confidence(0.8)?,
        pattern(
            "sec-iso-date",
            "ISO date",
            d,
            PatternCategory::Temporal,
            r"\b\d{4}-(?:0[1-9]|1[0-2])-(?:0[1-9]|[12]\d|3[01])\b",
            "date",
        )?
        .with_base_confidence(0.85)?,
        pattern(
            "sec-relative-time",
            "Relative time expression",
            d,
            PatternCategory::Temporal,
            r"\b(?:(?:\d+|a|an|one|two|three|four|five|six|seven|several|few)\s+(?:minutes?|hours?|days?|weeks?|months?|years?)\s+ago|(?:last|past|next)\s+(?:\d+\s+)?(?:hours?|days?|weeks?|months?|quarters?|years?)|yesterday|today)\b",
            "relative_time",
        )?
        .with_normalization(Normalization::Lower)
        .with_base_confidence(0.65)?,
        relationship(
            "sec-remediation",
            "Remediation relationship",
            d,
            r"\b(?P<source>[a-z][\w-]*(?:\s+[a-z][\w-]*)?)\s+(?P<relation>mitigates|remediates|patches|fixes|addresses)\s+(?P<target>CVE-\d{4}-\d{4,7}|[a-z][\w-]*)",
            "remediation",
        )?
        .with_base_confidence(0.7)?,
        relationship(
            "sec-exploitation",
            "Exploitation relationship",
            d,
            r"\b(?P<source>[a-z][\w-]*(?:\s+[a-z][\w-]*)?)\s+(?P<relation>exploits|targets|affects|impacts)\s+(?P<target>CVE-\d{4}-\d{4,7}|[a-z][\w.-]*(?:\s+[a-z][\w.-]*)?)",
            "exploitation",
        )?
        .with_base_confidence(0.7)?,
    ])
}

/// Patterns for AWS resources and IAM permission statements.
pub fn aws_patterns() -> Result<Vec<PatternDefinition>, PatternError> {
    let d = AWS_DOMAIN;
    Ok(vec![
        pattern(
            "aws-arn",
            "AWS ARN",
            d,
            PatternCategory::Entity,
            r"\barn:aws[a-z-]*:[a-z0-9-]+:[a-z0-9-]*:\d{0,12}:[\w+=,.@/:*-]+",
            "aws_arn",
        )?
        .with_priority(PatternPriority::High)
        .with_base_confidence(0.9)?,
        pattern(
            "aws-s3-uri",
            "S3 location",
            d,
            PatternCategory::Entity,
            r"\bs3://[a-z0-9][a-z0-9.-]{1,61}[a-z0-9](?:/\S*)?",
            "s3_location",
        )?
        .with_base_confidence(0.85)?,
        pattern(
            "aws-region",
            "AWS region",
            d,
            PatternCategory::Entity,
            r"\b(?:us|eu|ap|sa|ca|me|af|il)-(?:north|south|east|west|central|northeast|southeast|northwest|southwest)-\d\b",
            "aws_region",
        )?
        .with_normalization(Normalization::Lower)
        .with_base_confidence(0.85)?,
        pattern(
            "aws-iam-resource",
            "IAM resource",
            d,
            PatternCategory::Entity,
            r"\bIAM\s+(?:policy|policies|role|roles|user|users|group|groups)\b",
            "iam_resource",
        )?
        .with_base_confidence(0.7)?,
        pattern(
            "aws-access-key-id",
            "AWS access key id",
            d,
            PatternCategory::Entity,
            r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b",
            "access_key_id",
        )?
        .with_flags(PatternFlags {
            case_insensitive: false,
            ..PatternFlags::default()
        })
        .with_priority(PatternPriority::Critical)
        .with_base_confidence(0.9)?,
        relationship(
            "aws-permission",
            "IAM permission relationship",
            d,
            r"\b(?P<source>IAM\s+(?:policy|role|user|group)|[a-z][\w-]*)\s+(?P<relation>grants|denies|allows|is\s+attached\s+to|attaches\s+to)\s+(?P<target>[\w:/*.-]+)",
            "permission",
        )?
        .with_base_confidence(0.7)?,
    ])
}

/// A registry loaded with every built-in pattern.
pub fn default_registry() -> Result<PatternRegistry, PatternError> {
    let mut registry = PatternRegistry::new();
    registry.register_all(security_patterns()?)?;
    registry.register_all(aws_patterns()?)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::registry::PatternFilter;

    #[test]
    fn test_default_registry_compiles() {
        let registry = default_registry().unwrap();
        assert_eq!(
            registry.len(),
            security_patterns().unwrap().len() + aws_patterns().unwrap().len()
        );
        assert_eq!(registry.domains(), vec![SECURITY_DOMAIN, AWS_DOMAIN]);
    }

    #[test]
    fn test_every_category_represented() {
        let registry = default_registry().unwrap();
        for category in PatternCategory::all() {
            let cats = [*category];
            let found = registry.get_applicable(PatternFilter {
                domains: None,
                categories: Some(&cats),
            });
            assert!(!found.is_empty(), "no built-in pattern for {category}");
        }
    }

    #[test]
    fn test_cve_pattern_uses_default_confidence() {
        let registry = default_registry().unwrap();
        let cve = registry.get("sec-cve").unwrap();
        assert_eq!(cve.base_confidence(), 0.75);
        assert_eq!(cve.output_type(), "vulnerability");
    }

    #[test]
    fn test_domain_keywords() {
        assert!(domain_keywords("security").contains(&"vulnerability"));
        assert!(domain_keywords("aws").contains(&"iam"));
        assert!(domain_keywords("finance").is_empty());
    }
}
