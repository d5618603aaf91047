//! Analysis confidence resolution.
//!
//! Converts untrusted analyzer output into an [`AnalysisResult`]: claimed
//! citations are checked against the registry, each unresolved citation
//! costs a fixed confidence penalty, and low confidence or any bad citation
//! flags the result for human review.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use knowledge::{CitationValidation, KnowledgeStore, RetrievedContext};

use crate::analyzer::AnalyzerOutput;
use crate::types::AnalysisResult;

/// Resolver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Confidence removed per unresolved citation
    pub penalty_per_invalid_citation: f64,
    /// Results below this confidence require review
    pub review_threshold: f64,
    /// Confidence assigned when the analyzer could not be used
    pub degraded_confidence: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            penalty_per_invalid_citation: 0.1,
            review_threshold: 0.6,
            degraded_confidence: 0.3,
        }
    }
}

/// Confidence after citation validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfidence {
    pub validation: CitationValidation,
    pub self_reported: f64,
    pub penalty: f64,
    pub final_confidence: f64,
    pub requires_human_review: bool,
}

/// Validates analyzer claims against the knowledge base.
pub struct ConfidenceResolver {
    store: Arc<KnowledgeStore>,
    config: ResolverConfig,
}

impl ConfidenceResolver {
    pub fn new(store: Arc<KnowledgeStore>) -> Self {
        Self {
            store,
            config: ResolverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Apply citation penalties to a self-reported confidence (0.0 - 1.0).
    pub fn resolve<S: AsRef<str>>(&self, self_reported: f64, claimed: &[S]) -> ResolvedConfidence {
        let self_reported = if self_reported.is_finite() {
            self_reported.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let validation = self.store.registry().validate(claimed);
        let penalty = self.config.penalty_per_invalid_citation * validation.invalid.len() as f64;
        let final_confidence = (self_reported - penalty).max(0.0);
        let requires_human_review =
            final_confidence < self.config.review_threshold || !validation.invalid.is_empty();

        if !validation.invalid.is_empty() {
            warn!(
                invalid = ?validation.invalid,
                penalty,
                "Analyzer cited sections that do not exist"
            );
        }

        ResolvedConfidence {
            validation,
            self_reported,
            penalty,
            final_confidence,
            requires_human_review,
        }
    }

    /// Build the result for a successful analyzer call.
    pub fn resolve_output(
        &self,
        topic: &str,
        query: &str,
        output: AnalyzerOutput,
        contexts: Vec<RetrievedContext>,
    ) -> AnalysisResult {
        let resolved = self.resolve(output.claimed_confidence_percent / 100.0, &output.claimed_citations);

        debug!(
            topic = %topic,
            self_reported = resolved.self_reported,
            final_confidence = resolved.final_confidence,
            review = resolved.requires_human_review,
            "Resolved analysis confidence"
        );

        AnalysisResult {
            topic: topic.to_string(),
            query: query.to_string(),
            free_text_analysis: output.free_text,
            claimed_citations: output.claimed_citations,
            self_reported_confidence: resolved.self_reported,
            validated_citations: resolved.validation.valid,
            invalid_citations: resolved.validation.invalid,
            final_confidence: resolved.final_confidence,
            requires_human_review: resolved.requires_human_review,
            retrieved_contexts: contexts,
            degraded: false,
        }
    }

    /// Build the result used when the analyzer is unavailable.
    ///
    /// Retrieved sections are surfaced as the citations for manual review.
    pub fn degraded(
        &self,
        topic: &str,
        query: &str,
        contexts: Vec<RetrievedContext>,
        reason: &str,
    ) -> AnalysisResult {
        let confidence = self.config.degraded_confidence;
        AnalysisResult {
            topic: topic.to_string(),
            query: query.to_string(),
            free_text_analysis: format!(
                "Analyzer unavailable: {}. Retrieved {} relevant reference sections for manual review.",
                reason,
                contexts.len()
            ),
            claimed_citations: Vec::new(),
            self_reported_confidence: confidence,
            validated_citations: contexts.iter().map(|c| c.citation_key.clone()).collect(),
            invalid_citations: Vec::new(),
            final_confidence: confidence,
            requires_human_review: true,
            retrieved_contexts: contexts,
            degraded: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowledge::{KnowledgeSection, SectionCategory};

    fn resolver() -> ConfidenceResolver {
        let store = KnowledgeStore::new(vec![
            KnowledgeSection::new("1207", "Likelihood of Confusion", SectionCategory::Substantive, "du Pont"),
            KnowledgeSection::new("1209", "Descriptiveness", SectionCategory::Substantive, "merely descriptive"),
        ])
        .unwrap();
        ConfidenceResolver::new(Arc::new(store))
    }

    #[test]
    fn test_unknown_citation_penalized() {
        let resolved = resolver().resolve(0.9, &["9999"]);

        assert!(resolved.validation.valid.is_empty());
        assert_eq!(resolved.validation.invalid, vec!["9999".to_string()]);
        assert!((resolved.penalty - 0.1).abs() < 1e-9);
        assert!((resolved.final_confidence - 0.8).abs() < 1e-9);
        assert!(resolved.requires_human_review);
    }

    #[test]
    fn test_low_confidence_alone_requires_review() {
        let resolved = resolver().resolve(0.55, &["TMEP §1207"]);

        assert!(resolved.validation.invalid.is_empty());
        assert_eq!(resolved.final_confidence, 0.55);
        assert!(resolved.requires_human_review);
    }

    #[test]
    fn test_invalid_citation_alone_requires_review() {
        let resolved = resolver().resolve(1.0, &["1207", "1299"]);

        assert!(resolved.final_confidence >= 0.6);
        assert!(resolved.requires_human_review);
    }

    #[test]
    fn test_clean_result_needs_no_review() {
        let resolved = resolver().resolve(0.85, &["1207", "Section 1209"]);

        assert_eq!(resolved.validation.valid.len(), 2);
        assert_eq!(resolved.final_confidence, 0.85);
        assert!(!resolved.requires_human_review);
    }

    #[test]
    fn test_final_never_exceeds_self_reported() {
        let resolver = resolver();
        let claims: Vec<&str> = vec!["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12"];
        for reported in [0.0, 0.05, 0.3, 0.61, 0.99, 1.0, 1.7, -0.4] {
            for n in 0..claims.len() {
                let resolved = resolver.resolve(reported, &claims[..n]);
                assert!(resolved.final_confidence <= resolved.self_reported);
                assert!(resolved.final_confidence >= 0.0);
            }
        }
    }

    #[test]
    fn test_resolve_output() {
        let output = AnalyzerOutput {
            free_text: "Similar marks on related goods".to_string(),
            claimed_confidence_percent: 90.0,
            claimed_citations: vec!["1207".to_string(), "9999".to_string()],
        };
        let result = resolver().resolve_output("confusion", "Analyze confusion", output, Vec::new());

        assert_eq!(result.self_reported_confidence, 0.9);
        assert_eq!(result.validated_citations, vec!["1207".to_string()]);
        assert_eq!(result.invalid_citations, vec!["9999".to_string()]);
        assert!(result.final_confidence <= result.self_reported_confidence);
        assert!(result.requires_human_review);
        assert!(!result.degraded);
    }

    #[test]
    fn test_degraded_result() {
        let section = KnowledgeSection::new("1207", "Likelihood of Confusion", SectionCategory::Substantive, "");
        let contexts = vec![RetrievedContext::from_section(&section, 0.7)];
        let result = resolver().degraded("confusion", "Analyze confusion", contexts, "connection refused");

        assert_eq!(result.final_confidence, 0.3);
        assert_eq!(result.self_reported_confidence, 0.3);
        assert!(result.requires_human_review);
        assert!(result.degraded);
        assert_eq!(result.validated_citations, vec!["1207".to_string()]);
        assert_eq!(
            result.free_text_analysis,
            "Analyzer unavailable: connection refused. Retrieved 1 relevant reference sections for manual review."
        );
    }
}
