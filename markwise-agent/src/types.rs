//! Analysis result types.

use serde::{Deserialize, Serialize};

use knowledge::RetrievedContext;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Outcome of analyzing one issue topic.
///
/// `final_confidence` never exceeds `self_reported_confidence`. Degraded
/// results always require human review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct AnalysisResult {
    /// Issue topic this result answers
    pub topic: String,
    /// Query sent to the retriever and analyzer
    pub query: String,
    /// Analyzer narrative
    pub free_text_analysis: String,
    /// Citations the analyzer claimed, as written
    pub claimed_citations: Vec<String>,
    /// Analyzer confidence (0.0 - 1.0)
    pub self_reported_confidence: f64,
    /// Citations confirmed against the registry
    pub validated_citations: Vec<String>,
    /// Citations that do not resolve
    pub invalid_citations: Vec<String>,
    /// Confidence after citation penalties (0.0 - 1.0)
    pub final_confidence: f64,
    /// Whether a person must review this result
    pub requires_human_review: bool,
    /// Sections the analysis was grounded on
    pub retrieved_contexts: Vec<RetrievedContext>,
    /// Produced without a successful analyzer call
    pub degraded: bool,
}

impl AnalysisResult {
    /// First validated citation, if any.
    pub fn primary_citation(&self) -> Option<&str> {
        self.validated_citations.first().map(String::as_str)
    }
}

/// Build the analysis query for a topic.
pub fn build_query(trademark: &str, goods_services: &str, topic: &str) -> String {
    format!(
        "Analyze {} for trademark '{}' used on {}",
        topic, trademark, goods_services
    )
}
