//! Analyzer collaborator.
//!
//! An [`Analyzer`] turns a query plus retrieved sections into free text, a
//! self-reported confidence and the citations it claims to rely on. The
//! claims are untrusted; [`crate::resolver::ConfidenceResolver`] checks them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use knowledge::RetrievedContext;

use crate::backend::openai::BackendConfig;
use crate::backend::traits::{CompletionRequest, LlmBackend, LlmError, Sampling};
use crate::prompt::PromptAssembler;

/// Confidence assumed when the model omits or garbles it.
pub const DEFAULT_CONFIDENCE_PERCENT: f64 = 50.0;

/// Error types for analysis.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// No backend answered the availability probe
    #[error("No LLM backend available")]
    NoBackendAvailable,

    /// Backend error
    #[error("Backend error: {0}")]
    Backend(#[from] LlmError),

    /// Backend returned nothing usable
    #[error("Empty response from analyzer")]
    EmptyResponse,
}

/// Raw analyzer output before citation validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerOutput {
    pub free_text: String,
    /// Self-reported confidence on a 0-100 scale
    pub claimed_confidence_percent: f64,
    pub claimed_citations: Vec<String>,
}

/// Produces an analysis for a query grounded on retrieved contexts.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Identifier for logs.
    fn id(&self) -> &str;

    async fn analyze(
        &self,
        query: &str,
        contexts: &[RetrievedContext],
    ) -> Result<AnalyzerOutput, AnalyzerError>;
}

/// Parse the `ANALYSIS:` / `CONFIDENCE:` / `CITATIONS_USED:` response block.
///
/// Lines after `ANALYSIS:` continue the analysis until another label. Text
/// without an `ANALYSIS:` label is taken whole as the analysis.
pub fn parse_response(text: &str) -> AnalyzerOutput {
    #[derive(PartialEq)]
    enum Block {
        None,
        Analysis,
        Other,
    }

    let mut analysis: Vec<&str> = Vec::new();
    let mut confidence = DEFAULT_CONFIDENCE_PERCENT;
    let mut citations: Vec<String> = Vec::new();
    let mut saw_analysis = false;
    let mut block = Block::None;

    for line in text.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("ANALYSIS:") {
            block = Block::Analysis;
            saw_analysis = true;
            if !rest.trim().is_empty() {
                analysis.push(rest.trim());
            }
        } else if let Some(rest) = line.strip_prefix("CONFIDENCE:") {
            block = Block::Other;
            confidence = parse_confidence(rest).unwrap_or(DEFAULT_CONFIDENCE_PERCENT);
        } else if let Some(rest) = line.strip_prefix("CITATIONS_USED:") {
            block = Block::Other;
            citations = parse_citation_list(rest);
        } else if block == Block::Analysis && !line.is_empty() {
            analysis.push(line);
        }
    }

    let free_text = if saw_analysis {
        analysis.join(" ")
    } else {
        text.trim().to_string()
    };

    AnalyzerOutput {
        free_text,
        claimed_confidence_percent: confidence,
        claimed_citations: citations,
    }
}

fn parse_confidence(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '%' | '[' | ']') && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_citation_list(raw: &str) -> Vec<String> {
    let list = raw.trim().trim_start_matches('[').trim_end_matches(']');
    if list.eq_ignore_ascii_case("none") || list.eq_ignore_ascii_case("n/a") {
        return Vec::new();
    }
    list.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Analyzer backed by an LLM.
///
/// Uses the first backend that reports itself available.
pub struct LlmAnalyzer {
    backends: Vec<Arc<dyn LlmBackend>>,
    config: BackendConfig,
}

impl LlmAnalyzer {
    /// Create an analyzer over the given backends, in preference order.
    pub fn new(backends: Vec<Arc<dyn LlmBackend>>) -> Self {
        Self {
            backends,
            config: BackendConfig::default(),
        }
    }

    /// Use generation settings from configuration.
    pub fn with_config(mut self, config: BackendConfig) -> Self {
        self.config = config;
        self
    }

    async fn select_backend(&self) -> Result<Arc<dyn LlmBackend>, AnalyzerError> {
        for backend in &self.backends {
            if backend.is_available().await {
                return Ok(Arc::clone(backend));
            }
            warn!(backend = %backend.id(), "Backend unavailable");
        }
        Err(AnalyzerError::NoBackendAvailable)
    }
}

#[async_trait]
impl Analyzer for LlmAnalyzer {
    fn id(&self) -> &str {
        "llm"
    }

    async fn analyze(
        &self,
        query: &str,
        contexts: &[RetrievedContext],
    ) -> Result<AnalyzerOutput, AnalyzerError> {
        let backend = self.select_backend().await?;

        let request = CompletionRequest::user(PromptAssembler::build_user_prompt(query, contexts))
            .with_system(PromptAssembler::build_system_prompt())
            .with_sampling(Sampling {
                max_tokens: Some(self.config.max_tokens),
                temperature: Some(self.config.temperature),
                seed: self.config.seed,
            });

        let response = backend.complete(request).await?;
        if response.content.trim().is_empty() {
            return Err(AnalyzerError::EmptyResponse);
        }
        if response.truncated {
            warn!(backend = %backend.id(), "Analyzer response hit the token limit");
        }

        debug!(
            backend = %backend.id(),
            tokens = response.total_tokens(),
            "Analyzer response received"
        );

        Ok(parse_response(&response.content))
    }
}
