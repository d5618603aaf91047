//! AnalysisService - runs retrieval-grounded analyses for issue topics.
//!
//! Every topic goes retriever -> analyzer -> resolver. Retrieval failure,
//! analyzer failure and analyzer timeout all produce a degraded result, so
//! the service never fails a batch.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use knowledge::Retriever;

use crate::analyzer::Analyzer;
use crate::resolver::ConfidenceResolver;
use crate::types::{build_query, AnalysisResult};

/// Configuration for the analysis service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Sections retrieved per topic
    pub top_k: usize,
    /// Analyzer timeout per topic (ms)
    pub analyzer_timeout_ms: u64,
    /// Topic analyses in flight at once
    pub max_concurrent: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            analyzer_timeout_ms: 60_000,
            max_concurrent: 4,
        }
    }
}

/// Orchestrates retrieval, analysis and confidence resolution.
pub struct AnalysisService {
    config: AnalysisConfig,
    retriever: Arc<dyn Retriever>,
    analyzer: Arc<dyn Analyzer>,
    resolver: Arc<ConfidenceResolver>,
}

impl AnalysisService {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        analyzer: Arc<dyn Analyzer>,
        resolver: Arc<ConfidenceResolver>,
    ) -> Self {
        Self {
            config: AnalysisConfig::default(),
            retriever,
            analyzer,
            resolver,
        }
    }

    /// Create with configuration.
    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze one topic for a mark.
    pub async fn analyze_topic(&self, trademark: &str, goods_services: &str, topic: &str) -> AnalysisResult {
        let query = build_query(trademark, goods_services, topic);

        let contexts = match self.retriever.retrieve(&query, self.config.top_k).await {
            Ok(contexts) => contexts,
            Err(e) => {
                warn!(topic = %topic, retriever = %self.retriever.id(), error = %e, "Retrieval failed");
                return self
                    .resolver
                    .degraded(topic, &query, Vec::new(), &e.to_string());
            }
        };

        debug!(topic = %topic, contexts = contexts.len(), "Retrieved contexts");

        let timeout = Duration::from_millis(self.config.analyzer_timeout_ms);
        match tokio::time::timeout(timeout, self.analyzer.analyze(&query, &contexts)).await {
            Ok(Ok(output)) => self.resolver.resolve_output(topic, &query, output, contexts),
            Ok(Err(e)) => {
                warn!(topic = %topic, analyzer = %self.analyzer.id(), error = %e, "Analyzer failed");
                self.resolver.degraded(topic, &query, contexts, &e.to_string())
            }
            Err(_) => {
                warn!(
                    topic = %topic,
                    timeout_ms = self.config.analyzer_timeout_ms,
                    "Analyzer timed out"
                );
                let reason = format!("timed out after {}ms", self.config.analyzer_timeout_ms);
                self.resolver.degraded(topic, &query, contexts, &reason)
            }
        }
    }

    /// Analyze several topics concurrently.
    ///
    /// Results come back in the order of `topics`.
    pub async fn analyze_topics(
        &self,
        trademark: &str,
        goods_services: &str,
        topics: &[String],
    ) -> Vec<AnalysisResult> {
        info!(
            trademark = %trademark,
            topics = topics.len(),
            max_concurrent = self.config.max_concurrent,
            "Analyzing issue topics"
        );

        stream::iter(topics)
            .map(|topic| self.analyze_topic(trademark, goods_services, topic))
            .buffered(self.config.max_concurrent.max(1))
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::LlmAnalyzer;
    use crate::backend::{LlmBackend, MockBackend};
    use async_trait::async_trait;
    use knowledge::{
        KeywordRetriever, KnowledgeSection, KnowledgeStore, RetrievalError, RetrievedContext,
        SectionCategory,
    };

    fn store() -> Arc<KnowledgeStore> {
        Arc::new(
            KnowledgeStore::new(vec![
                KnowledgeSection::new(
                    "1207",
                    "Likelihood of Confusion",
                    SectionCategory::Substantive,
                    "Confusion depends on similarity of marks and relatedness of goods.",
                ),
                KnowledgeSection::new(
                    "904",
                    "Specimens",
                    SectionCategory::Procedural,
                    "A specimen must show the mark as used in commerce.",
                ),
            ])
            .unwrap(),
        )
    }

    fn service(backend: MockBackend) -> (AnalysisService, Arc<MockBackend>) {
        let store = store();
        let backend = Arc::new(backend);
        let backends: Vec<Arc<dyn LlmBackend>> = vec![backend.clone()];
        let service = AnalysisService::new(
            Arc::new(KeywordRetriever::new(store.clone())),
            Arc::new(LlmAnalyzer::new(backends)),
            Arc::new(ConfidenceResolver::new(store)),
        );
        (service, backend)
    }

    struct FailingRetriever;

    #[async_trait]
    impl Retriever for FailingRetriever {
        fn id(&self) -> &str {
            "failing"
        }

        async fn retrieve(&self, _query: &str, _k: usize) -> Result<Vec<RetrievedContext>, RetrievalError> {
            Err(RetrievalError::Unavailable("index offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_analyze_topic() {
        let (service, backend) = service(
            MockBackend::default()
                .with_response("ANALYSIS: Marks are similar.\nCONFIDENCE: 85%\nCITATIONS_USED: 1207"),
        );

        let result = service
            .analyze_topic("ACME", "coffee", "likelihood of confusion with similar marks")
            .await;

        assert_eq!(backend.call_count(), 1);
        assert!(!result.degraded);
        assert_eq!(result.validated_citations, vec!["1207".to_string()]);
        assert_eq!(result.final_confidence, 0.85);
        assert!(!result.requires_human_review);
        assert_eq!(result.retrieved_contexts[0].citation_key, "1207");
    }

    #[tokio::test]
    async fn test_unavailable_backend_degrades() {
        let (service, _) = service(MockBackend::default().with_available(false));

        let result = service
            .analyze_topic("ACME", "coffee", "likelihood of confusion with similar marks")
            .await;

        assert!(result.degraded);
        assert_eq!(result.final_confidence, 0.3);
        assert!(result.requires_human_review);
        assert!(result.free_text_analysis.starts_with("Analyzer unavailable: No LLM backend available."));
        assert!(result.validated_citations.contains(&"1207".to_string()));
    }

    #[tokio::test]
    async fn test_timeout_degrades() {
        let (service, _) = service(
            MockBackend::default()
                .with_response("ANALYSIS: late\nCONFIDENCE: 99%")
                .with_latency(Duration::from_millis(500)),
        );
        let service = service.with_config(AnalysisConfig {
            analyzer_timeout_ms: 20,
            ..Default::default()
        });

        let result = service.analyze_topic("ACME", "coffee", "specimen requirements").await;

        assert!(result.degraded);
        assert!(result.free_text_analysis.contains("timed out after 20ms"));
    }

    #[tokio::test]
    async fn test_retrieval_failure_degrades_without_calling_analyzer() {
        let store = store();
        let backend = Arc::new(MockBackend::default());
        let backends: Vec<Arc<dyn LlmBackend>> = vec![backend.clone()];
        let service = AnalysisService::new(
            Arc::new(FailingRetriever),
            Arc::new(LlmAnalyzer::new(backends)),
            Arc::new(ConfidenceResolver::new(store)),
        );

        let result = service.analyze_topic("ACME", "coffee", "ownership").await;

        assert!(result.degraded);
        assert!(result.retrieved_contexts.is_empty());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_topics_keep_input_order() {
        let (service, backend) = service(
            MockBackend::default()
                .with_response("ANALYSIS: generic\nCONFIDENCE: 70%")
                .with_response_for("specimen", "ANALYSIS: specimen ok\nCONFIDENCE: 95%"),
        );
        let topics = vec![
            "likelihood of confusion".to_string(),
            "specimen requirements".to_string(),
            "ownership".to_string(),
        ];

        let results = service.analyze_topics("ACME", "coffee", &topics).await;

        assert_eq!(backend.call_count(), 3);
        let order: Vec<&str> = results.iter().map(|r| r.topic.as_str()).collect();
        assert_eq!(order, vec!["likelihood of confusion", "specimen requirements", "ownership"]);
        assert_eq!(results[1].free_text_analysis, "specimen ok");
    }
}
