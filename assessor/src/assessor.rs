//! Assessor - end-to-end registrability assessment for one mark.
//!
//! Topics are analyzed concurrently, classified into issues, scored across
//! the four risk dimensions and summarized with recommendations and cost
//! and timeline windows. `assess` never fails: unavailable collaborators
//! show up as degraded analyses and flagged topics.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use knowledge::{CachedRetriever, KeywordRetriever, KnowledgeStore, Retriever};
use markwise_agent::{
    AnalysisService, Analyzer, ConfidenceResolver, LlmAnalyzer, LlmBackend, OpenAiBackend,
};

use crate::classifier::IssueClassifier;
use crate::config::AssessorConfig;
use crate::framework::RiskFramework;
use crate::recommend::RecommendationGenerator;
use crate::types::{
    AssessmentReport, CitedSection, DimensionSet, EvidenceBundle, PriorMark, Result, RiskAssessment,
    RiskLevel, TrademarkIssue,
};

/// Input to one assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentRequest {
    pub trademark: String,
    pub goods_services: String,
    /// Empty uses the configured default topics
    pub issue_topics: Vec<String>,
    pub prior_marks: Vec<PriorMark>,
    pub evidence: EvidenceBundle,
}

impl AssessmentRequest {
    pub fn new(trademark: impl Into<String>, goods_services: impl Into<String>) -> Self {
        Self {
            trademark: trademark.into(),
            goods_services: goods_services.into(),
            ..Default::default()
        }
    }

    pub fn with_topics(mut self, topics: Vec<String>) -> Self {
        self.issue_topics = topics;
        self
    }

    pub fn with_prior_marks(mut self, prior_marks: Vec<PriorMark>) -> Self {
        self.prior_marks = prior_marks;
        self
    }

    pub fn with_evidence(mut self, evidence: EvidenceBundle) -> Self {
        self.evidence = evidence;
        self
    }
}

/// Runs assessments against one knowledge base.
pub struct Assessor {
    config: AssessorConfig,
    store: Arc<KnowledgeStore>,
    service: AnalysisService,
    classifier: IssueClassifier,
    framework: RiskFramework,
    recommendations: RecommendationGenerator,
}

impl Assessor {
    /// Create with explicit retriever and analyzer.
    pub fn new(
        config: AssessorConfig,
        store: Arc<KnowledgeStore>,
        retriever: Arc<dyn Retriever>,
        analyzer: Arc<dyn Analyzer>,
    ) -> Result<Self> {
        let framework = RiskFramework::new(config.framework.clone())?;
        let resolver =
            Arc::new(ConfidenceResolver::new(store.clone()).with_config(config.resolver.clone()));
        let service = AnalysisService::new(retriever, analyzer, resolver)
            .with_config(config.analysis.clone());
        let classifier = IssueClassifier::new(config.estimates.clone());

        Ok(Self {
            config,
            store,
            service,
            classifier,
            framework,
            recommendations: RecommendationGenerator::new(),
        })
    }

    /// Create with the lexical retriever and the configured LLM backend.
    pub fn from_config(config: AssessorConfig, store: Arc<KnowledgeStore>) -> Result<Self> {
        let keyword = KeywordRetriever::new(store.clone());
        let retriever: Arc<dyn Retriever> = if config.general.cache_retrieval {
            Arc::new(CachedRetriever::new(keyword))
        } else {
            Arc::new(keyword)
        };

        let backend: Arc<dyn LlmBackend> = Arc::new(OpenAiBackend::from_config(&config.backend)?);
        let analyzer = Arc::new(LlmAnalyzer::new(vec![backend]).with_config(config.backend.clone()));

        Self::new(config, store, retriever, analyzer)
    }

    pub fn config(&self) -> &AssessorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<KnowledgeStore> {
        &self.store
    }

    /// Assess one mark.
    pub async fn assess(&self, request: &AssessmentRequest) -> RiskAssessment {
        let topics = if request.issue_topics.is_empty() {
            self.config.assessment.default_topics.clone()
        } else {
            request.issue_topics.clone()
        };

        info!(
            trademark = %request.trademark,
            topics = topics.len(),
            prior_marks = request.prior_marks.len(),
            "Starting assessment"
        );

        let analyses = self
            .service
            .analyze_topics(&request.trademark, &request.goods_services, &topics)
            .await;

        let flagged_topics: Vec<String> = analyses
            .iter()
            .filter(|a| a.requires_human_review)
            .map(|a| a.topic.clone())
            .collect();
        let degraded = analyses.iter().filter(|a| a.degraded).count();
        if degraded > 0 {
            warn!(degraded, total = analyses.len(), "Some topic analyses were degraded");
        }

        let issues: Vec<TrademarkIssue> = analyses
            .iter()
            .map(|analysis| self.classifier.classify(&analysis.topic, analysis))
            .collect();

        let dimensions = self.score_dimensions(&issues, request);
        let (overall_score, overall_confidence) = self.framework.calculate_overall_score(&dimensions);
        let overall_level = self.framework.determine_risk_level(overall_score);
        let requires_human_review = self.framework.requires_human_review(overall_confidence);

        let recommendations = self.recommendations.generate(overall_level, &issues);
        let estimates = self.classifier.estimates();
        let estimated_total_cost = estimates.total_cost(&issues);
        let estimated_timeline = estimates.total_timeline(&issues);

        info!(
            trademark = %request.trademark,
            score = overall_score,
            level = %overall_level.as_str(),
            confidence = overall_confidence,
            review = requires_human_review,
            "Assessment complete"
        );

        RiskAssessment {
            trademark: request.trademark.clone(),
            goods_services: request.goods_services.clone(),
            overall_score,
            overall_level,
            overall_confidence,
            requires_human_review,
            dimensions,
            total_issues: issues.len(),
            critical_issues: issues
                .iter()
                .filter(|i| i.severity == RiskLevel::Critical)
                .count(),
            issues,
            flagged_topics,
            primary_recommendation: recommendations.primary,
            alternative_strategies: recommendations.alternatives,
            estimated_total_cost,
            estimated_timeline,
        }
    }

    /// Assess one mark and wrap the result with report metadata.
    pub async fn assess_report(&self, request: &AssessmentRequest) -> AssessmentReport {
        let assessment = self.assess(request).await;
        AssessmentReport {
            report_id: uuid::Uuid::new_v4().to_string(),
            generated_at: chrono::Utc::now(),
            knowledge_fingerprint: self.store.fingerprint(),
            assessment,
        }
    }

    fn score_dimensions(&self, issues: &[TrademarkIssue], request: &AssessmentRequest) -> DimensionSet {
        let evidence_sections: Vec<String> = issues.iter().map(|i| i.citation_key.clone()).collect();

        let cited_sections: Vec<CitedSection> = issues
            .iter()
            .map(|i| CitedSection {
                section: i.citation_key.clone(),
                category: self
                    .store
                    .lookup(&i.citation_key)
                    .map(|summary| summary.category)
                    .unwrap_or_default(),
            })
            .collect();

        let subjective = request
            .evidence
            .subjective_elements
            .as_deref()
            .unwrap_or(&self.config.assessment.subjective_elements);

        DimensionSet {
            rejection_likelihood: self.framework.assess_rejection_likelihood(
                issues,
                &request.prior_marks,
                &evidence_sections,
            ),
            overcoming_difficulty: self
                .framework
                .assess_overcoming_difficulty(issues, self.classifier.estimates()),
            legal_precedent_strength: self.framework.assess_legal_precedent(
                &cited_sections,
                &request.evidence.case_law,
                &request.evidence.third_party_registrations,
            ),
            examiner_discretion: self.framework.assess_examiner_discretion(issues, subjective),
        }
    }
}
