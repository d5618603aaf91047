//! Core types for risk assessment.
//!
//! With the `typescript` feature enabled, output types can be exported to
//! TypeScript using ts-rs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use knowledge::SectionCategory;

use crate::estimate::{CostRange, MonthRange};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Risk band, also used as issue severity.
///
/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Under 20: clear path to registration
    Minimal = 1,
    /// 20-40: minor concerns
    Low = 2,
    /// 40-60: possible rejection
    Moderate = 3,
    /// 60-75: likely rejection
    High = 4,
    /// 75 and above: almost certain rejection
    Critical = 5,
}

impl RiskLevel {
    /// Band a 0-100 score.
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            Self::Critical
        } else if score >= 60.0 {
            Self::High
        } else if score >= 40.0 {
            Self::Moderate
        } else if score >= 20.0 {
            Self::Low
        } else {
            Self::Minimal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Moderate => "moderate",
            Self::Low => "low",
            Self::Minimal => "minimal",
        }
    }

    /// All levels, most severe first.
    pub fn all_descending() -> [Self; 5] {
        [Self::Critical, Self::High, Self::Moderate, Self::Low, Self::Minimal]
    }
}

/// Kind of registrability issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    #[serde(rename = "likelihood_of_confusion")]
    LikelihoodConfusion,
    Descriptiveness,
    Genericness,
    SpecimenDeficiency,
    IdentificationIssue,
    OwnershipIssue,
    #[serde(rename = "filing_basis_issue")]
    BasisIssue,
    #[serde(rename = "procedural_issue")]
    Procedural,
}

impl IssueCategory {
    /// Wire tag, identical to the serde form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LikelihoodConfusion => "likelihood_of_confusion",
            Self::Descriptiveness => "descriptiveness",
            Self::Genericness => "genericness",
            Self::SpecimenDeficiency => "specimen_deficiency",
            Self::IdentificationIssue => "identification_issue",
            Self::OwnershipIssue => "ownership_issue",
            Self::BasisIssue => "filing_basis_issue",
            Self::Procedural => "procedural_issue",
        }
    }
}

/// One identified registrability issue.
///
/// `estimated_cost` and `estimated_time` are display strings such as
/// `"$1,500-3,000"` and `"6-9 months"`; they are parsed when totals are
/// computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct TrademarkIssue {
    pub category: IssueCategory,
    pub severity: RiskLevel,
    pub title: String,
    pub description: String,
    /// Normalized key of the primary supporting section
    pub citation_key: String,
    /// Excerpt of the primary retrieved section
    pub citation_text: String,
    pub recommendation: String,
    /// Confidence of the underlying analysis (0.0 - 1.0)
    pub confidence: f64,
    pub estimated_cost: String,
    pub estimated_time: String,
}

/// An existing mark that may conflict with the applied-for mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct PriorMark {
    pub name: String,
    #[serde(default)]
    pub registration: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    /// Externally supplied similarity (0.0 - 1.0); never computed here
    #[serde(default)]
    pub similarity_score: Option<f64>,
}

impl PriorMark {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registration: None,
            owner: None,
            similarity_score: None,
        }
    }

    pub fn with_registration(mut self, registration: impl Into<String>) -> Self {
        self.registration = Some(registration.into());
        self
    }
}

/// A decided case bearing on the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseLaw {
    pub name: String,
    /// Whether the case supports registration
    #[serde(default)]
    pub favorable: bool,
}

/// A registered third-party mark showing similar marks coexist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThirdPartyRegistration {
    pub mark: String,
    #[serde(default)]
    pub registration: Option<String>,
}

/// A section cited as precedent, with its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitedSection {
    pub section: String,
    pub category: SectionCategory,
}

/// Evidentiary signals beyond the analyzed issues.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceBundle {
    pub case_law: Vec<CaseLaw>,
    pub third_party_registrations: Vec<ThirdPartyRegistration>,
    /// `None` uses the configured defaults
    pub subjective_elements: Option<Vec<String>>,
}

/// Which risk dimension a score belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    RejectionLikelihood,
    OvercomingDifficulty,
    LegalPrecedent,
    ExaminerDiscretion,
}

impl DimensionKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::RejectionLikelihood => "Rejection Likelihood",
            Self::OvercomingDifficulty => "Overcoming Difficulty",
            Self::LegalPrecedent => "Legal Precedent Strength",
            Self::ExaminerDiscretion => "Examiner Discretion",
        }
    }
}

/// A weighted, confidence-rated sub-score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct RiskDimension {
    pub kind: DimensionKind,
    pub name: String,
    /// Weight copied from configuration; aggregation does not read it
    pub weight: f64,
    /// 0 - 100
    pub score: f64,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub explanation: String,
    pub supporting_citations: Vec<String>,
}

impl RiskDimension {
    /// Create a dimension, clamping score and confidence into range.
    pub fn new(
        kind: DimensionKind,
        weight: f64,
        score: f64,
        confidence: f64,
        explanation: impl Into<String>,
        supporting_citations: Vec<String>,
    ) -> Self {
        Self {
            kind,
            name: kind.display_name().to_string(),
            weight,
            score: score.clamp(0.0, 100.0),
            confidence: confidence.clamp(0.0, 1.0),
            explanation: explanation.into(),
            supporting_citations,
        }
    }
}

/// The four dimensions of one assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct DimensionSet {
    pub rejection_likelihood: RiskDimension,
    pub overcoming_difficulty: RiskDimension,
    pub legal_precedent_strength: RiskDimension,
    pub examiner_discretion: RiskDimension,
}

impl DimensionSet {
    pub fn iter(&self) -> impl Iterator<Item = &RiskDimension> {
        [
            &self.rejection_likelihood,
            &self.overcoming_difficulty,
            &self.legal_precedent_strength,
            &self.examiner_discretion,
        ]
        .into_iter()
    }
}

/// Complete registrability assessment for one mark.
///
/// Deterministic for identical inputs; request metadata lives in
/// [`AssessmentReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct RiskAssessment {
    pub trademark: String,
    pub goods_services: String,

    pub overall_score: f64,
    pub overall_level: RiskLevel,
    pub overall_confidence: f64,
    pub requires_human_review: bool,

    #[serde(flatten)]
    pub dimensions: DimensionSet,

    pub issues: Vec<TrademarkIssue>,
    pub total_issues: usize,
    pub critical_issues: usize,
    /// Topics whose analysis needs review on its own
    pub flagged_topics: Vec<String>,

    pub primary_recommendation: String,
    pub alternative_strategies: Vec<String>,
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub estimated_total_cost: CostRange,
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub estimated_timeline: MonthRange,
}

/// Assessment plus per-request metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct AssessmentReport {
    pub report_id: String,
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub generated_at: DateTime<Utc>,
    /// SHA-256 of the knowledge base the assessment ran against
    pub knowledge_fingerprint: String,
    pub assessment: RiskAssessment,
}

/// Error types for the assessor.
#[derive(Debug, thiserror::Error)]
pub enum AssessorError {
    /// Dimension weights are unusable
    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Knowledge base error
    #[error("Knowledge base error: {0}")]
    Knowledge(#[from] knowledge::KnowledgeError),

    /// Backend construction error
    #[error("Backend error: {0}")]
    Backend(#[from] markwise_agent::LlmError),

    /// Report pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AssessorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_bands() {
        assert_eq!(RiskLevel::from_score(100.0), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(75.0), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(74.99), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(60.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(40.0), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(20.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(19.9), RiskLevel::Minimal);
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Minimal);
    }

    #[test]
    fn test_level_ordering() {
        assert!(RiskLevel::Critical > RiskLevel::High);
        assert!(RiskLevel::Low > RiskLevel::Minimal);
    }

    #[test]
    fn test_enum_wire_tags() {
        assert_eq!(serde_json::to_string(&RiskLevel::Moderate).unwrap(), "\"moderate\"");
        for category in [
            IssueCategory::LikelihoodConfusion,
            IssueCategory::SpecimenDeficiency,
            IssueCategory::BasisIssue,
            IssueCategory::Procedural,
        ] {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
        }
    }

    #[test]
    fn test_dimension_clamps() {
        let dim = RiskDimension::new(DimensionKind::RejectionLikelihood, 0.4, 140.0, 1.3, "x", vec![]);
        assert_eq!(dim.score, 100.0);
        assert_eq!(dim.confidence, 1.0);
        assert_eq!(dim.name, "Rejection Likelihood");
    }
}
