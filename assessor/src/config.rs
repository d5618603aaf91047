//! Configuration for the assessor.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use markwise_agent::{AnalysisConfig, BackendConfig, ResolverConfig};

use crate::estimate::EstimateConfig;
use crate::types::{AssessorError, IssueCategory, Result};

const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessorConfig {
    /// Risk framework calibration
    pub framework: FrameworkConfig,
    /// Citation penalty and review thresholds
    pub resolver: ResolverConfig,
    /// Retrieval depth, timeouts and concurrency
    pub analysis: AnalysisConfig,
    /// LLM backend connection
    pub backend: BackendConfig,
    /// Per-severity cost and time estimates
    pub estimates: EstimateConfig,
    /// Request defaults
    pub assessment: AssessmentDefaults,
    /// General settings
    pub general: GeneralConfig,
}

impl AssessorConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.framework.validate()?;
        Ok(config)
    }

    /// Load config from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Weight of each dimension in the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionWeights {
    pub rejection_likelihood: f64,
    pub overcoming_difficulty: f64,
    pub legal_precedent: f64,
    pub examiner_discretion: f64,
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self {
            rejection_likelihood: 0.40,
            overcoming_difficulty: 0.30,
            legal_precedent: 0.20,
            examiner_discretion: 0.10,
        }
    }
}

impl DimensionWeights {
    fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("rejection_likelihood", self.rejection_likelihood),
            ("overcoming_difficulty", self.overcoming_difficulty),
            ("legal_precedent", self.legal_precedent),
            ("examiner_discretion", self.examiner_discretion),
        ]
    }

    pub fn sum(&self) -> f64 {
        self.named().iter().map(|(_, w)| w).sum()
    }

    /// Every weight in (0, 1] and the four summing to 1.
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in self.named() {
            if !(weight > 0.0 && weight <= 1.0) {
                return Err(AssessorError::InvalidWeights(format!(
                    "{} must be in (0, 1], got {}",
                    name, weight
                )));
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(AssessorError::InvalidWeights(format!(
                "weights must sum to 1.0, got {}",
                sum
            )));
        }

        Ok(())
    }
}

/// Rejection likelihood calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RejectionParams {
    pub critical_points: f64,
    pub critical_cap: f64,
    pub high_points: f64,
    pub high_cap: f64,
    pub prior_mark_points: f64,
    pub prior_mark_cap: f64,
    pub evidence_points: f64,
    pub evidence_cap: f64,
    /// Confidence multiplier when any issue is critical
    pub critical_decay: f64,
    /// Confidence multiplier when any issue is high
    pub high_decay: f64,
    pub cited_prior_marks: usize,
    pub cited_evidence: usize,
    pub max_citations: usize,
}

impl Default for RejectionParams {
    fn default() -> Self {
        Self {
            critical_points: 30.0,
            critical_cap: 60.0,
            high_points: 15.0,
            high_cap: 30.0,
            prior_mark_points: 10.0,
            prior_mark_cap: 25.0,
            evidence_points: 5.0,
            evidence_cap: 15.0,
            critical_decay: 0.9,
            high_decay: 0.85,
            cited_prior_marks: 3,
            cited_evidence: 3,
            max_citations: 5,
        }
    }
}

/// Overcoming difficulty calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyParams {
    /// Base difficulty by issue category
    pub base: BTreeMap<IssueCategory, f64>,
    /// Used for categories missing from `base`
    pub unknown_base: f64,
    pub mean_weight: f64,
    pub max_weight: f64,
    /// Issues at or above this difficulty are called out
    pub hard_threshold: f64,
    /// Summed cost midpoints above which the penalty applies (dollars)
    pub cost_threshold: u64,
    pub cost_penalty: f64,
    /// Summed month midpoints above which the penalty applies
    pub time_threshold_months: u32,
    pub time_penalty: f64,
    pub confidence: f64,
    pub max_citations: usize,
}

impl Default for DifficultyParams {
    fn default() -> Self {
        let base = BTreeMap::from([
            (IssueCategory::LikelihoodConfusion, 70.0),
            (IssueCategory::Descriptiveness, 50.0),
            (IssueCategory::Genericness, 90.0),
            (IssueCategory::SpecimenDeficiency, 20.0),
            (IssueCategory::IdentificationIssue, 15.0),
            (IssueCategory::OwnershipIssue, 40.0),
            (IssueCategory::BasisIssue, 25.0),
            (IssueCategory::Procedural, 10.0),
        ]);

        Self {
            base,
            unknown_base: 30.0,
            mean_weight: 0.6,
            max_weight: 0.4,
            hard_threshold: 60.0,
            cost_threshold: 5_000,
            cost_penalty: 10.0,
            time_threshold_months: 12,
            time_penalty: 10.0,
            confidence: 0.85,
            max_citations: 5,
        }
    }
}

impl DifficultyParams {
    pub fn difficulty(&self, category: IssueCategory) -> f64 {
        self.base.get(&category).copied().unwrap_or(self.unknown_base)
    }
}

/// Legal precedent calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecedentParams {
    pub base: f64,
    /// Substantive sections needed for the bonus
    pub substantive_min: usize,
    pub substantive_bonus: f64,
    pub no_substantive_penalty: f64,
    pub case_law_shift: f64,
    pub third_party_points: f64,
    pub third_party_cap: f64,
    pub confidence: f64,
    /// Confidence multiplier when third-party registrations exist
    pub third_party_decay: f64,
    pub cited_sections: usize,
    pub max_citations: usize,
}

impl Default for PrecedentParams {
    fn default() -> Self {
        Self {
            base: 50.0,
            substantive_min: 3,
            substantive_bonus: 20.0,
            no_substantive_penalty: 20.0,
            case_law_shift: 15.0,
            third_party_points: 5.0,
            third_party_cap: 20.0,
            confidence: 0.75,
            third_party_decay: 0.9,
            cited_sections: 2,
            max_citations: 5,
        }
    }
}

/// Examiner discretion calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscretionParams {
    /// Score when no issue involves discretion
    pub base: f64,
    /// Categories decided largely on examiner judgment
    pub high_discretion: Vec<IssueCategory>,
    pub discretionary_base: f64,
    pub per_issue: f64,
    pub subjective_points: f64,
    pub subjective_cap: f64,
    pub confidence: f64,
    pub cited_issues: usize,
    pub max_citations: usize,
}

impl Default for DiscretionParams {
    fn default() -> Self {
        Self {
            base: 30.0,
            high_discretion: vec![IssueCategory::LikelihoodConfusion, IssueCategory::Descriptiveness],
            discretionary_base: 50.0,
            per_issue: 10.0,
            subjective_points: 5.0,
            subjective_cap: 20.0,
            confidence: 0.70,
            cited_issues: 2,
            max_citations: 3,
        }
    }
}

/// Risk framework configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    pub weights: DimensionWeights,
    /// Overall confidence below this escalates to human review
    pub human_review_threshold: f64,
    pub rejection: RejectionParams,
    pub difficulty: DifficultyParams,
    pub precedent: PrecedentParams,
    pub discretion: DiscretionParams,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            weights: DimensionWeights::default(),
            human_review_threshold: 0.60,
            rejection: RejectionParams::default(),
            difficulty: DifficultyParams::default(),
            precedent: PrecedentParams::default(),
            discretion: DiscretionParams::default(),
        }
    }
}

impl FrameworkConfig {
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        if !(0.0..=1.0).contains(&self.human_review_threshold) {
            return Err(AssessorError::ConfigError(format!(
                "human_review_threshold must be in [0, 1], got {}",
                self.human_review_threshold
            )));
        }
        Ok(())
    }
}

/// Defaults applied to requests that leave fields empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentDefaults {
    /// Topics analyzed when a request names none
    pub default_topics: Vec<String>,
    /// Subjective elements assumed when evidence names none
    pub subjective_elements: Vec<String>,
}

impl Default for AssessmentDefaults {
    fn default() -> Self {
        Self {
            default_topics: vec![
                "likelihood of confusion with similar marks".to_string(),
                "descriptiveness or genericness".to_string(),
                "specimen and identification requirements".to_string(),
                "filing basis and ownership issues".to_string(),
            ],
            subjective_elements: vec![
                "commercial impression".to_string(),
                "suggestiveness".to_string(),
            ],
        }
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level
    pub log_level: String,
    /// Wrap the retriever in a query cache
    pub cache_retrieval: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            cache_retrieval: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AssessorConfig::default();
        assert_eq!(config.framework.weights.rejection_likelihood, 0.40);
        assert_eq!(config.framework.human_review_threshold, 0.60);
        assert_eq!(config.resolver.penalty_per_invalid_citation, 0.1);
        assert_eq!(config.analysis.top_k, 5);
        assert_eq!(config.assessment.default_topics.len(), 4);
        assert!(config.framework.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = AssessorConfig::default();
        config.general.log_level = "debug".to_string();
        let yaml = config.to_yaml().unwrap();
        let parsed = AssessorConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.general.log_level, "debug");
        assert_eq!(
            parsed.framework.difficulty.difficulty(IssueCategory::Genericness),
            90.0
        );
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "analysis:\n  top_k: 3\n";
        let config = AssessorConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.analysis.top_k, 3);
        assert_eq!(config.analysis.max_concurrent, 4);
        assert_eq!(config.framework.weights, DimensionWeights::default());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let yaml = "framework:\n  weights:\n    rejection_likelihood: 0.5\n";
        let err = AssessorConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, AssessorError::InvalidWeights(_)));
    }

    #[test]
    fn test_weight_out_of_range() {
        let weights = DimensionWeights {
            rejection_likelihood: 0.0,
            overcoming_difficulty: 0.5,
            legal_precedent: 0.3,
            examiner_discretion: 0.2,
        };
        assert!(weights.validate().is_err());
    }
}
