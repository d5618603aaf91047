//! Risk framework - scores the four risk dimensions and aggregates them.
//!
//! Every scorer is a pure function of its inputs and the immutable
//! [`FrameworkConfig`] handed to [`RiskFramework::new`]. Scores are clamped
//! to [0, 100] and confidences to [0, 1].
//!
//! | Dimension             | Default weight |
//! |-----------------------|----------------|
//! | Rejection likelihood  | 0.40           |
//! | Overcoming difficulty | 0.30           |
//! | Legal precedent       | 0.20           |
//! | Examiner discretion   | 0.10           |

use tracing::debug;

use knowledge::SectionCategory;

use crate::config::FrameworkConfig;
use crate::estimate::{format_dollars, EstimateConfig};
use crate::types::{
    CaseLaw, CitedSection, DimensionKind, DimensionSet, PriorMark, RiskDimension, RiskLevel, Result,
    ThirdPartyRegistration, TrademarkIssue,
};

/// Scores risk dimensions with a validated configuration.
#[derive(Debug, Clone)]
pub struct RiskFramework {
    config: FrameworkConfig,
}

impl RiskFramework {
    /// Create a framework, rejecting unusable weights.
    pub fn new(config: FrameworkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    /// Likelihood that the examiner refuses the application.
    pub fn assess_rejection_likelihood(
        &self,
        issues: &[TrademarkIssue],
        prior_marks: &[PriorMark],
        evidence_sections: &[String],
    ) -> RiskDimension {
        let p = &self.config.rejection;
        let mut score = 0.0;
        let mut confidence = 1.0;
        let mut parts = Vec::new();
        let mut citations = Vec::new();

        let critical = count_severity(issues, RiskLevel::Critical);
        let high = count_severity(issues, RiskLevel::High);

        if critical > 0 {
            score += (critical as f64 * p.critical_points).min(p.critical_cap);
            parts.push(format!("{} critical issue(s) identified", critical));
            confidence *= p.critical_decay;
        }

        if high > 0 {
            score += (high as f64 * p.high_points).min(p.high_cap);
            parts.push(format!("{} high-severity issue(s) identified", high));
            confidence *= p.high_decay;
        }

        if !prior_marks.is_empty() {
            score += (prior_marks.len() as f64 * p.prior_mark_points).min(p.prior_mark_cap);
            parts.push(format!("{} potentially confusing prior mark(s)", prior_marks.len()));
            citations.extend(
                prior_marks
                    .iter()
                    .take(p.cited_prior_marks)
                    .map(|m| m.registration.clone().unwrap_or_else(|| "Prior mark".to_string())),
            );
        }

        if !evidence_sections.is_empty() {
            score += (evidence_sections.len() as f64 * p.evidence_points).min(p.evidence_cap);
            citations.extend(evidence_sections.iter().take(p.cited_evidence).cloned());
        }

        citations.truncate(p.max_citations);
        debug!(score, confidence, critical, high, prior_marks = prior_marks.len(), "Rejection likelihood");

        self.dimension(
            DimensionKind::RejectionLikelihood,
            score,
            confidence,
            explain("Rejection Likelihood", &parts, "No significant rejection risks identified"),
            citations,
        )
    }

    /// How hard and costly the identified issues are to overcome.
    pub fn assess_overcoming_difficulty(
        &self,
        issues: &[TrademarkIssue],
        estimates: &EstimateConfig,
    ) -> RiskDimension {
        let p = &self.config.difficulty;
        let mut parts = Vec::new();
        let mut citations = Vec::new();
        let mut total = 0.0;
        let mut max: f64 = 0.0;

        for issue in issues {
            let difficulty = p.difficulty(issue.category);
            total += difficulty;
            max = max.max(difficulty);

            if difficulty >= p.hard_threshold {
                parts.push(format!("{} is difficult to overcome", issue.category.as_str()));
                citations.push(issue.citation_key.clone());
            }
        }

        let mut score = if issues.is_empty() {
            0.0
        } else {
            let mean = total / issues.len() as f64;
            (mean * p.mean_weight + max * p.max_weight).min(100.0)
        };

        let total_cost = estimates.sum_cost(issues);
        if total_cost > p.cost_threshold {
            score += p.cost_penalty;
            parts.push(format!("Estimated legal costs: ${}", format_dollars(total_cost)));
        }

        let total_months = estimates.sum_months(issues);
        if total_months > p.time_threshold_months {
            score += p.time_penalty;
            parts.push(format!("Estimated timeline: {} months", total_months));
        }

        citations.truncate(p.max_citations);
        debug!(score, total_cost, total_months, "Overcoming difficulty");

        self.dimension(
            DimensionKind::OvercomingDifficulty,
            score,
            p.confidence,
            explain("Overcoming Difficulty", &parts, "Issues can be overcome with standard responses"),
            citations,
        )
    }

    /// Weight of guidance, case law and coexisting registrations.
    pub fn assess_legal_precedent(
        &self,
        sections: &[CitedSection],
        case_law: &[CaseLaw],
        third_party: &[ThirdPartyRegistration],
    ) -> RiskDimension {
        let p = &self.config.precedent;
        let mut score = p.base;
        let mut confidence = p.confidence;
        let mut parts = Vec::new();
        let mut citations = Vec::new();

        let substantive: Vec<&CitedSection> = sections
            .iter()
            .filter(|s| s.category == SectionCategory::Substantive)
            .collect();

        if substantive.len() >= p.substantive_min {
            score += p.substantive_bonus;
            parts.push(format!(
                "Multiple TMEP sections support refusal ({} sections)",
                substantive.len()
            ));
            citations.extend(substantive.iter().take(p.cited_sections).map(|s| s.section.clone()));
        } else if substantive.is_empty() {
            score -= p.no_substantive_penalty;
            parts.push("Limited TMEP precedent for refusal".to_string());
        }

        if !case_law.is_empty() {
            let favorable = case_law.iter().filter(|c| c.favorable).count();
            let unfavorable = case_law.len() - favorable;

            if unfavorable > favorable {
                score += p.case_law_shift;
                parts.push(format!("{} case(s) support refusal", unfavorable));
            } else if favorable > unfavorable {
                score -= p.case_law_shift;
                parts.push(format!("{} case(s) support registration", favorable));
            }
        }

        if !third_party.is_empty() {
            score -= (third_party.len() as f64 * p.third_party_points).min(p.third_party_cap);
            parts.push(format!("{} similar mark(s) registered by USPTO", third_party.len()));
            confidence *= p.third_party_decay;
        }

        citations.truncate(p.max_citations);
        debug!(score, substantive = substantive.len(), cases = case_law.len(), "Legal precedent");

        self.dimension(
            DimensionKind::LegalPrecedent,
            score,
            confidence,
            explain("Legal Precedent", &parts, "Neutral legal precedent"),
            citations,
        )
    }

    /// Room for subjective examiner judgment.
    pub fn assess_examiner_discretion(
        &self,
        issues: &[TrademarkIssue],
        subjective_elements: &[String],
    ) -> RiskDimension {
        let p = &self.config.discretion;
        let mut score = p.base;
        let mut parts = Vec::new();
        let mut citations = Vec::new();

        let discretionary: Vec<&TrademarkIssue> = issues
            .iter()
            .filter(|i| p.high_discretion.contains(&i.category))
            .collect();

        if !discretionary.is_empty() {
            score = p.discretionary_base + discretionary.len() as f64 * p.per_issue;
            parts.push(format!("{} issue(s) involve examiner discretion", discretionary.len()));
            citations.extend(discretionary.iter().take(p.cited_issues).map(|i| i.citation_key.clone()));
        }

        if !subjective_elements.is_empty() {
            score += (subjective_elements.len() as f64 * p.subjective_points).min(p.subjective_cap);
            parts.push(format!("{} subjective element(s) in analysis", subjective_elements.len()));
        }

        citations.truncate(p.max_citations);

        self.dimension(
            DimensionKind::ExaminerDiscretion,
            score,
            p.confidence,
            explain("Examiner Discretion", &parts, "Limited examiner discretion"),
            citations,
        )
    }

    /// Weighted overall score and confidence.
    ///
    /// Weights come from the configuration, not from the dimensions.
    pub fn calculate_overall_score(&self, dimensions: &DimensionSet) -> (f64, f64) {
        let w = &self.config.weights;
        let weighted = [
            (&dimensions.rejection_likelihood, w.rejection_likelihood),
            (&dimensions.overcoming_difficulty, w.overcoming_difficulty),
            (&dimensions.legal_precedent_strength, w.legal_precedent),
            (&dimensions.examiner_discretion, w.examiner_discretion),
        ];

        weighted.iter().fold((0.0, 0.0), |(score, confidence), (dim, weight)| {
            (score + dim.score * weight, confidence + dim.confidence * weight)
        })
    }

    pub fn determine_risk_level(&self, score: f64) -> RiskLevel {
        RiskLevel::from_score(score)
    }

    pub fn requires_human_review(&self, confidence: f64) -> bool {
        confidence < self.config.human_review_threshold
    }

    fn weight_for(&self, kind: DimensionKind) -> f64 {
        let w = &self.config.weights;
        match kind {
            DimensionKind::RejectionLikelihood => w.rejection_likelihood,
            DimensionKind::OvercomingDifficulty => w.overcoming_difficulty,
            DimensionKind::LegalPrecedent => w.legal_precedent,
            DimensionKind::ExaminerDiscretion => w.examiner_discretion,
        }
    }

    fn dimension(
        &self,
        kind: DimensionKind,
        score: f64,
        confidence: f64,
        explanation: String,
        citations: Vec<String>,
    ) -> RiskDimension {
        RiskDimension::new(kind, self.weight_for(kind), score, confidence, explanation, citations)
    }
}

fn count_severity(issues: &[TrademarkIssue], severity: RiskLevel) -> usize {
    issues.iter().filter(|i| i.severity == severity).count()
}

fn explain(label: &str, parts: &[String], fallback: &str) -> String {
    if parts.is_empty() {
        fallback.to_string()
    } else {
        format!("{}: {}", label, parts.join("; "))
    }
}
