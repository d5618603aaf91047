//! Recommendation templates per overall risk level.

use serde::{Deserialize, Serialize};

use crate::types::{RiskLevel, TrademarkIssue};

const MAX_ALTERNATIVES: usize = 5;

/// Primary recommendation and alternative strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub primary: String,
    pub alternatives: Vec<String>,
}

/// Picks the template for a level and folds in issue advice.
#[derive(Debug, Clone, Default)]
pub struct RecommendationGenerator;

impl RecommendationGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, level: RiskLevel, issues: &[TrademarkIssue]) -> Recommendations {
        let (primary, base) = template(level);
        let mut alternatives: Vec<String> = base.iter().map(|s| s.to_string()).collect();

        for issue in issues {
            if !issue.recommendation.is_empty() && !alternatives.contains(&issue.recommendation) {
                alternatives.push(issue.recommendation.clone());
            }
        }
        alternatives.truncate(MAX_ALTERNATIVES);

        Recommendations {
            primary: primary.to_string(),
            alternatives,
        }
    }
}

fn template(level: RiskLevel) -> (&'static str, &'static [&'static str]) {
    match level {
        RiskLevel::Critical => (
            "DO NOT FILE - Likelihood of rejection is very high. Consider substantial mark modification or alternative mark entirely.",
            &[
                "Conduct comprehensive knockout search to identify less risky mark",
                "If brand is essential, budget for extensive legal costs and likelihood of failure",
                "Consider foreign filing first to establish some rights",
                "Explore common law rights instead of federal registration",
            ],
        ),
        RiskLevel::High => (
            "PROCEED WITH CAUTION - Significant rejection risk exists. Recommend addressing issues before filing or budgeting for extensive Office Action responses.",
            &[
                "Amend goods/services to avoid conflicting classes",
                "Develop secondary meaning evidence before filing",
                "File intent-to-use to delay specimen submission while addressing issues",
                "Consult trademark attorney for pre-filing risk mitigation",
                "Consider consent agreement if single prior mark is primary issue",
            ],
        ),
        RiskLevel::Moderate => (
            "PROCEED WITH PREPARATION - Issues exist but can likely be overcome. Budget for 1-2 Office Action responses.",
            &[
                "Prepare response arguments in advance",
                "Gather evidence of non-descriptiveness or acquired distinctiveness",
                "Ensure specimens meet all USPTO requirements",
                "Consider trademark attorney for Office Action response",
                "Monitor similar applications during prosecution",
            ],
        ),
        RiskLevel::Low => (
            "PROCEED - Minor issues may arise but registration is likely. Standard prosecution expected.",
            &[
                "Ensure all filing requirements are met",
                "Monitor application status regularly",
                "Prepare for possible minor amendments",
                "Consider DIY filing or limited attorney assistance",
            ],
        ),
        RiskLevel::Minimal => (
            "PROCEED CONFIDENTLY - Clear path to registration. Minimal risk identified.",
            &[
                "File application as soon as ready",
                "DIY filing is reasonable given low risk",
                "Maintain specimens and usage evidence",
                "Plan for straightforward prosecution timeline (8-12 months)",
            ],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IssueCategory;

    fn issue(recommendation: &str) -> TrademarkIssue {
        TrademarkIssue {
            category: IssueCategory::SpecimenDeficiency,
            severity: RiskLevel::Low,
            title: "Specimen".to_string(),
            description: String::new(),
            citation_key: "904".to_string(),
            citation_text: String::new(),
            recommendation: recommendation.to_string(),
            confidence: 0.9,
            estimated_cost: "$500-$1,500".to_string(),
            estimated_time: "3-6 months".to_string(),
        }
    }

    #[test]
    fn test_template_sizes() {
        let g = RecommendationGenerator::new();
        let expected = [
            (RiskLevel::Critical, 4),
            (RiskLevel::High, 5),
            (RiskLevel::Moderate, 5),
            (RiskLevel::Low, 4),
            (RiskLevel::Minimal, 4),
        ];
        for (level, count) in expected {
            assert_eq!(g.generate(level, &[]).alternatives.len(), count);
        }
        assert!(g.generate(RiskLevel::Critical, &[]).primary.starts_with("DO NOT FILE"));
    }

    #[test]
    fn test_issue_advice_appended_once() {
        let g = RecommendationGenerator::new();
        let issues = vec![
            issue("Review analysis and consider attorney consultation"),
            issue("Review analysis and consider attorney consultation"),
            issue(""),
        ];

        let recs = g.generate(RiskLevel::Low, &issues);
        assert_eq!(recs.alternatives.len(), 5);
        assert_eq!(recs.alternatives[4], "Review analysis and consider attorney consultation");
    }

    #[test]
    fn test_alternatives_truncated() {
        let g = RecommendationGenerator::new();
        let recs = g.generate(RiskLevel::High, &[issue("Something new")]);
        assert_eq!(recs.alternatives.len(), 5);
        assert!(!recs.alternatives.contains(&"Something new".to_string()));
    }
}
