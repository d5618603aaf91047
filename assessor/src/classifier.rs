//! Issue classifier - turns topic analyses into structured issues.
//!
//! Classification is an ordered rule table: the first rule whose topic
//! matcher accepts the (lowercased) topic decides category, severity and the
//! default citation. Topics no rule accepts fall through to a catch-all.

use tracing::debug;

use knowledge::normalize_citation;
use markwise_agent::AnalysisResult;

use crate::estimate::EstimateConfig;
use crate::types::{IssueCategory, RiskLevel, TrademarkIssue};

/// Recommendation for any issue whose analysis needs review.
pub const REVIEW_RECOMMENDATION: &str = "Review analysis and consider attorney consultation";

const DESCRIPTION_LIMIT: usize = 300;
const CITATION_TEXT_LIMIT: usize = 200;

/// Predicate over a lowercased topic.
#[derive(Debug, Clone)]
pub enum TopicMatch {
    /// Always matches
    Always,
    /// Topic contains the keyword
    Contains(String),
    /// Any of the inner matchers
    Any(Vec<TopicMatch>),
}

impl TopicMatch {
    pub fn contains(keyword: &str) -> Self {
        TopicMatch::Contains(keyword.to_lowercase())
    }

    pub fn matches(&self, topic: &str) -> bool {
        match self {
            TopicMatch::Always => true,
            TopicMatch::Contains(keyword) => topic.contains(keyword.as_str()),
            TopicMatch::Any(matchers) => matchers.iter().any(|m| m.matches(topic)),
        }
    }
}

/// How a rule picks severity.
#[derive(Debug, Clone, Copy)]
pub enum SeverityRule {
    Fixed(RiskLevel),
    /// `above` when confidence is strictly greater than the threshold
    ConfidenceAbove {
        threshold: f64,
        above: RiskLevel,
        otherwise: RiskLevel,
    },
}

impl SeverityRule {
    pub fn severity(&self, confidence: f64) -> RiskLevel {
        match *self {
            SeverityRule::Fixed(level) => level,
            SeverityRule::ConfidenceAbove {
                threshold,
                above,
                otherwise,
            } => {
                if confidence > threshold {
                    above
                } else {
                    otherwise
                }
            }
        }
    }
}

/// One row of the classification table.
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub name: String,
    pub matcher: TopicMatch,
    pub category: IssueCategory,
    pub severity: SeverityRule,
    /// Citation used when the analysis validated none
    pub default_citation: String,
    pub recommendation: String,
}

impl ClassificationRule {
    pub fn new(
        name: &str,
        matcher: TopicMatch,
        category: IssueCategory,
        severity: SeverityRule,
        default_citation: &str,
        recommendation: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            matcher,
            category,
            severity,
            default_citation: default_citation.to_string(),
            recommendation: recommendation.to_string(),
        }
    }
}

/// Built-in keyword rules, evaluated in order.
pub fn default_rules() -> Vec<ClassificationRule> {
    vec![
        ClassificationRule::new(
            "confusion",
            TopicMatch::contains("confusion"),
            IssueCategory::LikelihoodConfusion,
            SeverityRule::ConfidenceAbove {
                threshold: 0.7,
                above: RiskLevel::High,
                otherwise: RiskLevel::Moderate,
            },
            "1207",
            "Evaluate a consent agreement or narrow the goods/services to reduce overlap",
        ),
        ClassificationRule::new(
            "descriptiveness",
            TopicMatch::Any(vec![TopicMatch::contains("descriptive"), TopicMatch::contains("generic")]),
            IssueCategory::Descriptiveness,
            SeverityRule::ConfidenceAbove {
                threshold: 0.6,
                above: RiskLevel::Moderate,
                otherwise: RiskLevel::Low,
            },
            "1209",
            "Prepare suggestiveness arguments or evidence of acquired distinctiveness",
        ),
        ClassificationRule::new(
            "specimen",
            TopicMatch::contains("specimen"),
            IssueCategory::SpecimenDeficiency,
            SeverityRule::Fixed(RiskLevel::Low),
            "904",
            "Confirm specimens show the mark as used in commerce",
        ),
        ClassificationRule::new(
            "ownership",
            TopicMatch::contains("ownership"),
            IssueCategory::OwnershipIssue,
            SeverityRule::Fixed(RiskLevel::Moderate),
            "1301",
            "Document applicant ownership and chain of title",
        ),
    ]
}

/// Catch-all rule for topics no keyword rule accepts.
pub fn fallback_rule() -> ClassificationRule {
    ClassificationRule::new(
        "procedural",
        TopicMatch::Always,
        IssueCategory::Procedural,
        SeverityRule::Fixed(RiskLevel::Low),
        "1402",
        "Standard prosecution recommended",
    )
}

/// Maps analysis results to [`TrademarkIssue`]s.
pub struct IssueClassifier {
    rules: Vec<ClassificationRule>,
    fallback: ClassificationRule,
    estimates: EstimateConfig,
}

impl IssueClassifier {
    pub fn new(estimates: EstimateConfig) -> Self {
        Self {
            rules: default_rules(),
            fallback: fallback_rule(),
            estimates,
        }
    }

    /// Replace the ordered rules; `fallback` applies when none match.
    pub fn with_rules(mut self, rules: Vec<ClassificationRule>, fallback: ClassificationRule) -> Self {
        self.rules = rules;
        self.fallback = fallback;
        self
    }

    pub fn estimates(&self) -> &EstimateConfig {
        &self.estimates
    }

    /// First rule matching the topic.
    pub fn rule_for(&self, topic: &str) -> &ClassificationRule {
        let topic = topic.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(&topic))
            .unwrap_or(&self.fallback)
    }

    /// Build the issue for one analyzed topic.
    pub fn classify(&self, topic: &str, analysis: &AnalysisResult) -> TrademarkIssue {
        let rule = self.rule_for(topic);
        let confidence = analysis.final_confidence;
        let severity = rule.severity.severity(confidence);

        let citation_key = analysis
            .primary_citation()
            .map(normalize_citation)
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| rule.default_citation.clone());

        let citation_text = analysis
            .retrieved_contexts
            .first()
            .map(|ctx| format!("{}...", truncate_chars(&ctx.content, CITATION_TEXT_LIMIT)))
            .unwrap_or_default();

        let recommendation = if analysis.requires_human_review {
            REVIEW_RECOMMENDATION.to_string()
        } else {
            rule.recommendation.clone()
        };

        let estimate = self.estimates.lookup(severity);

        debug!(
            topic = %topic,
            rule = %rule.name,
            category = %rule.category.as_str(),
            severity = %severity.as_str(),
            citation = %citation_key,
            "Classified issue"
        );

        TrademarkIssue {
            category: rule.category,
            severity,
            title: title_case(topic),
            description: truncate_chars(&analysis.free_text_analysis, DESCRIPTION_LIMIT),
            citation_key,
            citation_text,
            recommendation,
            confidence,
            estimated_cost: estimate.cost.to_string(),
            estimated_time: estimate.time.to_string(),
        }
    }
}

/// Capitalize the first letter of every word, lowercase the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// First `limit` characters of `s`.
fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowledge::{RetrievedContext, SectionCategory};

    fn analysis(topic: &str, confidence: f64, review: bool) -> AnalysisResult {
        AnalysisResult {
            topic: topic.to_string(),
            query: format!("Analyze {}", topic),
            free_text_analysis: "The marks share a dominant term.".to_string(),
            claimed_citations: vec!["TMEP §1207.01".to_string()],
            self_reported_confidence: confidence,
            validated_citations: vec!["TMEP §1207.01".to_string()],
            invalid_citations: vec![],
            final_confidence: confidence,
            requires_human_review: review,
            retrieved_contexts: vec![RetrievedContext {
                section_id: "1207.01".to_string(),
                section_number: "1207.01".to_string(),
                title: "Likelihood of Confusion".to_string(),
                content: "x".repeat(250),
                category: SectionCategory::Substantive,
                relevance_score: 0.8,
                citation_key: "1207.01".to_string(),
            }],
            degraded: false,
        }
    }

    fn classifier() -> IssueClassifier {
        IssueClassifier::new(EstimateConfig::default())
    }

    #[test]
    fn test_confusion_severity_follows_confidence() {
        let c = classifier();
        let topic = "likelihood of confusion with similar marks";

        let high = c.classify(topic, &analysis(topic, 0.85, false));
        assert_eq!(high.category, IssueCategory::LikelihoodConfusion);
        assert_eq!(high.severity, RiskLevel::High);
        assert_eq!(high.estimated_cost, "$3,000-$6,000");
        assert_eq!(high.estimated_time, "9-12 months");

        let moderate = c.classify(topic, &analysis(topic, 0.7, false));
        assert_eq!(moderate.severity, RiskLevel::Moderate);
    }

    #[test]
    fn test_rule_order_first_match_wins() {
        let c = classifier();
        // mentions both confusion and specimen; confusion is checked first
        let rule = c.rule_for("Specimen confusion");
        assert_eq!(rule.category, IssueCategory::LikelihoodConfusion);

        assert_eq!(c.rule_for("GENERICNESS").category, IssueCategory::Descriptiveness);
        assert_eq!(c.rule_for("ownership transfer").category, IssueCategory::OwnershipIssue);
        assert_eq!(c.rule_for("filing basis").category, IssueCategory::Procedural);
    }

    #[test]
    fn test_issue_fields() {
        let c = classifier();
        let topic = "specimen and identification requirements";
        let issue = c.classify(topic, &analysis(topic, 0.9, false));

        assert_eq!(issue.title, "Specimen And Identification Requirements");
        assert_eq!(issue.citation_key, "1207.01");
        assert_eq!(issue.citation_text.chars().count(), 203);
        assert!(issue.citation_text.ends_with("..."));
        assert_eq!(issue.severity, RiskLevel::Low);
        assert_eq!(issue.recommendation, "Confirm specimens show the mark as used in commerce");
    }

    #[test]
    fn test_review_recommendation_and_default_citation() {
        let c = classifier();
        let topic = "ownership";
        let mut result = analysis(topic, 0.4, true);
        result.validated_citations.clear();
        result.retrieved_contexts.clear();
        result.free_text_analysis = "é".repeat(400);

        let issue = c.classify(topic, &result);
        assert_eq!(issue.recommendation, REVIEW_RECOMMENDATION);
        assert_eq!(issue.citation_key, "1301");
        assert_eq!(issue.citation_text, "");
        assert_eq!(issue.description.chars().count(), 300);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("filing basis and ownership issues"), "Filing Basis And Ownership Issues");
        assert_eq!(title_case("descriptiveness or GENERICNESS"), "Descriptiveness Or Genericness");
        assert_eq!(title_case("third-party marks"), "Third-Party Marks");
    }
}
