//! Core types for the knowledge base.
//!
//! With the `typescript` feature enabled, these types can be exported to
//! TypeScript using ts-rs.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Category of an examination guidance section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum SectionCategory {
    /// Substantive grounds for refusal (confusion, descriptiveness, ...)
    Substantive,
    /// Filing and prosecution procedure
    Procedural,
    /// Anything else
    General,
}

impl SectionCategory {
    /// Get string representation for prompts
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Substantive => "substantive",
            Self::Procedural => "procedural",
            Self::General => "general",
        }
    }

    /// All categories in declaration order
    pub fn all() -> [Self; 3] {
        [Self::Substantive, Self::Procedural, Self::General]
    }
}

impl Default for SectionCategory {
    fn default() -> Self {
        Self::General
    }
}

/// A labeled unit of examination guidance.
///
/// Sections are immutable once loaded into a [`crate::KnowledgeStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct KnowledgeSection {
    /// Stable identifier
    pub id: String,
    /// Section number as cited, e.g. `1207.01`
    pub section_number: String,
    /// Section title
    pub title: String,
    /// Category
    pub category: SectionCategory,
    /// Full guidance text
    pub content: String,
    /// Section numbers this section points to
    pub related_sections: Vec<String>,
}

impl KnowledgeSection {
    /// Create a section whose id is its section number.
    pub fn new(
        section_number: impl Into<String>,
        title: impl Into<String>,
        category: SectionCategory,
        content: impl Into<String>,
    ) -> Self {
        let section_number = section_number.into();
        Self {
            id: section_number.clone(),
            section_number,
            title: title.into(),
            category,
            content: content.into(),
            related_sections: Vec::new(),
        }
    }

    /// Add related section numbers.
    pub fn with_related(mut self, related: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.related_sections.extend(related.into_iter().map(Into::into));
        self
    }

    /// Display form of the citation, e.g. `TMEP §1207`.
    pub fn citation(&self) -> String {
        format!("TMEP §{}", self.section_number)
    }
}

/// Title and category of a section, as returned by lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct SectionSummary {
    pub title: String,
    pub category: SectionCategory,
}

/// A section returned by a retriever for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct RetrievedContext {
    /// Id of the source section
    pub section_id: String,
    /// Section number
    pub section_number: String,
    /// Section title
    pub title: String,
    /// Section text
    pub content: String,
    /// Section category
    pub category: SectionCategory,
    /// Relevance in [0, 1], higher is more relevant
    pub relevance_score: f64,
    /// Normalized citation key
    pub citation_key: String,
}

impl RetrievedContext {
    /// Build a context from a section and a relevance score.
    pub fn from_section(section: &KnowledgeSection, relevance_score: f64) -> Self {
        Self {
            section_id: section.id.clone(),
            section_number: section.section_number.clone(),
            title: section.title.clone(),
            content: section.content.clone(),
            category: section.category,
            relevance_score: relevance_score.clamp(0.0, 1.0),
            citation_key: crate::citation::normalize_citation(&section.section_number),
        }
    }

    /// Display form of the citation, e.g. `TMEP §1207`.
    pub fn citation(&self) -> String {
        format!("TMEP §{}", self.citation_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serializes_lowercase() {
        let json = serde_json::to_string(&SectionCategory::Substantive).unwrap();
        assert_eq!(json, "\"substantive\"");
        assert_eq!(SectionCategory::default(), SectionCategory::General);
    }

    #[test]
    fn test_context_from_section() {
        let section = KnowledgeSection::new(
            "1207.01",
            "Relatedness of Goods and Services",
            SectionCategory::Substantive,
            "Goods need not be identical.",
        )
        .with_related(["1207"]);

        let context = RetrievedContext::from_section(&section, 1.7);
        assert_eq!(context.citation_key, "1207.01");
        assert_eq!(context.citation(), "TMEP §1207.01");
        assert_eq!(context.relevance_score, 1.0);
        assert_eq!(section.related_sections, vec!["1207".to_string()]);
    }
}
