//! Citation normalization, registry and validation.
//!
//! The registry maps a normalized citation key (`1207.01`) to the title and
//! category of the section it names. It is only used for membership tests:
//! a claimed citation is valid exactly when its normalized key is present
//! and marked valid.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::store::KnowledgeError;
use crate::types::{KnowledgeSection, SectionCategory};

/// Leading labels stripped during normalization, longest first.
const LABELS: [&str; 4] = ["tmep", "section", "sec.", "sec"];

/// Characters that never belong to a citation key.
const MARKERS: [char; 8] = ['§', '¶', '[', ']', '(', ')', '"', '\''];

/// Normalize a citation to its registry key.
///
/// `"TMEP §1207.01"`, `"Section 1207.01"` and `"§ 1207.01."` all normalize to
/// `"1207.01"`. Interior dots are kept.
pub fn normalize_citation(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if MARKERS.contains(&c) { ' ' } else { c })
        .collect();

    let mut rest = cleaned.trim();
    loop {
        let stripped = strip_label(rest).trim_start_matches(|c: char| c.is_whitespace() || c == ':');
        if stripped.len() == rest.len() {
            break;
        }
        rest = stripped;
    }

    rest.trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':') || c.is_whitespace())
        .trim()
        .to_string()
}

fn strip_label(s: &str) -> &str {
    for label in LABELS {
        let Some(head) = s.get(..label.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(label) {
            continue;
        }
        let tail = &s[label.len()..];
        // "Sectional" is not a label
        if tail.chars().next().map_or(true, |c| !c.is_alphabetic()) {
            return tail;
        }
    }
    s
}

/// Registry entry for one citation key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationEntry {
    pub title: String,
    #[serde(default)]
    pub category: SectionCategory,
    #[serde(default = "default_valid")]
    pub valid: bool,
}

fn default_valid() -> bool {
    true
}

/// External citation map record, e.g. `"TMEP §1207": {"section": "1207", ...}`.
#[derive(Debug, Deserialize)]
struct RawCitationEntry {
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    category: SectionCategory,
    #[serde(default = "default_valid")]
    valid: bool,
}

/// Outcome of validating a list of claimed citations.
///
/// Both lists hold the citations exactly as claimed, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationValidation {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
}

impl CitationValidation {
    /// Whether every claimed citation resolved.
    pub fn all_valid(&self) -> bool {
        self.invalid.is_empty()
    }
}

/// Normalized citation key -> entry.
#[derive(Debug, Clone, Default)]
pub struct CitationRegistry {
    entries: HashMap<String, CitationEntry>,
}

impl CitationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry containing every section's number.
    pub fn from_sections<'a>(sections: impl IntoIterator<Item = &'a KnowledgeSection>) -> Self {
        let mut registry = Self::new();
        for section in sections {
            registry.register_section(section);
        }
        registry
    }

    /// Parse an external citation map keyed by raw citation.
    pub fn from_json(json: &str) -> Result<Self, KnowledgeError> {
        let raw: HashMap<String, RawCitationEntry> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for (citation, entry) in raw {
            let key = entry.section.as_deref().unwrap_or(&citation);
            registry.insert(
                key,
                CitationEntry {
                    title: entry.title,
                    category: entry.category,
                    valid: entry.valid,
                },
            );
        }
        Ok(registry)
    }

    /// Insert an entry under the normalized form of `citation`.
    pub fn insert(&mut self, citation: &str, entry: CitationEntry) {
        let key = normalize_citation(citation);
        if key.is_empty() {
            tracing::warn!(citation = %citation, "Ignoring citation that normalizes to nothing");
            return;
        }
        self.entries.insert(key, entry);
    }

    /// Register a section as a valid citation target.
    pub fn register_section(&mut self, section: &KnowledgeSection) {
        self.insert(
            &section.section_number,
            CitationEntry {
                title: section.title.clone(),
                category: section.category,
                valid: true,
            },
        );
    }

    /// Copy every entry of `other` into this registry, replacing collisions.
    pub fn merge(&mut self, other: CitationRegistry) {
        self.entries.extend(other.entries);
    }

    /// Look up the entry for a citation in any accepted spelling.
    pub fn get(&self, citation: &str) -> Option<&CitationEntry> {
        self.entries.get(&normalize_citation(citation))
    }

    /// Whether a citation resolves to a valid entry.
    pub fn is_valid(&self, citation: &str) -> bool {
        self.get(citation).map_or(false, |e| e.valid)
    }

    /// Partition claimed citations into valid and invalid.
    pub fn validate<S: AsRef<str>>(&self, claimed: &[S]) -> CitationValidation {
        let mut result = CitationValidation::default();
        for citation in claimed {
            let citation = citation.as_ref();
            if self.is_valid(citation) {
                result.valid.push(citation.to_string());
            } else {
                result.invalid.push(citation.to_string());
            }
        }
        result
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a normalized key is present, valid or not.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CitationRegistry {
        let sections = vec![
            KnowledgeSection::new("1207", "Likelihood of Confusion", SectionCategory::Substantive, ""),
            KnowledgeSection::new("1207.01", "Relatedness", SectionCategory::Substantive, ""),
            KnowledgeSection::new("904", "Specimens", SectionCategory::Procedural, ""),
        ];
        CitationRegistry::from_sections(&sections)
    }

    #[test]
    fn test_normalize_spellings() {
        assert_eq!(normalize_citation("TMEP §1207.01"), "1207.01");
        assert_eq!(normalize_citation("tmep § 1207"), "1207");
        assert_eq!(normalize_citation("Section 904"), "904");
        assert_eq!(normalize_citation("Sec. 904,"), "904");
        assert_eq!(normalize_citation("  §1209.  "), "1209");
        assert_eq!(normalize_citation("[TMEP 1207]"), "1207");
        assert_eq!(normalize_citation("9999"), "9999");
        assert_eq!(normalize_citation(""), "");
    }

    #[test]
    fn test_normalize_keeps_words_that_start_like_labels() {
        assert_eq!(normalize_citation("Sectional analysis"), "Sectional analysis");
    }

    #[test]
    fn test_validate_partitions_in_order() {
        let registry = registry();
        let claimed = vec!["TMEP §1207", "9999", "Section 904", "TMEP §1207.02"];
        let result = registry.validate(&claimed);

        assert_eq!(result.valid, vec!["TMEP §1207", "Section 904"]);
        assert_eq!(result.invalid, vec!["9999", "TMEP §1207.02"]);
        assert!(!result.all_valid());
    }

    #[test]
    fn test_validate_unknown_citation() {
        let result = registry().validate(&["9999"]);
        assert!(result.valid.is_empty());
        assert_eq!(result.invalid, vec!["9999".to_string()]);
    }

    #[test]
    fn test_explicitly_invalid_entry() {
        let mut registry = registry();
        registry.insert(
            "TMEP §1299",
            CitationEntry {
                title: "Withdrawn".to_string(),
                category: SectionCategory::General,
                valid: false,
            },
        );

        assert!(registry.contains_key("1299"));
        assert!(!registry.is_valid("1299"));
    }

    #[test]
    fn test_from_json_citation_map() {
        let json = r#"{
            "TMEP §1207": {"section": "1207", "title": "Likelihood of Confusion", "valid": true},
            "TMEP §1210": {"title": "Geographic Marks"}
        }"#;
        let registry = CitationRegistry::from_json(json).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.is_valid("1207"));
        assert!(registry.is_valid("Section 1210"));
        assert_eq!(registry.get("1210").unwrap().title, "Geographic Marks");
    }
}
