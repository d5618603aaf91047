//! In-memory knowledge store.
//!
//! Holds the loaded guidance sections in load order together with the
//! citation registry derived from them. The store is read-only after
//! construction and is shared behind an `Arc`.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::citation::{normalize_citation, CitationRegistry};
use crate::types::{KnowledgeSection, SectionCategory, SectionSummary};

/// Error types for knowledge base operations.
#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Section data is unusable
    #[error("Invalid section: {0}")]
    InvalidSection(String),

    /// Nothing to load
    #[error("Knowledge base contains no sections")]
    Empty,
}

/// Section record as found in knowledge files.
#[derive(Debug, Deserialize)]
struct RawSection {
    #[serde(default, alias = "section_id")]
    id: Option<String>,
    #[serde(default, alias = "section")]
    section_number: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    category: SectionCategory,
    #[serde(default)]
    content: String,
    #[serde(default)]
    related_sections: Vec<String>,
    #[serde(default)]
    subsections: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    parent_section: Option<String>,
}

impl RawSection {
    fn into_section(self, fallback_number: Option<&str>) -> Result<KnowledgeSection, KnowledgeError> {
        let section_number = self
            .section_number
            .or_else(|| fallback_number.map(str::to_string))
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                KnowledgeError::InvalidSection(format!(
                    "missing section number (title: {:?})",
                    self.title
                ))
            })?;

        let mut related = self.related_sections;
        related.extend(self.subsections.into_keys());
        related.extend(self.parent_section);
        let mut seen = HashSet::new();
        related.retain(|number| seen.insert(number.clone()));

        Ok(KnowledgeSection {
            id: self.id.unwrap_or_else(|| section_number.clone()),
            section_number,
            title: self.title,
            category: self.category,
            content: self.content,
            related_sections: related,
        })
    }
}

/// Either a list of sections or a map keyed by section number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SectionFile {
    List(Vec<RawSection>),
    Map(BTreeMap<String, RawSection>),
}

/// Read-only store of guidance sections and their citation registry.
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    sections: Vec<KnowledgeSection>,
    by_key: HashMap<String, usize>,
    registry: CitationRegistry,
}

impl KnowledgeStore {
    /// Build a store from sections in load order.
    ///
    /// The first occurrence of a section number wins; later duplicates are
    /// skipped.
    pub fn new(sections: Vec<KnowledgeSection>) -> Result<Self, KnowledgeError> {
        let mut kept = Vec::with_capacity(sections.len());
        let mut by_key = HashMap::new();

        for section in sections {
            let key = normalize_citation(&section.section_number);
            if key.is_empty() {
                return Err(KnowledgeError::InvalidSection(format!(
                    "section number {:?} is empty after normalization",
                    section.section_number
                )));
            }
            if by_key.contains_key(&key) {
                warn!(section = %key, "Skipping duplicate section");
                continue;
            }
            by_key.insert(key, kept.len());
            kept.push(section);
        }

        if kept.is_empty() {
            return Err(KnowledgeError::Empty);
        }

        let registry = CitationRegistry::from_sections(&kept);
        debug!(sections = kept.len(), "Built knowledge store");

        Ok(Self {
            sections: kept,
            by_key,
            registry,
        })
    }

    /// Parse a knowledge file body.
    pub fn from_json(json: &str) -> Result<Self, KnowledgeError> {
        let sections = match serde_json::from_str::<SectionFile>(json)? {
            SectionFile::List(raw) => raw
                .into_iter()
                .map(|r| r.into_section(None))
                .collect::<Result<Vec<_>, _>>()?,
            SectionFile::Map(raw) => raw
                .into_iter()
                .map(|(number, r)| r.into_section(Some(&number)))
                .collect::<Result<Vec<_>, _>>()?,
        };
        Self::new(sections)
    }

    /// Load a knowledge file from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, KnowledgeError> {
        let path = path.as_ref();
        let body = std::fs::read_to_string(path)?;
        let store = Self::from_json(&body)?;
        info!(
            path = %path.display(),
            sections = store.len(),
            "Loaded knowledge base"
        );
        Ok(store)
    }

    /// Merge an external citation map into the registry.
    ///
    /// Store sections are re-registered afterwards, so every section number
    /// stays a valid key whatever the map says.
    pub fn with_citation_map(mut self, external: CitationRegistry) -> Self {
        let mut registry = external;
        for section in &self.sections {
            registry.register_section(section);
        }
        self.registry = registry;
        self
    }

    /// All sections in load order.
    pub fn sections(&self) -> &[KnowledgeSection] {
        &self.sections
    }

    /// Get a section by number in any accepted citation spelling.
    pub fn get(&self, section_number: &str) -> Option<&KnowledgeSection> {
        self.by_key
            .get(&normalize_citation(section_number))
            .map(|&i| &self.sections[i])
    }

    /// Title and category for a citation key, if registered.
    pub fn lookup(&self, citation_key: &str) -> Option<SectionSummary> {
        self.registry
            .get(citation_key)
            .filter(|e| e.valid)
            .map(|e| SectionSummary {
                title: e.title.clone(),
                category: e.category,
            })
    }

    /// The citation registry.
    pub fn registry(&self) -> &CitationRegistry {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Number of sections per category.
    pub fn category_counts(&self) -> BTreeMap<SectionCategory, usize> {
        let mut counts = BTreeMap::new();
        for section in &self.sections {
            *counts.entry(section.category).or_insert(0) += 1;
        }
        counts
    }

    /// SHA-256 of the canonical JSON of all sections, hex encoded.
    ///
    /// Two stores loaded from equivalent data share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(&self.sections).unwrap_or_default();
        compute_hash(json.as_bytes())
    }
}

/// Compute a hex-encoded SHA-256 hash.
pub fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}
