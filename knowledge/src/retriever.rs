//! Retrieval of relevant sections for a free-text query.
//!
//! [`Retriever`] is the seam for any search backend (vector index, remote
//! service). [`KeywordRetriever`] is a deterministic lexical implementation
//! over a [`KnowledgeStore`].

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::store::KnowledgeStore;
use crate::types::RetrievedContext;

/// Error types for retrieval.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// Search backend is not reachable
    #[error("Retriever unavailable: {0}")]
    Unavailable(String),

    /// Query could not be processed
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Returns the top-k sections for a query.
///
/// Implementations must return results ordered by descending relevance,
/// each with a relevance score in [0, 1].
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Identifier for logs.
    fn id(&self) -> &str;

    /// Retrieve at most `k` contexts for `query`.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedContext>, RetrievalError>;
}

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "that", "the", "this", "to", "used", "with", "analyze", "trademark", "issues",
];

/// Lowercase alphanumeric tokens with stop words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// Per-section term statistics.
#[derive(Debug, Clone)]
struct SectionTerms {
    title: HashSet<String>,
    content: HashMap<String, usize>,
}

/// TF-IDF keyword retriever over a knowledge store.
///
/// Score per section is the sum over distinct query terms of
/// `idf * (2 * in_title + ln(1 + tf))`; relevance is `score / (1 + score)`.
/// Sections scoring zero are not returned. Ties keep store order.
pub struct KeywordRetriever {
    store: Arc<KnowledgeStore>,
    terms: Vec<SectionTerms>,
    doc_freq: HashMap<String, usize>,
}

impl KeywordRetriever {
    /// Index every section of the store.
    pub fn new(store: Arc<KnowledgeStore>) -> Self {
        let mut terms = Vec::with_capacity(store.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for section in store.sections() {
            let title: HashSet<String> = tokenize(&section.title).into_iter().collect();
            let mut content: HashMap<String, usize> = HashMap::new();
            for token in tokenize(&section.content) {
                *content.entry(token).or_insert(0) += 1;
            }

            let distinct: HashSet<&String> = title.iter().chain(content.keys()).collect();
            for term in distinct {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }

            terms.push(SectionTerms { title, content });
        }

        Self {
            store,
            terms,
            doc_freq,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<KnowledgeStore> {
        &self.store
    }

    fn idf(&self, term: &str) -> f64 {
        let n = self.terms.len() as f64;
        match self.doc_freq.get(term) {
            Some(&df) if df > 0 => (1.0 + n / df as f64).ln(),
            _ => 0.0,
        }
    }

    fn score(&self, index: usize, query_terms: &[String]) -> f64 {
        let section = &self.terms[index];
        query_terms
            .iter()
            .map(|term| {
                let in_title = if section.title.contains(term) { 2.0 } else { 0.0 };
                let tf = section.content.get(term).copied().unwrap_or(0) as f64;
                self.idf(term) * (in_title + tf.ln_1p())
            })
            .sum()
    }

    /// Rank sections synchronously.
    pub fn search(&self, query: &str, k: usize) -> Vec<RetrievedContext> {
        let mut query_terms = tokenize(query);
        query_terms.sort();
        query_terms.dedup();

        if query_terms.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = (0..self.terms.len())
            .map(|i| (i, self.score(i, &query_terms)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        // Stable sort keeps store order among equal scores
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let sections = self.store.sections();
        scored
            .into_iter()
            .take(k)
            .map(|(i, score)| RetrievedContext::from_section(&sections[i], score / (1.0 + score)))
            .collect()
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    fn id(&self) -> &str {
        "keyword"
    }

    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedContext>, RetrievalError> {
        if query.trim().is_empty() {
            return Err(RetrievalError::InvalidQuery("query is empty".to_string()));
        }

        let results = self.search(query, k);
        tracing::debug!(
            query = %query,
            k,
            returned = results.len(),
            "Keyword retrieval"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KnowledgeSection, SectionCategory};

    fn store() -> Arc<KnowledgeStore> {
        Arc::new(
            KnowledgeStore::new(vec![
                KnowledgeSection::new(
                    "1207",
                    "Likelihood of Confusion",
                    SectionCategory::Substantive,
                    "Confusion is assessed with the du Pont factors: similarity of the marks and relatedness of goods.",
                ),
                KnowledgeSection::new(
                    "1209",
                    "Merely Descriptive Marks",
                    SectionCategory::Substantive,
                    "A mark is merely descriptive if it describes an ingredient, quality or feature of the goods.",
                ),
                KnowledgeSection::new(
                    "904",
                    "Specimens",
                    SectionCategory::Procedural,
                    "A specimen must show the mark as used in commerce on the goods.",
                ),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Analyze likelihood of confusion for trademark 'ACME'"),
            vec!["likelihood", "confusion", "acme"]
        );
    }

    #[tokio::test]
    async fn test_retrieve_orders_by_relevance() {
        let retriever = KeywordRetriever::new(store());
        let results = retriever
            .retrieve("likelihood of confusion with similar marks", 5)
            .await
            .unwrap();

        assert!(!results.is_empty());
        assert_eq!(results[0].citation_key, "1207");
        for pair in results.windows(2) {
            assert!(pair[0].relevance_score >= pair[1].relevance_score);
        }
        for r in &results {
            assert!(r.relevance_score > 0.0 && r.relevance_score <= 1.0);
        }
    }

    #[tokio::test]
    async fn test_retrieve_respects_k() {
        let retriever = KeywordRetriever::new(store());
        let results = retriever.retrieve("goods mark", 2).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_no_match_is_empty() {
        let retriever = KeywordRetriever::new(store());
        let results = retriever.retrieve("zebra xylophone", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let retriever = KeywordRetriever::new(store());
        assert!(retriever.retrieve("   ", 5).await.is_err());
    }
}
