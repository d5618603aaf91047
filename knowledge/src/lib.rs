//! Examination Guidance Knowledge Base for Markwise
//!
//! Holds the numbered reference sections that trademark analyses cite,
//! and answers two questions about them:
//!
//! - **Which sections are relevant to a query?** via the [`Retriever`] trait
//! - **Does a claimed citation exist?** via the [`CitationRegistry`]
//!
//! # Key Components
//!
//! - [`KnowledgeStore`]: Read-only sections plus the registry derived from them
//! - [`CitationRegistry`]: Normalized citation key membership and validation
//! - [`KeywordRetriever`]: Deterministic TF-IDF retrieval over a store
//! - [`CachedRetriever`]: DashMap-backed memoization for any retriever
//!
//! # Example
//!
//! ```ignore
//! use knowledge::{KeywordRetriever, KnowledgeStore, Retriever};
//!
//! let store = Arc::new(KnowledgeStore::from_file("data/tmep_sections.json")?);
//! let retriever = KeywordRetriever::new(store.clone());
//! let contexts = retriever.retrieve("likelihood of confusion", 5).await?;
//! let check = store.registry().validate(&["TMEP §1207", "9999"]);
//! ```

pub mod cache;
pub mod citation;
pub mod retriever;
pub mod store;
pub mod types;

// Re-export main types
pub use cache::CachedRetriever;
pub use citation::{normalize_citation, CitationEntry, CitationRegistry, CitationValidation};
pub use retriever::{KeywordRetriever, RetrievalError, Retriever};
pub use store::{compute_hash, KnowledgeError, KnowledgeStore};
pub use types::*;
