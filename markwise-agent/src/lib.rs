//! Markwise Agent - Grounded Issue Analysis
//!
//! Runs retrieval-augmented analyses of trademark issue topics and decides
//! how far each analysis can be trusted:
//! - Trait-based LLM backends (OpenAI-compatible, mock)
//! - Prompt assembly over retrieved reference sections
//! - Citation validation with per-citation confidence penalties
//! - Degraded results when retrieval or the analyzer is unavailable
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            AnalysisService              │
//! │  (concurrent, order-preserving topics)  │
//! └────────────────┬────────────────────────┘
//!                  │
//!      ┌───────────┼───────────────┐
//!      ▼           ▼               ▼
//! ┌──────────┐ ┌──────────┐ ┌──────────────────┐
//! │Retriever │ │ Analyzer │ │ConfidenceResolver│
//! │(knowledge│ │(LlmBack- │ │ (citation        │
//! │  crate)  │ │  end)    │ │  registry)       │
//! └──────────┘ └──────────┘ └──────────────────┘
//! ```

pub mod analyzer;
pub mod backend;
pub mod prompt;
pub mod resolver;
pub mod service;
pub mod types;

// Re-export main types for convenience
pub use analyzer::{Analyzer, AnalyzerError, AnalyzerOutput, LlmAnalyzer};
pub use backend::traits::{CompletionRequest, CompletionResponse, LlmBackend, LlmError, Sampling};
pub use backend::{BackendConfig, MockBackend, OpenAiBackend};
pub use resolver::{ConfidenceResolver, ResolvedConfidence, ResolverConfig};
pub use service::{AnalysisConfig, AnalysisService};
pub use types::*;
