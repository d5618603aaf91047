//! Markwise - Trademark Registrability Risk Assessment
//!
//! Scores how likely a mark is to be refused and how hard refusals would be
//! to overcome, grounded in examination guidance:
//!
//! - **Grounded analysis**: retrieval-augmented topic analyses with citation
//!   validation and confidence penalties
//! - **Issue classification**: ordered rule table from topics to issues
//! - **Risk framework**: four weighted, confidence-rated dimensions
//! - **Human review escalation**: low-confidence results are flagged
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Assessor                          │
//! │                                                          │
//! │  ┌──────────────┐  ┌────────────┐  ┌───────────────────┐ │
//! │  │AnalysisServ- │──│ Issue      │──│ RiskFramework     │ │
//! │  │ice (agent)   │  │ Classifier │  │ (4 dimensions)    │ │
//! │  └──────────────┘  └────────────┘  └─────────┬─────────┘ │
//! │                                              │           │
//! │                                  ┌───────────▼─────────┐ │
//! │                                  │ Recommendations     │ │
//! │                                  └─────────────────────┘ │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod assessor;
pub mod classifier;
pub mod config;
pub mod estimate;
pub mod framework;
pub mod recommend;
pub mod report;
pub mod types;

// Re-export main types
pub use assessor::{AssessmentRequest, Assessor};
pub use classifier::IssueClassifier;
pub use config::{AssessorConfig, FrameworkConfig};
pub use estimate::{CostRange, EstimateConfig, MonthRange};
pub use framework::RiskFramework;
pub use recommend::{RecommendationGenerator, Recommendations};
pub use report::{parse_report, ParsedReport, ReportParser};
pub use types::*;
