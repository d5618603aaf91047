//! The `LlmBackend` seam between the analyzer and an inference server.
//!
//! Analyses are single-turn: one examiner system prompt, one user prompt
//! carrying the query and retrieved sections, one reply.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Non-success HTTP status other than 429
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Model name, used in logs.
    fn id(&self) -> &str;

    async fn is_available(&self) -> bool;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// Sampling controls sent with every analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sampling {
    pub max_tokens: Option<u32>,
    /// Clamped to 0.0-2.0
    pub temperature: Option<f32>,
    /// Honored by servers that support reproducible sampling
    pub seed: Option<u64>,
}

/// One analysis prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub user: String,
    pub sampling: Sampling,
}

impl CompletionRequest {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            user: content.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, prompt: impl Into<String>) -> Self {
        self.system = Some(prompt.into());
        self
    }

    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = Sampling {
            temperature: sampling.temperature.map(|t| t.clamp(0.0, 2.0)),
            ..sampling
        };
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.sampling.seed = Some(seed);
        self
    }
}

/// Model reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    /// Generation stopped at the token limit
    pub truncated: bool,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl CompletionResponse {
    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}
