//! Scripted backend for tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use super::traits::*;

/// A canned reply chosen when the user prompt contains `needle`.
struct Route {
    needle: String,
    reply: String,
}

/// Backend that answers from a script instead of a model.
///
/// Routes are tried in registration order against the user prompt; the
/// fallback reply answers everything else.
pub struct MockBackend {
    model_id: String,
    available: AtomicBool,
    fallback: String,
    routes: Vec<Route>,
    latency: Option<Duration>,
    calls: AtomicU32,
}

impl MockBackend {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            available: AtomicBool::new(true),
            fallback: "ANALYSIS: No specific concerns.\nCONFIDENCE: 50%\nCITATIONS_USED: none"
                .to_string(),
            routes: Vec::new(),
            latency: None,
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_response(mut self, reply: impl Into<String>) -> Self {
        self.fallback = reply.into();
        self
    }

    /// Reply with `reply` when the user prompt contains `needle`.
    pub fn with_response_for(mut self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.routes.push(Route {
            needle: needle.into(),
            reply: reply.into(),
        });
        self
    }

    pub fn with_available(self, available: bool) -> Self {
        self.available.store(available, Ordering::SeqCst);
        self
    }

    /// Sleep before every reply.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Completions attempted so far, including refused ones.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn reply_to(&self, user: &str) -> &str {
        self.routes
            .iter()
            .find(|route| user.contains(route.needle.as_str()))
            .map_or(self.fallback.as_str(), |route| route.reply.as_str())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new("mock-model")
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    fn id(&self) -> &str {
        &self.model_id
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.available.load(Ordering::SeqCst) {
            return Err(LlmError::Unavailable(format!("{} is offline", self.model_id)));
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let content = self.reply_to(&request.user).to_string();
        let prompt_len = request.system.as_deref().map_or(0, str::len) + request.user.len();

        // ~4 bytes per token
        Ok(CompletionResponse {
            truncated: false,
            prompt_tokens: (prompt_len / 4) as u32,
            completion_tokens: (content.len() / 4) as u32,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fallback_reply() {
        let backend = MockBackend::new("test-model").with_response("ANALYSIS: fine");

        assert!(backend.is_available().await);
        let response = backend.complete(CompletionRequest::user("Hi")).await.unwrap();

        assert_eq!(response.content, "ANALYSIS: fine");
        assert_eq!(backend.call_count(), 1);
    }

    #[test]
    fn test_routes_by_user_prompt() {
        let backend = MockBackend::default()
            .with_response("fallback")
            .with_response_for("specimen", "specimen reply");

        let routed =
            tokio_test::block_on(backend.complete(CompletionRequest::user("Analyze specimen requirements")))
                .unwrap();
        let other = tokio_test::block_on(backend.complete(CompletionRequest::user("Analyze ownership")))
            .unwrap();

        assert_eq!(routed.content, "specimen reply");
        assert_eq!(other.content, "fallback");
    }

    #[tokio::test]
    async fn test_offline_refuses_but_counts() {
        let backend = MockBackend::new("test-model").with_available(false);

        assert!(!backend.is_available().await);
        let result = backend.complete(CompletionRequest::user("Hi")).await;

        assert!(matches!(result, Err(LlmError::Unavailable(_))));
        assert_eq!(backend.call_count(), 1);
    }
}
