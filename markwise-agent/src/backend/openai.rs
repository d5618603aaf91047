//! Chat-completions backend for OpenAI-compatible servers (Ollama, vLLM,
//! hosted APIs).

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::traits::*;

/// Connection and generation settings for the analysis backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// API base URL, including the `/v1` prefix
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key, if any
    pub api_key_env: Option<String>,
    /// HTTP timeout per request (ms)
    pub request_timeout_ms: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    pub seed: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3.1:8b".to_string(),
            api_key_env: None,
            request_timeout_ms: 60_000,
            max_tokens: 1024,
            temperature: 0.0,
            seed: Some(42),
        }
    }
}

pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    model: String,
    bearer: Option<String>,
}

impl OpenAiBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, LlmError> {
        Self::build(base_url.into(), model.into(), api_key, Duration::from_secs(60))
    }

    /// Build from configuration, reading the API key from the configured
    /// environment variable when it is set.
    pub fn from_config(config: &BackendConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok());

        Self::build(
            config.base_url.clone(),
            config.model.clone(),
            api_key,
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    fn build(
        base_url: String,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            bearer: api_key.map(|k| format!("Bearer {}", k)),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer {
            Some(bearer) => request.header(header::AUTHORIZATION, bearer),
            None => request,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: TokenUsage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    fn id(&self) -> &str {
        &self.model
    }

    async fn is_available(&self) -> bool {
        self.authorized(self.client.get(self.url("models")))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.user,
        });

        let body = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: request.sampling.max_tokens,
            temperature: request.sampling.temperature,
            seed: request.sampling.seed,
            stream: false,
        };

        let response = self
            .authorized(self.client.post(self.url("chat/completions")))
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs.saturating_mul(1000));
            return Err(LlmError::RateLimited { retry_after_ms });
        }
        if !status.is_success() {
            return Err(LlmError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        let choice = chat
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::MalformedResponse("no choices".to_string()))?;

        debug!(model = %self.model, finish = ?choice.finish_reason, "Chat completion returned");

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            truncated: choice.finish_reason.as_deref() == Some("length"),
            prompt_tokens: chat.usage.prompt_tokens,
            completion_tokens: chat.usage.completion_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer) -> OpenAiBackend {
        OpenAiBackend::new(format!("{}/v1", server.uri()), "llama3.1:8b", None).unwrap()
    }

    #[test]
    fn test_from_config_defaults() {
        let backend = OpenAiBackend::from_config(&BackendConfig::default()).unwrap();
        assert_eq!(backend.id(), "llama3.1:8b");
        assert_eq!(
            backend.url("chat/completions"),
            "http://localhost:11434/v1/chat/completions"
        );
        assert!(backend.bearer.is_none());
    }

    #[tokio::test]
    async fn test_complete_against_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "seed": 42,
                "stream": false,
                "messages": [{"role": "system"}, {"role": "user", "content": "Analyze"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {"content": "ANALYSIS: Low risk.\nCONFIDENCE: 80%"},
                    "finish_reason": "length"
                }],
                "usage": {"prompt_tokens": 120, "completion_tokens": 9}
            })))
            .mount(&server)
            .await;

        let response = backend_for(&server)
            .complete(
                CompletionRequest::user("Analyze")
                    .with_system("You are a trademark examiner")
                    .with_seed(42),
            )
            .await
            .unwrap();

        assert!(response.content.starts_with("ANALYSIS:"));
        assert!(response.truncated);
        assert_eq!(response.total_tokens(), 129);
    }

    #[tokio::test]
    async fn test_bearer_token_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .and(header_eq("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        let keyed =
            OpenAiBackend::new(format!("{}/v1", server.uri()), "m", Some("secret".to_string())).unwrap();
        assert!(keyed.is_available().await);
        assert!(!backend_for(&server).is_available().await);
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "2"))
            .mount(&server)
            .await;

        let result = backend_for(&server).complete(CompletionRequest::user("Analyze")).await;

        assert!(matches!(
            result,
            Err(LlmError::RateLimited { retry_after_ms: Some(2000) })
        ));
    }

    #[tokio::test]
    async fn test_oversized_retry_after_saturates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "18446744073709552"))
            .mount(&server)
            .await;

        let result = backend_for(&server).complete(CompletionRequest::user("Analyze")).await;

        assert!(matches!(
            result,
            Err(LlmError::RateLimited { retry_after_ms: Some(u64::MAX) })
        ));
    }

    #[tokio::test]
    async fn test_server_error_and_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let result = backend_for(&server).complete(CompletionRequest::user("Analyze")).await;
        assert!(matches!(result, Err(LlmError::MalformedResponse(_))));

        let missing = OpenAiBackend::new(format!("{}/nope", server.uri()), "m", None).unwrap();
        let result = missing.complete(CompletionRequest::user("Analyze")).await;
        assert!(matches!(result, Err(LlmError::Http { status: 404, .. })));
    }
}
