//! Inference backends behind the analyzer: an OpenAI-compatible HTTP
//! client and a scripted mock.

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::MockBackend;
pub use openai::{BackendConfig, OpenAiBackend};
pub use traits::{CompletionRequest, CompletionResponse, LlmBackend, LlmError, Sampling};
