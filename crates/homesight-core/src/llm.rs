//! Abstract LLM runtime backend.
//!
//! The diagnostic core never talks to a concrete model provider; it
//! consumes this contract. Backends are registered at runtime behind
//! `Arc<dyn LlmRuntime>` so tests can plug in canned responses.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::message::Message;

/// LLM backend identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackendId(String);

impl BackendId {
    /// Create a new backend ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Common backend IDs.
    pub const MOCK: &'static str = "mock";
}

impl AsRef<str> for BackendId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Generation parameters.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Temperature (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Top-p sampling (0.0 - 1.0)
    pub top_p: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<usize>,
    /// Stop sequences
    pub stop: Option<Vec<String>>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: Some(0.7),
            top_p: Some(0.9),
            max_tokens: None,
            stop: None,
        }
    }
}

/// Tool definition for LLM function calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// Parameters as JSON Schema
    pub parameters: serde_json::Value,
}

/// Tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name
    pub name: String,
    /// Arguments as a JSON object
    pub arguments: serde_json::Value,
}

/// LLM input.
#[derive(Debug, Clone)]
pub struct LlmInput {
    /// Messages for the conversation
    pub messages: Vec<Message>,
    /// Generation parameters
    pub params: GenerationParams,
    /// Model identifier (backend-specific)
    pub model: Option<String>,
    /// Tool definitions for function calling (optional)
    pub tools: Option<Vec<ToolDefinition>>,
}

impl LlmInput {
    /// Create a new input with a single user message.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(content)],
            params: GenerationParams::default(),
            model: None,
            tools: None,
        }
    }

    /// Add a message to the conversation.
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Set generation parameters.
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Set tool definitions for function calling.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = Some(tools);
        self
    }
}

/// Why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop.
    Stop,
    /// Hit the token limit.
    Length,
    /// Model requested tool calls.
    ToolCalls,
    /// Backend-specific other reason.
    Other,
}

/// LLM output.
#[derive(Debug, Clone)]
pub struct LlmOutput {
    /// Generated text.
    pub text: String,
    /// Tool calls requested by the model, if any.
    pub tool_calls: Vec<ToolCall>,
    /// Why generation finished.
    pub finish_reason: FinishReason,
}

impl LlmOutput {
    /// Plain text output with a natural stop.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
            finish_reason: FinishReason::Stop,
        }
    }
}

/// Abstract LLM runtime.
#[async_trait]
pub trait LlmRuntime: Send + Sync {
    /// Backend identifier.
    fn backend_id(&self) -> BackendId;

    /// Model name served by this backend.
    fn model_name(&self) -> &str;

    /// Run one generation.
    async fn generate(&self, input: LlmInput) -> Result<LlmOutput>;
}

/// Scripted backend for tests: replays a queue of canned responses and
/// counts calls. Once the queue is exhausted the last response repeats.
pub struct MockLlm {
    responses: parking_lot::Mutex<VecDeque<Result<LlmOutput>>>,
    last: parking_lot::Mutex<Option<Result<LlmOutput>>>,
    calls: AtomicUsize,
}

impl MockLlm {
    /// Backend that always returns the given text.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::with_responses(vec![Ok(LlmOutput::text(text))])
    }

    /// Backend that always fails with an LLM error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_responses(vec![Err(Error::llm(message))])
    }

    /// Backend that replays the given responses in order.
    pub fn with_responses(responses: Vec<Result<LlmOutput>>) -> Self {
        Self {
            responses: parking_lot::Mutex::new(responses.into()),
            last: parking_lot::Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of generate calls observed.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmRuntime for MockLlm {
    fn backend_id(&self) -> BackendId {
        BackendId::new(BackendId::MOCK)
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, _input: LlmInput) -> Result<LlmOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.responses.lock().pop_front();
        match next {
            Some(response) => {
                *self.last.lock() = Some(response.clone());
                response
            }
            None => self
                .last
                .lock()
                .clone()
                .unwrap_or_else(|| Ok(LlmOutput::text(""))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_llm_replays_responses() {
        let llm = MockLlm::with_responses(vec![
            Ok(LlmOutput::text("first")),
            Ok(LlmOutput::text("second")),
        ]);

        let out = llm.generate(LlmInput::new("hi")).await.unwrap();
        assert_eq!(out.text, "first");
        let out = llm.generate(LlmInput::new("hi")).await.unwrap();
        assert_eq!(out.text, "second");
        // Queue exhausted: last response repeats.
        let out = llm.generate(LlmInput::new("hi")).await.unwrap();
        assert_eq!(out.text, "second");
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_llm_failure() {
        let llm = MockLlm::failing("backend down");
        let err = llm.generate(LlmInput::new("hi")).await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
    }

    #[test]
    fn test_input_builder() {
        let input = LlmInput::new("question").with_message(Message::assistant("answer"));
        assert_eq!(input.messages.len(), 2);
    }
}
