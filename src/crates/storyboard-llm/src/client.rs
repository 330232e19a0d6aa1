//! OpenAI-compatible chat completions client.
//!
//! Works with any endpoint that speaks the `/chat/completions` protocol
//! (DeepSeek, Kimi, OpenAI, OpenRouter, local servers).
//!
//! # Example
//!
//! ```rust,ignore
//! use storyboard_llm::{ChatBackend, ChatMessage, LlmConfig, OpenAiClient, Provider};
//!
//! let config = LlmConfig::from_env("OPENAI_API_KEY", "https://api.openai.com/v1", "gpt-4o-mini")?
//!     .with_provider(Provider::OpenaiCompatible);
//! let client = OpenAiClient::new(config)?;
//! let text = client.complete(&[ChatMessage::user("Hello!")], 200).await?;
//! ```

use crate::backend::{http_client, send_checked, with_retries, ChatBackend};
use crate::config::LlmConfig;
use crate::error::{LlmError, Result};
use crate::prompts::ChatMessage;
use crate::provider::WireFormat;
use crate::sse::decode_stream;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use storyboard_workflow::FragmentStream;
use tracing::debug;

/// Chat completions API client.
#[derive(Clone)]
pub struct OpenAiClient {
    config: LlmConfig,
    client: Client,
}

impl OpenAiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: LlmConfig) -> Result<Self> {
        config.validate()?;
        let client = http_client(&config)?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Completion endpoint URL.
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.effective_base_url())
    }

    fn request_body<'a>(&'a self, messages: &'a [ChatMessage], max_tokens: u32, stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: self.config.effective_model(),
            messages,
            temperature: self.config.temperature,
            max_tokens: max_tokens.min(self.config.max_tokens),
            stream,
        }
    }

    async fn send(&self, body: &ChatRequest<'_>) -> Result<reqwest::Response> {
        let url = self.endpoint();
        debug!(url = %url, model = %body.model, stream = body.stream, "Sending chat completion request");

        let request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(body);
        send_checked(request, self.config.timeout()).await
    }
}

#[async_trait]
impl ChatBackend for OpenAiClient {
    fn model(&self) -> &str {
        self.config.effective_model()
    }

    /// Reads `choices[0].message.content`.
    async fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String> {
        let body = self.request_body(messages, max_tokens, false);
        let body = &body;

        with_retries(self.config.max_retries, move || async move {
            let response = self.send(body).await?;
            let parsed: ChatResponse = response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| LlmError::InvalidResponse("Response has no message content".to_string()))
        })
        .await
    }

    async fn complete_stream(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<FragmentStream> {
        let body = self.request_body(messages, max_tokens, true);
        let body = &body;
        let response = with_retries(self.config.max_retries, move || self.send(body)).await?;
        debug!("Streaming request accepted, decoding SSE");
        Ok(decode_stream(response.bytes_stream(), WireFormat::ChatCompletions))
    }
}

// Chat completions wire types
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}
