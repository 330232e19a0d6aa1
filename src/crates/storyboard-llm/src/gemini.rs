//! Google Gemini client.
//!
//! Speaks the `generateContent` protocol: the API key goes in the query
//! string, messages become `contents` with `user`/`model` roles, and the
//! reply text is `candidates[0].content.parts[*].text`. Gemini has no
//! system role, so system messages are sent as a leading user message.
//!
//! # Example
//!
//! ```rust,ignore
//! use storyboard_llm::{ChatBackend, ChatMessage, GeminiClient, LlmConfig, Provider};
//!
//! let client = GeminiClient::new(LlmConfig::for_provider(Provider::Gemini, api_key))?;
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

/// Google Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    config: LlmConfig,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        config.validate()?;
        let client = http_client(&config)?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// `{base}/models/{model}:{method}`
    fn url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.effective_base_url(),
            self.config.effective_model(),
            method
        )
    }

    fn request_body(&self, messages: &[ChatMessage], max_tokens: u32) -> GeminiRequest {
        GeminiRequest {
            contents: convert_messages(messages),
            generation_config: GeminiGenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: max_tokens.min(self.config.max_tokens),
            },
        }
    }

    async fn send(&self, method: &str, body: &GeminiRequest, sse: bool) -> Result<reqwest::Response> {
        let url = self.url(method);
        debug!(url = %url, stream = sse, "Sending Gemini request");

        let mut request = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())]);
        if sse {
            request = request.query(&[("alt", "sse")]);
        }
        send_checked(request.json(body), self.config.timeout()).await
    }
}

#[async_trait]
impl ChatBackend for GeminiClient {
    fn model(&self) -> &str {
        self.config.effective_model()
    }

    async fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String> {
        let body = self.request_body(messages, max_tokens);
        let body = &body;

        with_retries(self.config.max_retries, move || async move {
            let response = self.send("generateContent", body, false).await?;
            let parsed: GeminiResponse = response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
            parsed.text()
        })
        .await
    }

    async fn complete_stream(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<FragmentStream> {
        let body = self.request_body(messages, max_tokens);
        let body = &body;
        let response = with_retries(self.config.max_retries, move || {
            self.send("streamGenerateContent", body, true)
        })
        .await?;
        debug!("Gemini stream accepted, decoding SSE");
        Ok(decode_stream(response.bytes_stream(), WireFormat::Gemini))
    }
}

/// Map chat messages onto Gemini `contents`
fn convert_messages(messages: &[ChatMessage]) -> Vec<GeminiMessage> {
    let mut system = Vec::new();
    let mut contents = Vec::new();

    for message in messages {
        match message.role.as_str() {
            "system" => system.push(message.content.as_str()),
            "assistant" => contents.push(GeminiMessage::new("model", &message.content)),
            _ => contents.push(GeminiMessage::new("user", &message.content)),
        }
    }

    if !system.is_empty() {
        let instruction = format!("[System] {}", system.join("\n"));
        contents.insert(0, GeminiMessage::new("user", &instruction));
    }
    contents
}

// Gemini wire types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiMessage>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiMessage {
    role: String,
    parts: Vec<GeminiPart>,
}

impl GeminiMessage {
    fn new(role: &str, text: &str) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![GeminiPart {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

impl GeminiResponse {
    fn text(self) -> Result<String> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().map(|part| part.text).collect::<String>())
            .ok_or_else(|| LlmError::InvalidResponse("Response has no candidate content".to_string()))
    }
}
