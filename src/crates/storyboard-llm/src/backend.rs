//! Chat backends.
//!
//! A [`ChatBackend`] turns chat messages into text, blocking or streamed.
//! [`backend_for`] picks the client that speaks the configured provider's
//! wire format. The HTTP plumbing shared by every client lives here too.

use crate::client::OpenAiClient;
use crate::config::LlmConfig;
use crate::error::{LlmError, Result};
use crate::gemini::GeminiClient;
use crate::prompts::ChatMessage;
use crate::provider::WireFormat;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use storyboard_workflow::FragmentStream;
use tracing::warn;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Provider-reported model in use
    fn model(&self) -> &str;

    /// Non-streaming completion returning the full text.
    async fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String>;

    /// Streaming completion decoded from Server-Sent Events.
    ///
    /// Only opening the stream is retried; failures mid-stream surface as
    /// transport errors on the returned stream.
    async fn complete_stream(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<FragmentStream>;
}

/// Build the client for `config.provider`
pub fn backend_for(config: LlmConfig) -> Result<Arc<dyn ChatBackend>> {
    Ok(match config.provider.wire_format() {
        WireFormat::ChatCompletions => Arc::new(OpenAiClient::new(config)?),
        WireFormat::Gemini => Arc::new(GeminiClient::new(config)?),
    })
}

pub(crate) fn http_client(config: &LlmConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .build()
        .map_err(|e| LlmError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Send a prepared request and turn non-success statuses into errors
pub(crate) async fn send_checked(
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<reqwest::Response> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            LlmError::Timeout(timeout)
        } else {
            LlmError::Http(e)
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::from_status(status.as_u16(), body));
    }
    Ok(response)
}

/// Run `operation`, retrying retryable failures with exponential backoff.
pub(crate) async fn with_retries<T, F, Fut>(max_retries: u32, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                let delay = RETRY_BASE_DELAY * 2u32.saturating_pow(attempt);
                warn!(attempt = attempt + 1, error = %e, delay_ms = delay.as_millis() as u64, "Retrying LLM request");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
