//! Anthropic messages-API provider implementing the [`Provider`] trait.
//!
//! Single-turn, non-streaming: one user message in, the first text block
//! out. HTTP status classes map onto the closed [`ProviderError`] taxonomy
//! so every caller switches on typed outcomes, never on response text.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::provider::{Provider, ProviderError, ProviderResult};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// API version header value.
const API_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic provider.
#[derive(Clone, Debug)]
pub struct AnthropicConfig {
    /// API key sent as `x-api-key`.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Base URL override (tests, proxies). `None` uses the public API.
    pub base_url: Option<String>,
    /// `max_tokens` for the completion.
    pub max_output_tokens: u32,
}

/// Anthropic completion provider.
pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<MessageParam<'a>>,
}

#[derive(Serialize)]
struct MessageParam<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Default)]
struct ApiErrorBody {
    #[serde(default)]
    error: ApiErrorDetail,
}

#[derive(Deserialize, Default)]
struct ApiErrorDetail {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    message: String,
}

impl AnthropicProvider {
    /// Create a provider with its own HTTP client.
    pub fn new(config: AnthropicConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Create a provider sharing an existing HTTP client.
    pub fn with_client(config: AnthropicConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn build_headers(&self) -> ProviderResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        let _ = headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.config.api_key)
                .map_err(|e| ProviderError::Fatal(format!("invalid API key header: {e}")))?,
        );
        Ok(headers)
    }

    fn classify_status(
        status: StatusCode,
        retry_after: Option<Duration>,
        body: &str,
    ) -> ProviderError {
        let detail: ApiErrorDetail = serde_json::from_str::<ApiErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_default();
        let message = if detail.message.is_empty() {
            format!("HTTP {status}")
        } else {
            detail.message
        };

        match status {
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
                retry_after,
                message,
            },
            StatusCode::PAYLOAD_TOO_LARGE => ProviderError::InputTooLarge(message),
            StatusCode::BAD_REQUEST if is_token_limit(&detail.kind, &message) => {
                ProviderError::InputTooLarge(message)
            }
            s if s.is_server_error() => ProviderError::Transient(message),
            _ => ProviderError::Fatal(message),
        }
    }
}

/// Whether a 400 body is the provider's too-many-tokens rejection.
fn is_token_limit(kind: &str, message: &str) -> bool {
    let m = message.to_ascii_lowercase();
    kind == "invalid_request_error"
        && (m.contains("prompt is too long") || m.contains("max_tokens") && m.contains("exceed")
            || m.contains("token") && m.contains("limit"))
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl Provider for AnthropicProvider {
    #[instrument(skip_all, fields(model = %self.config.model, prompt_bytes = prompt.len()))]
    async fn complete(&self, prompt: &str) -> ProviderResult<String> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_output_tokens,
            messages: vec![MessageParam {
                role: "user",
                content: prompt,
            }],
        };

        let base_url = self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let url = format!("{base_url}/v1/messages");

        let response = self
            .client
            .post(&url)
            .headers(self.build_headers()?)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, retry_after, &body));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transient(format!("malformed response body: {e}")))?;

        let text: String = parsed
            .content
            .iter()
            .filter(|b| b.kind == "text")
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        if text.is_empty() {
            return Err(ProviderError::Transient(
                "response contained no text blocks".into(),
            ));
        }
        debug!(response_bytes = text.len(), "completion received");
        Ok(text)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
