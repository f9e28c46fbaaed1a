//! HTTP implementation of [`CompletionEndpoint`] for OpenAI-compatible
//! `chat/completions` URLs (Hugging Face router, OpenAI, vLLM, Ollama…).
//!
//! One call = one POST. Status codes are passed through untouched; only a
//! failure to complete the exchange becomes an error.

use std::time::Duration;

use async_trait::async_trait;
use codeweaver_config::ModelConfig;
use codeweaver_core::error::ProviderError;
use codeweaver_core::provider::{CompletionEndpoint, CompletionRequest, EndpointReply};
use tracing::{debug, trace, warn};

/// A chat-completions endpoint reached over HTTPS with bearer auth.
pub struct HttpEndpoint {
    name: String,
    url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpEndpoint {
    /// Create a new endpoint with a per-request timeout.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            url: url.into(),
            api_key,
            client,
        })
    }

    /// Build from the `[model]` config section.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ProviderError> {
        Self::new(
            endpoint_name(&config.endpoint_url),
            config.endpoint_url.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// A short label for logs, derived from the URL host.
fn endpoint_name(url: &str) -> String {
    let host = url
        .split("://")
        .nth(1)
        .unwrap_or(url)
        .split(['/', ':'])
        .next()
        .unwrap_or_default();

    if host.contains("huggingface") {
        "huggingface".into()
    } else if host.is_empty() {
        "endpoint".into()
    } else {
        host.to_string()
    }
}

#[async_trait]
impl CompletionEndpoint for HttpEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, request: &CompletionRequest) -> Result<EndpointReply, ProviderError> {
        debug!(
            endpoint = %self.name,
            model = %request.model,
            max_tokens = request.max_tokens,
            "Sending completion request"
        );

        let mut builder = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(request);

        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(endpoint = %self.name, status, error = %e, "Failed to read response body");
                String::new()
            }
        };
        trace!(endpoint = %self.name, status, bytes = body.len(), "Completion response received");

        Ok(EndpointReply { status, body })
    }
}
