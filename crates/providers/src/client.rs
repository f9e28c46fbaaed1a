//! The model client: drives the [`RetryPolicy`] state machine against a
//! [`CompletionEndpoint`] and exposes the result as a [`CodeGenerator`].

use std::sync::Arc;

use async_trait::async_trait;
use codeweaver_config::ModelConfig;
use codeweaver_core::error::ProviderError;
use codeweaver_core::language::Language;
use codeweaver_core::provider::{
    ChatMessage, CodeGenerator, CompletionEndpoint, CompletionRequest, EndpointReply,
};
use tracing::{error, info, warn};

use crate::http::HttpEndpoint;
use crate::retry::{Disposition, Resume, RetryPolicy, RetryState};

/// Generates code through a chat-completion endpoint, retrying as the
/// policy dictates. Every failure path collapses to an empty string.
pub struct CodeModelClient {
    endpoint: Arc<dyn CompletionEndpoint>,
    policy: RetryPolicy,
    model: String,
    temperature: f32,
    top_p: f32,
}

impl CodeModelClient {
    pub fn new(
        endpoint: Arc<dyn CompletionEndpoint>,
        model: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            endpoint,
            policy,
            model: model.into(),
            temperature: 0.1,
            top_p: 1.0,
        }
    }

    /// Override the sampling settings (defaults: temperature 0.1, top_p 1.0).
    pub fn with_sampling(mut self, temperature: f32, top_p: f32) -> Self {
        self.temperature = temperature;
        self.top_p = top_p;
        self
    }

    /// Build an HTTP-backed client from the `[model]` config section.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ProviderError> {
        if config.api_key.is_none() {
            warn!("No API key configured for the inference endpoint; requests will be unauthenticated");
        }
        let endpoint = Arc::new(HttpEndpoint::from_config(config)?);
        Ok(
            Self::new(endpoint, config.model.clone(), RetryPolicy::from_config(config))
                .with_sampling(config.temperature, config.top_p),
        )
    }

    fn build_request(&self, prompt: &str, language: Language, max_tokens: u32) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(format!(
                    "You are a coding assistant. Write valid {language} code."
                )),
                ChatMessage::user(prompt),
            ],
            temperature: self.temperature,
            max_tokens,
            top_p: self.top_p,
        }
    }

    /// Run the retry state machine to completion.
    pub async fn run(&self, prompt: &str, language: Language) -> String {
        let retries = self.policy.retries;
        let mut state = self.policy.start();

        loop {
            state = match state {
                RetryState::Done(text) => return text,
                RetryState::Requesting {
                    attempt,
                    max_tokens,
                } => {
                    info!(attempt, retries, max_tokens, "Requesting completion");
                    let request = self.build_request(prompt, language, max_tokens);
                    let outcome = self.endpoint.send(&request).await;
                    let disposition = Disposition::classify(&outcome);
                    self.log_disposition(attempt, &outcome, &disposition);
                    self.policy.on_disposition(attempt, max_tokens, disposition)
                }
                waiting => {
                    if let Some(wait) = waiting.wait() {
                        tokio::time::sleep(wait).await;
                    }
                    self.policy.on_wait_elapsed(waiting)
                }
            };

            match &state {
                RetryState::WaitingForLoad { wait, .. } => {
                    info!(wait_secs = wait.as_secs_f64(), "Model loading; waiting");
                }
                RetryState::WaitingForBackoff {
                    resume: Resume::Request { max_tokens },
                    ..
                } => {
                    info!(max_tokens, "Response truncated; increasing budget and retrying");
                }
                _ => {}
            }
        }
    }

    fn log_disposition(
        &self,
        attempt: u32,
        outcome: &Result<EndpointReply, ProviderError>,
        disposition: &Disposition,
    ) {
        match (disposition, outcome) {
            (Disposition::Completed { finish_reason, .. }, _) => {
                info!(finish_reason = finish_reason.as_deref().unwrap_or("null"), "Completion received");
            }
            (Disposition::Failed { status }, Ok(reply)) => {
                error!(endpoint = %self.endpoint.name(), status, body = %reply.body, "Endpoint returned error");
            }
            (Disposition::NetworkError, Err(e)) => {
                warn!(endpoint = %self.endpoint.name(), attempt, error = %e, "Network error");
            }
            _ => {}
        }
    }
}

#[async_trait]
impl CodeGenerator for CodeModelClient {
    async fn generate(&self, prompt: &str, language: Language) -> String {
        self.run(prompt, language).await
    }
}
