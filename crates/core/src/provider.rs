//! Provider traits: the abstraction over the hosted inference endpoint.
//!
//! Two layers:
//! - [`CompletionEndpoint`] performs exactly one HTTP exchange and reports
//!   the raw status and body. It knows nothing about retries.
//! - [`CodeGenerator`] turns a prompt into code, hiding every failure
//!   behind an empty string. The retrying model client implements it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::language::Language;

/// The role of a chat message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// The end user
    User,
}

/// One entry in the `messages` array of a chat-completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// The JSON body of a chat-completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g., "openai/gpt-oss-20b")
    pub model: String,

    /// System instruction followed by the user's prompt
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature
    pub temperature: f32,

    /// Generation-length budget for this call
    pub max_tokens: u32,

    /// Nucleus sampling
    pub top_p: f32,
}

/// The raw outcome of one completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointReply {
    pub status: u16,
    pub body: String,
}

impl EndpointReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A single round-trip to the inference service.
///
/// `Err` means the exchange itself could not complete (connection refused,
/// reset, per-call timeout). Any HTTP status, including errors, is `Ok`.
#[async_trait]
pub trait CompletionEndpoint: Send + Sync {
    /// A human-readable name for logs (e.g., "huggingface").
    fn name(&self) -> &str;

    async fn send(&self, request: &CompletionRequest) -> Result<EndpointReply, ProviderError>;
}

/// Produces source code for a prompt.
///
/// Never fails: an empty string signals that no code could be obtained.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, language: Language) -> String;
}
