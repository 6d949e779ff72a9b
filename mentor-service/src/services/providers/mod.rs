//! Chat completion provider abstractions.
//!
//! A trait-based seam over the external LLM API so tests can substitute
//! a scripted mock for the real HTTP client.

pub mod mock;
pub mod openai;

use async_trait::async_trait;
use service_core::error::AppError;
use std::pin::Pin;
use thiserror::Error;
use tokio_stream::Stream;

/// Error taxonomy for provider calls. The first five variants map
/// one-to-one onto distinct user-facing failures; operators can tell
/// "not configured" from "misconfigured" from "throttled" from "down".
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Credential missing from configuration.
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// Credential present but rejected upstream.
    #[error("Provider rejected the credential: {0}")]
    AuthRejected(String),

    #[error("Rate limited by provider")]
    RateLimited,

    /// Upstream 5xx.
    #[error("Provider server error: {0}")]
    ServerError(String),

    /// Response shape unexpected (missing completion field, bad JSON).
    #[error("Provider protocol error: {0}")]
    Protocol(String),

    #[error("Network error: {0}")]
    Network(String),

    /// Any other non-success status.
    #[error("Provider API error: {0}")]
    Api(String),
}

impl ProviderError {
    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::AuthRejected(_) => "auth_rejected",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::ServerError(_) => "server_error",
            ProviderError::Protocol(_) => "protocol",
            ProviderError::Network(_) => "network",
            ProviderError::Api(_) => "api",
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::NotConfigured(_) => AppError::ConfigError(anyhow::anyhow!(
                "The AI provider API key is not configured. Set OPENAI_API_KEY to enable mentor replies."
            )),
            ProviderError::AuthRejected(_) => AppError::BadGateway(
                "The AI provider rejected the configured API key. Check the OPENAI_API_KEY value."
                    .to_string(),
            ),
            ProviderError::RateLimited => AppError::TooManyRequests(
                "The AI service is handling too many requests right now. Please try again in a moment."
                    .to_string(),
                None,
            ),
            ProviderError::ServerError(_) => AppError::BadGateway(
                "The AI service is temporarily unavailable. Please try again shortly.".to_string(),
            ),
            ProviderError::Protocol(message) => AppError::InternalError(anyhow::anyhow!(
                "Unexpected AI provider response: {}",
                message
            )),
            ProviderError::Network(message) => {
                AppError::BadGateway(format!("Could not reach the AI service: {}", message))
            }
            ProviderError::Api(message) => {
                AppError::BadGateway(format!("AI provider request failed: {}", message))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

/// Payload of a single turn: plain text, or text plus a fetchable image
/// URL for vision-capable models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnContent {
    Text(String),
    TextWithImage { text: String, image_url: String },
}

/// One role-tagged conversational turn.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: TurnContent,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: TurnContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: TurnContent::Text(text.into()),
        }
    }

    pub fn user_with_image(text: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: TurnContent::TextWithImage {
                text: text.into(),
                image_url: image_url.into(),
            },
        }
    }

    pub fn has_image(&self) -> bool {
        matches!(self.content, TurnContent::TextWithImage { .. })
    }

    pub fn text(&self) -> &str {
        match &self.content {
            TurnContent::Text(text) => text,
            TurnContent::TextWithImage { text, .. } => text,
        }
    }
}

/// A fully assembled completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub turns: Vec<ChatTurn>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Incremental event from a streaming completion.
#[derive(Debug)]
pub enum StreamEvent {
    Delta(String),
    Done,
}

/// Type alias for provider streams.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ProviderError>> + Send>>;

/// Trait for chat completion providers.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Single request/response completion; returns the reply text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;

    /// Streaming completion delivered as incremental text fragments.
    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionStream, ProviderError>;
}
