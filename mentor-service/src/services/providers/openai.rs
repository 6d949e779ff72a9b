//! OpenAI chat-completions provider.
//!
//! Supports blocking and SSE-streaming completions, including multimodal
//! user turns for vision-capable models.

use super::{
    ChatProvider, ChatTurn, CompletionRequest, CompletionStream, ProviderError, StreamEvent,
    TurnContent, TurnRole,
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// OpenAI provider configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub api_base: String,
}

pub struct OpenAiChatProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiChatProvider {
    pub fn new(config: OpenAiConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn ensure_configured(&self) -> Result<(), ProviderError> {
        if self.config.api_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured(
                "OPENAI_API_KEY is not set".to_string(),
            ));
        }
        Ok(())
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }

    fn build_request(&self, request: &CompletionRequest, stream: bool) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(request.turns.len() + 1);
        messages.push(WireMessage {
            role: "system",
            content: WireContent::Text(request.system.clone()),
        });
        messages.extend(request.turns.iter().map(turn_to_wire));

        ChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiChatProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.ensure_configured()?;

        let body = self.build_request(request, false);

        tracing::debug!(
            model = %request.model,
            turn_count = request.turns.len(),
            "Sending completion request to OpenAI"
        );

        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_to_error(status.as_u16(), error_text));
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Protocol(format!("failed to parse response: {}", e)))?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ProviderError::Protocol("completion has no message content".to_string()))
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionStream, ProviderError> {
        self.ensure_configured()?;

        let body = self.build_request(request, true);

        tracing::debug!(
            model = %request.model,
            turn_count = request.turns.len(),
            "Starting streaming completion request to OpenAI"
        );

        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_to_error(status.as_u16(), error_text));
        }

        let (tx, rx) = mpsc::channel(32);

        // Bridge the SSE byte stream into typed events.
        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk_result) = stream.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        buffer.push_str(&String::from_utf8_lossy(&chunk));

                        while let Some(line_end) = buffer.find('\n') {
                            let line = buffer[..line_end].trim().to_string();
                            buffer = buffer[line_end + 1..].to_string();

                            let Some(data) = line.strip_prefix("data: ") else {
                                continue;
                            };

                            if data == "[DONE]" {
                                let _ = tx.send(Ok(StreamEvent::Done)).await;
                                return;
                            }

                            match serde_json::from_str::<ChatCompletionChunk>(data) {
                                Ok(delta) => {
                                    let text = delta
                                        .choices
                                        .first()
                                        .and_then(|c| c.delta.content.clone())
                                        .unwrap_or_default();
                                    if !text.is_empty()
                                        && tx.send(Ok(StreamEvent::Delta(text))).await.is_err()
                                    {
                                        return;
                                    }
                                }
                                Err(e) => {
                                    tracing::debug!(error = %e, "Skipping unparseable stream chunk");
                                }
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(ProviderError::Network(e.to_string()))).await;
                        return;
                    }
                }
            }

            // Connection closed without a [DONE] marker.
            let _ = tx.send(Ok(StreamEvent::Done)).await;
        });

        Ok(Box::pin(ReceiverStream::new(rx)) as CompletionStream)
    }
}

fn status_to_error(status: u16, body: String) -> ProviderError {
    match status {
        401 | 403 => ProviderError::AuthRejected(format!("status {}: {}", status, body)),
        429 => ProviderError::RateLimited,
        500..=599 => ProviderError::ServerError(format!("status {}: {}", status, body)),
        _ => ProviderError::Api(format!("status {}: {}", status, body)),
    }
}

fn turn_to_wire(turn: &ChatTurn) -> WireMessage {
    let role = match turn.role {
        TurnRole::User => "user",
        TurnRole::Assistant => "assistant",
    };

    let content = match &turn.content {
        TurnContent::Text(text) => WireContent::Text(text.clone()),
        TurnContent::TextWithImage { text, image_url } => WireContent::Parts(vec![
            WirePart::Text { text: text.clone() },
            WirePart::ImageUrl {
                image_url: WireImageUrl {
                    url: image_url.clone(),
                },
            },
        ]),
    };

    WireMessage { role, content }
}

// ============================================================================
// OpenAI API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: WireContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Parts(Vec<WirePart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WirePart {
    Text { text: String },
    ImageUrl { image_url: WireImageUrl },
}

#[derive(Debug, Serialize)]
struct WireImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<WireChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChunkChoice {
    #[serde(default)]
    delta: WireDelta,
    #[serde(default)]
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct WireDelta {
    #[serde(default)]
    content: Option<String>,
}
