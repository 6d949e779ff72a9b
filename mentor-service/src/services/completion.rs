//! Completion invocation.
//!
//! Two operating modes: blocking (one request, one persisted assistant
//! message) and streaming (an empty placeholder message is created first,
//! then overwritten with the full accumulated text after every received
//! fragment, so concurrent readers observe growing content). A single
//! invocation never touches more than one message record.

use crate::models::{Message, MessageRole};
use crate::services::metrics;
use crate::services::prompt::AssembledPrompt;
use crate::services::providers::{ChatProvider, CompletionRequest, ProviderError, StreamEvent};
use crate::services::store::ConversationStore;
use futures::StreamExt;
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Instant;

/// Written into the placeholder when a stream dies after it was created,
/// so the conversation never shows a permanently empty bubble.
pub const STREAM_APOLOGY: &str =
    "I apologize, but I'm having trouble generating a response right now. Please try again.";

#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub chat_model: String,
    pub vision_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

pub struct CompletionEngine {
    provider: Arc<dyn ChatProvider>,
    store: Arc<dyn ConversationStore>,
    settings: CompletionSettings,
}

impl CompletionEngine {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        store: Arc<dyn ConversationStore>,
        settings: CompletionSettings,
    ) -> Self {
        Self {
            provider,
            store,
            settings,
        }
    }

    /// The vision model is selected whenever the final turn carries an
    /// image URL; plain turns use the lighter chat model.
    fn request_for(&self, prompt: &AssembledPrompt) -> CompletionRequest {
        let has_image = prompt.turns.last().is_some_and(|turn| turn.has_image());
        let model = if has_image {
            self.settings.vision_model.clone()
        } else {
            self.settings.chat_model.clone()
        };

        CompletionRequest {
            model,
            system: prompt.system.clone(),
            turns: prompt.turns.clone(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }

    /// Blocking mode: the full reply is persisted as one new message.
    #[tracing::instrument(skip(self, prompt))]
    pub async fn respond(
        &self,
        chat_id: &str,
        user_id: &str,
        mentor_id: &str,
        prompt: &AssembledPrompt,
    ) -> Result<Message, AppError> {
        let request = self.request_for(prompt);

        let start = Instant::now();
        let result = self.provider.complete(&request).await;
        metrics::record_completion(
            "blocking",
            &request.model,
            if result.is_ok() { "ok" } else { "error" },
            start.elapsed().as_secs_f64(),
        );

        let reply = result.map_err(|e| {
            metrics::record_provider_error(e.kind());
            tracing::error!(error = %e, model = %request.model, "Blocking completion failed");
            AppError::from(e)
        })?;

        let message = Message::new(
            chat_id,
            user_id,
            mentor_id,
            reply,
            MessageRole::Assistant,
            None,
        );
        self.store.insert_message(&message).await?;

        Ok(message)
    }

    /// Streaming mode. On any failure after the placeholder exists, the
    /// placeholder is overwritten with an apology and the error is
    /// re-signaled to the caller. A stream that ends without content is a
    /// failure.
    #[tracing::instrument(skip(self, prompt))]
    pub async fn respond_streaming(
        &self,
        chat_id: &str,
        user_id: &str,
        mentor_id: &str,
        prompt: &AssembledPrompt,
    ) -> Result<Message, AppError> {
        let request = self.request_for(prompt);

        let placeholder = Message::new(
            chat_id,
            user_id,
            mentor_id,
            String::new(),
            MessageRole::Assistant,
            None,
        );
        self.store.insert_message(&placeholder).await?;

        let start = Instant::now();
        let result = self.stream_into(&placeholder.id, &request).await;
        metrics::record_completion(
            "streaming",
            &request.model,
            if result.is_ok() { "ok" } else { "error" },
            start.elapsed().as_secs_f64(),
        );

        match result {
            Ok(full_text) => {
                let mut message = placeholder;
                message.content = full_text;
                Ok(message)
            }
            Err(error) => {
                tracing::error!(
                    message_id = %placeholder.id,
                    error = %error,
                    "Streaming completion failed, writing apology into placeholder"
                );
                if let Err(write_error) = self
                    .store
                    .set_message_content(&placeholder.id, STREAM_APOLOGY)
                    .await
                {
                    tracing::error!(
                        message_id = %placeholder.id,
                        error = %write_error,
                        "Failed to write apology into placeholder message"
                    );
                }
                Err(error)
            }
        }
    }

    async fn stream_into(
        &self,
        message_id: &str,
        request: &CompletionRequest,
    ) -> Result<String, AppError> {
        let mut stream = self.provider.complete_stream(request).await.map_err(|e| {
            metrics::record_provider_error(e.kind());
            AppError::from(e)
        })?;

        let mut accumulated = String::new();

        while let Some(event) = stream.next().await {
            match event {
                Ok(StreamEvent::Delta(fragment)) => {
                    accumulated.push_str(&fragment);
                    // Overwrite with the full text so far, not an append,
                    // so readers always see a consistent prefix.
                    self.store
                        .set_message_content(message_id, &accumulated)
                        .await?;
                }
                Ok(StreamEvent::Done) => break,
                Err(error) => {
                    metrics::record_provider_error(error.kind());
                    return Err(AppError::from(error));
                }
            }
        }

        if accumulated.is_empty() {
            return Err(AppError::from(ProviderError::Protocol(
                "stream ended with no content".to_string(),
            )));
        }

        Ok(accumulated)
    }
}
