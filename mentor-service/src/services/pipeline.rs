//! Send-message orchestration.
//!
//! The single entry point the chat handlers call: persists the user
//! message, drives retrieval, assembly, and completion, and enqueues the
//! background enrichments (title generation once per chat, memory
//! summarization on its periodic trigger). The user message is always
//! committed before the assistant response is attempted, so a failed
//! completion never loses drafted input.

use crate::models::{Message, MessageRole};
use crate::services::completion::CompletionEngine;
use crate::services::context::ContextRetriever;
use crate::services::memory::MemoryPolicy;
use crate::services::prompt;
use crate::services::storage::ImageStore;
use crate::services::store::ConversationStore;
use crate::services::tasks::{BackgroundTask, TaskQueue};
use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    Blocking,
    Streaming,
}

#[derive(Debug, Serialize)]
pub struct SendOutcome {
    pub user_message_id: String,
    pub assistant_message_id: String,
}

pub struct ChatPipeline {
    store: Arc<dyn ConversationStore>,
    images: Arc<dyn ImageStore>,
    retriever: ContextRetriever,
    engine: CompletionEngine,
    tasks: TaskQueue,
    memory_policy: MemoryPolicy,
}

impl ChatPipeline {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        images: Arc<dyn ImageStore>,
        retriever: ContextRetriever,
        engine: CompletionEngine,
        tasks: TaskQueue,
        memory_policy: MemoryPolicy,
    ) -> Self {
        Self {
            store,
            images,
            retriever,
            engine,
            tasks,
            memory_policy,
        }
    }

    #[tracing::instrument(skip(self, content))]
    pub async fn send_message(
        &self,
        user_id: &str,
        chat_id: &str,
        content: &str,
        image_id: Option<&str>,
        mode: SendMode,
    ) -> Result<SendOutcome, AppError> {
        if content.trim().is_empty() && image_id.is_none() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Message content is empty"
            )));
        }

        // Snapshot before the new message lands: the history replayed to
        // the model excludes the incoming message, which is appended as
        // the final turn instead.
        let context = self.retriever.retrieve(chat_id, user_id, content).await?;
        let prior_count = self.store.count_chat_messages(chat_id).await?;

        let user_message = Message::new(
            chat_id,
            user_id,
            &context.chat.mentor_id,
            content.to_string(),
            MessageRole::User,
            image_id.map(str::to_string),
        );
        self.store.insert_message(&user_message).await?;
        self.store.touch_chat(chat_id).await?;

        // A reference that fails to resolve downgrades the turn to
        // text-only instead of failing the whole request.
        let image_url = match image_id {
            Some(image_id) => match self.images.resolve_url(image_id).await {
                Ok(url) => {
                    if url.is_none() {
                        tracing::warn!(image_id, "Image reference did not resolve to a URL");
                    }
                    url
                }
                Err(error) => {
                    tracing::warn!(image_id, error = %error, "Image URL resolution failed");
                    None
                }
            },
            None => None,
        };

        let assembled = prompt::assemble(&context, content, image_id.is_some(), image_url.as_deref());

        let assistant_message = match mode {
            SendMode::Blocking => {
                self.engine
                    .respond(chat_id, user_id, &context.chat.mentor_id, &assembled)
                    .await?
            }
            SendMode::Streaming => {
                self.engine
                    .respond_streaming(chat_id, user_id, &context.chat.mentor_id, &assembled)
                    .await?
            }
        };
        self.store.touch_chat(chat_id).await?;

        if prior_count == 0 {
            self.tasks.enqueue(BackgroundTask::GenerateTitle {
                chat_id: chat_id.to_string(),
                first_message: content.to_string(),
            });
        }

        let total_messages = prior_count + 2;
        if self.memory_policy.is_due(total_messages) {
            self.tasks.enqueue(BackgroundTask::SummarizeMemory {
                chat_id: chat_id.to_string(),
                user_id: user_id.to_string(),
                mentor_id: context.chat.mentor_id.clone(),
            });
        }

        Ok(SendOutcome {
            user_message_id: user_message.id,
            assistant_message_id: assistant_message.id,
        })
    }
}
