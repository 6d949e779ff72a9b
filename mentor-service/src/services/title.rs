//! One-shot chat title generation.
//!
//! Fires after the first exchange and derives a short title from the
//! first user message. The write is guarded: only a chat still carrying
//! its default title is patched, so a manual rename always wins.

use crate::models::Chat;
use crate::services::providers::{ChatProvider, ChatTurn, CompletionRequest};
use crate::services::store::ConversationStore;
use service_core::error::AppError;
use std::sync::Arc;

const TITLE_SYSTEM: &str = "Generate a short, descriptive title (max 6 words) for a chat conversation based on the first message. Return only the title, no quotes or extra text.";

#[derive(Debug, PartialEq, Eq)]
pub enum TitleOutcome {
    Updated(String),
    Skipped(&'static str),
}

pub struct TitleGenerator {
    store: Arc<dyn ConversationStore>,
    provider: Arc<dyn ChatProvider>,
    model: String,
}

impl TitleGenerator {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        provider: Arc<dyn ChatProvider>,
        model: String,
    ) -> Self {
        Self {
            store,
            provider,
            model,
        }
    }

    #[tracing::instrument(skip(self, first_message))]
    pub async fn generate(
        &self,
        chat_id: &str,
        first_message: &str,
    ) -> Result<TitleOutcome, AppError> {
        let chat = self
            .store
            .find_chat(chat_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Chat not found")))?;

        let mentor = self
            .store
            .find_mentor(&chat.mentor_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Mentor not found")))?;

        let default_title = Chat::default_title(&mentor.name);
        if chat.title != default_title {
            return Ok(TitleOutcome::Skipped("title already customised"));
        }

        let request = CompletionRequest {
            model: self.model.clone(),
            system: TITLE_SYSTEM.to_string(),
            turns: vec![ChatTurn::user(first_message)],
            temperature: 0.3,
            max_tokens: 20,
        };

        let reply = self
            .provider
            .complete(&request)
            .await
            .map_err(AppError::from)?;

        let title = reply.trim().trim_matches('"').trim().to_string();
        if title.is_empty() {
            return Ok(TitleOutcome::Skipped("model returned an empty title"));
        }

        // Compare-and-set: a rename that landed while the completion was
        // in flight makes the filter miss and the generated title is
        // discarded.
        let updated = self
            .store
            .set_chat_title_if_matches(chat_id, &default_title, &title)
            .await?;

        if updated {
            tracing::info!(title = %title, "Chat title generated");
            Ok(TitleOutcome::Updated(title))
        } else {
            Ok(TitleOutcome::Skipped("title changed concurrently"))
        }
    }
}
