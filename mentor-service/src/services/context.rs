//! Context retrieval for completion requests.
//!
//! Loads the bounded conversation history, the relationship memory, and
//! keyword-matched knowledge snippets for one incoming message. Missing
//! memory, profile, or matches degrade to empty results; a missing chat
//! or mentor stops the pipeline with NotFound.

use crate::models::{Chat, KnowledgeDocument, Memory, Mentor, Message, UserProfile};
use crate::services::store::ConversationStore;
use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;

/// Everything the prompt assembler needs for one completion.
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    pub chat: Chat,
    pub mentor: Mentor,
    /// Absent when no profile exists (e.g. background execution without
    /// propagated identity).
    pub user: Option<UserProfile>,
    /// The most recent messages, oldest first.
    pub history: Vec<Message>,
    pub memory: Option<Memory>,
    pub snippets: Vec<KnowledgeSnippet>,
}

/// A matched knowledge-base entry, truncated for prompt inclusion.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct KnowledgeSnippet {
    pub title: String,
    pub excerpt: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ContextLimits {
    pub history_limit: usize,
    pub knowledge_limit: usize,
    pub snippet_chars: usize,
}

pub struct ContextRetriever {
    store: Arc<dyn ConversationStore>,
    limits: ContextLimits,
}

impl ContextRetriever {
    pub fn new(store: Arc<dyn ConversationStore>, limits: ContextLimits) -> Self {
        Self { store, limits }
    }

    #[tracing::instrument(skip(self, query))]
    pub async fn retrieve(
        &self,
        chat_id: &str,
        user_id: &str,
        query: &str,
    ) -> Result<RetrievedContext, AppError> {
        let chat = self
            .store
            .find_chat(chat_id)
            .await?
            .filter(|chat| chat.is_active && chat.user_id == user_id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Chat not found")))?;

        let mentor = self
            .store
            .find_mentor(&chat.mentor_id)
            .await?
            .filter(|mentor| mentor.is_active)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Mentor not found")))?;

        let user = self.store.find_user(user_id).await?;

        let mut history = self.store.chat_messages(chat_id).await?;
        if history.len() > self.limits.history_limit {
            history = history.split_off(history.len() - self.limits.history_limit);
        }

        let memory = self.store.find_memory(user_id, &chat.mentor_id).await?;

        let documents = self.store.active_documents(&chat.mentor_id).await?;
        let snippets = search_documents(
            &documents,
            query,
            self.limits.knowledge_limit,
            self.limits.snippet_chars,
        );

        tracing::debug!(
            history_len = history.len(),
            has_memory = memory.is_some(),
            snippet_count = snippets.len(),
            "Retrieved conversation context"
        );

        Ok(RetrievedContext {
            chat,
            mentor,
            user,
            history,
            memory,
            snippets,
        })
    }
}

/// Case-insensitive substring search over title and content. Returns the
/// first `limit` matches in stored order, each excerpt truncated to
/// `excerpt_chars` characters. Deliberately not a semantic search: the
/// per-mentor corpus is small and the bounds keep prompt size predictable.
pub fn search_documents(
    documents: &[KnowledgeDocument],
    query: &str,
    limit: usize,
    excerpt_chars: usize,
) -> Vec<KnowledgeSnippet> {
    let needle = query.to_lowercase();

    documents
        .iter()
        .filter(|doc| {
            doc.title.to_lowercase().contains(&needle)
                || doc.content.to_lowercase().contains(&needle)
        })
        .take(limit)
        .map(|doc| KnowledgeSnippet {
            title: doc.title.clone(),
            excerpt: truncate_excerpt(&doc.content, excerpt_chars),
        })
        .collect()
}

fn truncate_excerpt(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let mut excerpt: String = content.chars().take(max_chars).collect();
    excerpt.push_str("...");
    excerpt
}
