//! Storage contract consumed by the conversational pipeline.

use crate::models::{Chat, KnowledgeDocument, Memory, Mentor, Message, UserProfile};
use async_trait::async_trait;
use service_core::error::AppError;

/// The narrow view of the document store the pipeline depends on: point
/// lookups, chat-scoped queries, pair-scoped memory access, message
/// insert/patch. `MongoDb` implements this in production; tests use an
/// in-memory implementation.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn find_mentor(&self, mentor_id: &str) -> Result<Option<Mentor>, AppError>;

    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>, AppError>;

    async fn find_chat(&self, chat_id: &str) -> Result<Option<Chat>, AppError>;

    /// All messages of a chat in chronological order.
    async fn chat_messages(&self, chat_id: &str) -> Result<Vec<Message>, AppError>;

    async fn count_chat_messages(&self, chat_id: &str) -> Result<u64, AppError>;

    async fn insert_message(&self, message: &Message) -> Result<(), AppError>;

    /// Overwrite a message's content in place (streaming updates).
    async fn set_message_content(&self, message_id: &str, content: &str) -> Result<(), AppError>;

    /// Bump the chat's last-message timestamp.
    async fn touch_chat(&self, chat_id: &str) -> Result<(), AppError>;

    /// Compare-and-set title update; returns false when the stored title
    /// no longer matches `expected_title`.
    async fn set_chat_title_if_matches(
        &self,
        chat_id: &str,
        expected_title: &str,
        new_title: &str,
    ) -> Result<bool, AppError>;

    async fn find_memory(&self, user_id: &str, mentor_id: &str)
        -> Result<Option<Memory>, AppError>;

    /// Replace the memory for a (user, mentor) pair, creating it on first
    /// use. Key points are overwritten wholesale.
    async fn upsert_memory(
        &self,
        user_id: &str,
        mentor_id: &str,
        key_points: &[String],
        conversation_count: i32,
    ) -> Result<(), AppError>;

    async fn active_documents(&self, mentor_id: &str)
        -> Result<Vec<KnowledgeDocument>, AppError>;
}
