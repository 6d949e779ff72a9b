use crate::dtos::mentors::MentorResponse;
use crate::models::{Chat, Message, MessageRole};
use crate::services::pipeline::SendOutcome;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateChatRequest {
    #[validate(length(min = 1))]
    pub mentor_id: String,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RenameChatRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    /// May be empty only when an image is attached.
    #[validate(length(max = 8000))]
    pub content: String,
    pub image_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub user_message_id: String,
    pub assistant_message_id: String,
}

impl From<SendOutcome> for SendMessageResponse {
    fn from(outcome: SendOutcome) -> Self {
        Self {
            user_message_id: outcome.user_message_id,
            assistant_message_id: outcome.assistant_message_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatSummaryResponse {
    pub id: String,
    pub title: String,
    pub mentor: Option<MentorResponse>,
    pub last_message_at: Option<String>,
    pub created_at: String,
}

impl ChatSummaryResponse {
    pub fn from_model(chat: Chat, mentor: Option<MentorResponse>) -> Self {
        Self {
            id: chat.id,
            title: chat.title,
            mentor,
            last_message_at: chat
                .last_message_at
                .map(|at| at.to_chrono().to_rfc3339()),
            created_at: chat.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatDetailResponse {
    pub id: String,
    pub title: String,
    pub mentor: Option<MentorResponse>,
    pub messages: Vec<MessageResponse>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub content: String,
    pub role: MessageRole,
    pub image_url: Option<String>,
    pub created_at: String,
}

impl MessageResponse {
    pub fn from_model(message: Message, image_url: Option<String>) -> Self {
        Self {
            id: message.id,
            content: message.content,
            role: message.role,
            image_url,
            created_at: message.created_at.to_rfc3339(),
        }
    }
}
