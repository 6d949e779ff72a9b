use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One message in a chat. Assistant messages may be created with empty
/// content and patched in place while a completion streams.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub chat_id: String,
    pub user_id: String,
    pub mentor_id: String,
    pub content: String,
    pub role: MessageRole,
    pub image_id: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        chat_id: &str,
        user_id: &str,
        mentor_id: &str,
        content: String,
        role: MessageRole,
        image_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            chat_id: chat_id.to_string(),
            user_id: user_id.to_string(),
            mentor_id: mentor_id.to_string(),
            content,
            role,
            image_id,
            created_at: Utc::now(),
        }
    }
}
