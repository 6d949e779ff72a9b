use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A conversation session between one user and one mentor. Both
/// references are fixed for the chat's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub mentor_id: String,
    pub title: String,
    pub is_active: bool,
    pub last_message_at: Option<mongodb::bson::DateTime>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    pub fn new(user_id: String, mentor_id: String, title: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            mentor_id,
            title,
            is_active: true,
            last_message_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The placeholder title a new chat receives. The title generator
    /// only overwrites a title that still equals this value, so a manual
    /// rename is never clobbered.
    pub fn default_title(mentor_name: &str) -> String {
        format!("Chat with {}", mentor_name)
    }
}
