use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound on persisted key points per (user, mentor) pair.
pub const MAX_KEY_POINTS: usize = 5;

/// Summarized relationship memory, unique per (user, mentor) pair.
/// Key points are replaced wholesale on each summarization run; the
/// consolidation of old and new information is delegated to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub mentor_id: String,
    pub key_points: Vec<String>,
    pub conversation_count: i32,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Memory {
    pub fn new(
        user_id: String,
        mentor_id: String,
        key_points: Vec<String>,
        conversation_count: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            mentor_id,
            key_points,
            conversation_count,
            updated_at: Utc::now(),
        }
    }
}
