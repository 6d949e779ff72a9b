use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(rename = "_id")]
    pub id: String,
    pub message: String,
    pub email: Option<String>,
    /// Absent for anonymous submissions.
    pub user_id: Option<String>,
    pub is_resolved: bool,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    pub fn new(message: String, email: Option<String>, user_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message,
            email,
            user_id,
            is_resolved: false,
            created_at: Utc::now(),
        }
    }
}
