use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentSource {
    Manual,
    Upload,
    Generated,
}

/// A knowledge-base entry owned by exactly one mentor. Matched against
/// incoming messages by substring search and folded into prompts as a
/// truncated excerpt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub mentor_id: String,
    pub title: String,
    pub content: String,
    pub source: DocumentSource,
    pub uploaded_by: String,
    pub is_active: bool,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl KnowledgeDocument {
    pub fn new(
        mentor_id: String,
        title: String,
        content: String,
        source: DocumentSource,
        uploaded_by: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            mentor_id,
            title,
            content,
            source,
            uploaded_by,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}
