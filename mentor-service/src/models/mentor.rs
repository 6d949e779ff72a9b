use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An AI mentor persona. The persona prompt steers every completion made
/// on the mentor's behalf and is required to be non-empty at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mentor {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub bio: String,
    pub categories: Vec<String>,
    pub persona_prompt: String,
    pub profile_image: Option<String>,
    pub is_active: bool,
    /// Owning user; None for mentors seeded by the platform.
    pub created_by: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Mentor {
    pub fn new(
        name: String,
        bio: String,
        categories: Vec<String>,
        persona_prompt: String,
        profile_image: Option<String>,
        created_by: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            bio,
            categories,
            persona_prompt,
            profile_image,
            is_active: true,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}
