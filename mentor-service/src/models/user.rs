use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile for a user provisioned by the external auth layer. The id is
/// the auth layer's subject; this service only reads and patches profile
/// fields, it never creates identities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub goals: Option<String>,
    pub interests: Option<String>,
    pub profile_image: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: None,
            bio: None,
            goals: None,
            interests: None,
            profile_image: None,
            is_admin: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Display name for admin listings: profile name or the raw id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
