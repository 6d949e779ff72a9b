use crate::models::Mentor;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMentorRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 2000))]
    pub bio: String,
    pub categories: Vec<String>,
    /// Must be non-empty: every completion for this mentor starts from it.
    #[validate(length(min = 1))]
    pub persona_prompt: String,
    pub profile_image: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMentorRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 2000))]
    pub bio: String,
    pub categories: Vec<String>,
    #[validate(length(min = 1))]
    pub persona_prompt: String,
    pub profile_image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MentorListParams {
    /// Fuzzy category filter: matches when either string contains the other.
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MentorResponse {
    pub id: String,
    pub name: String,
    pub bio: String,
    pub categories: Vec<String>,
    pub persona_prompt: String,
    pub profile_image_url: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

impl MentorResponse {
    pub fn from_model(mentor: Mentor, profile_image_url: Option<String>) -> Self {
        Self {
            id: mentor.id,
            name: mentor.name,
            bio: mentor.bio,
            categories: mentor.categories,
            persona_prompt: mentor.persona_prompt,
            profile_image_url,
            is_active: mentor.is_active,
            created_at: mentor.created_at.to_rfc3339(),
        }
    }
}
