use crate::models::UserProfile;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 120))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
    #[validate(length(max = 2000))]
    pub goals: Option<String>,
    #[validate(length(max = 2000))]
    pub interests: Option<String>,
    pub profile_image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub goals: Option<String>,
    pub interests: Option<String>,
    pub profile_image_url: Option<String>,
    pub is_admin: bool,
}

impl ProfileResponse {
    pub fn from_model(user: UserProfile, profile_image_url: Option<String>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            bio: user.bio,
            goals: user.goals,
            interests: user.interests,
            profile_image_url,
            is_admin: user.is_admin,
        }
    }
}
