use crate::models::Feedback;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitFeedbackRequest {
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveFeedbackRequest {
    pub is_resolved: bool,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub id: String,
    pub message: String,
    pub email: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub is_resolved: bool,
    pub created_at: String,
}

impl FeedbackResponse {
    pub fn from_model(feedback: Feedback, user_name: Option<String>) -> Self {
        Self {
            id: feedback.id,
            message: feedback.message,
            email: feedback.email,
            user_id: feedback.user_id,
            user_name,
            is_resolved: feedback.is_resolved,
            created_at: feedback.created_at.to_rfc3339(),
        }
    }
}
