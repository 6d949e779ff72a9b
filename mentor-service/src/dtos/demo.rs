use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct DemoChatRequest {
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
    #[serde(default)]
    pub history: Vec<DemoTurn>,
}

#[derive(Debug, Deserialize)]
pub struct DemoTurn {
    pub content: String,
    pub from_user: bool,
}

#[derive(Debug, Serialize)]
pub struct DemoChatResponse {
    pub reply: String,
}
