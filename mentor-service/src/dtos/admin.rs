use crate::models::Memory;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct MemoryListParams {
    pub user_id: Option<String>,
    pub mentor_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MemoryAdminResponse {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub mentor_id: String,
    pub mentor_name: String,
    pub key_points: Vec<String>,
    pub conversation_count: i32,
    pub updated_at: String,
}

impl MemoryAdminResponse {
    pub fn from_model(memory: Memory, user_name: String, mentor_name: String) -> Self {
        Self {
            id: memory.id,
            user_id: memory.user_id,
            user_name,
            mentor_id: memory.mentor_id,
            mentor_name,
            key_points: memory.key_points,
            conversation_count: memory.conversation_count,
            updated_at: memory.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemoryStatsResponse {
    pub total_memories: usize,
    pub total_conversations: i64,
    pub average_key_points: f64,
    pub most_active: Vec<MemoryActivity>,
}

#[derive(Debug, Serialize)]
pub struct MemoryActivity {
    pub user_id: String,
    pub mentor_id: String,
    pub conversation_count: i32,
}
