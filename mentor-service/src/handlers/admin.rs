use crate::dtos::admin::{
    MemoryActivity, MemoryAdminResponse, MemoryListParams, MemoryStatsResponse,
};
use crate::handlers::require_admin;
use crate::middleware::UserId;
use crate::startup::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

/// Relationship memories, optionally filtered to a user and/or mentor,
/// with display names joined in for the moderation panel.
pub async fn list_memories(
    State(state): State<AppState>,
    user_id: UserId,
    Query(params): Query<MemoryListParams>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state.db, &user_id.0).await?;

    let memories = state
        .db
        .list_memories(params.user_id.as_deref(), params.mentor_id.as_deref())
        .await?;

    let mut responses = Vec::with_capacity(memories.len());
    for memory in memories {
        let user_name = state
            .db
            .get_user(&memory.user_id)
            .await?
            .map(|user| user.display_name().to_string())
            .unwrap_or_else(|| "Unknown User".to_string());
        let mentor_name = state
            .db
            .get_mentor(&memory.mentor_id)
            .await?
            .map(|mentor| mentor.name)
            .unwrap_or_else(|| "Unknown Mentor".to_string());

        responses.push(MemoryAdminResponse::from_model(memory, user_name, mentor_name));
    }

    Ok(Json(responses))
}

pub async fn memory_stats(
    State(state): State<AppState>,
    user_id: UserId,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state.db, &user_id.0).await?;

    let mut memories = state.db.list_memories(None, None).await?;

    let total_memories = memories.len();
    let total_conversations: i64 = memories
        .iter()
        .map(|memory| memory.conversation_count as i64)
        .sum();
    let average_key_points = if memories.is_empty() {
        0.0
    } else {
        memories
            .iter()
            .map(|memory| memory.key_points.len() as f64)
            .sum::<f64>()
            / memories.len() as f64
    };

    memories.sort_by(|a, b| b.conversation_count.cmp(&a.conversation_count));
    let most_active = memories
        .into_iter()
        .take(5)
        .map(|memory| MemoryActivity {
            user_id: memory.user_id,
            mentor_id: memory.mentor_id,
            conversation_count: memory.conversation_count,
        })
        .collect();

    Ok(Json(MemoryStatsResponse {
        total_memories,
        total_conversations,
        average_key_points,
        most_active,
    }))
}
