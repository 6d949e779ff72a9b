use crate::dtos::chats::{
    ChatDetailResponse, ChatSummaryResponse, CreateChatRequest, MessageResponse,
    RenameChatRequest, SendMessageRequest, SendMessageResponse,
};
use crate::dtos::mentors::MentorResponse;
use crate::middleware::UserId;
use crate::models::Chat;
use crate::services::pipeline::SendMode;
use crate::services::ImageStore;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

pub async fn list_chats(
    State(state): State<AppState>,
    user_id: UserId,
) -> Result<impl IntoResponse, AppError> {
    let chats = state.db.list_chats_by_user(&user_id.0).await?;

    let mut responses = Vec::with_capacity(chats.len());
    for chat in chats {
        let mentor = match state.db.get_mentor(&chat.mentor_id).await? {
            Some(mentor) => {
                let image_url = match &mentor.profile_image {
                    Some(image_id) => state.images.resolve_url(image_id).await?,
                    None => None,
                };
                Some(MentorResponse::from_model(mentor, image_url))
            }
            None => None,
        };
        responses.push(ChatSummaryResponse::from_model(chat, mentor));
    }

    Ok(Json(responses))
}

pub async fn create_chat(
    State(state): State<AppState>,
    user_id: UserId,
    Json(payload): Json<CreateChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mentor = state
        .db
        .get_mentor(&payload.mentor_id)
        .await?
        .filter(|mentor| mentor.is_active)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Mentor not found")))?;

    let title = payload
        .title
        .unwrap_or_else(|| Chat::default_title(&mentor.name));
    let chat = Chat::new(user_id.0, mentor.id.clone(), title);
    state.db.insert_chat(&chat).await?;

    tracing::info!(chat_id = %chat.id, mentor_id = %mentor.id, "Chat created");

    Ok((
        StatusCode::CREATED,
        Json(ChatSummaryResponse::from_model(chat, None)),
    ))
}

/// Fetch an owned chat or fail with NotFound; foreign and deleted chats
/// are indistinguishable from missing ones.
async fn owned_chat(state: &AppState, chat_id: &str, user_id: &str) -> Result<Chat, AppError> {
    state
        .db
        .get_chat(chat_id)
        .await?
        .filter(|chat| chat.is_active && chat.user_id == user_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Chat not found")))
}

pub async fn get_chat(
    State(state): State<AppState>,
    user_id: UserId,
    Path(chat_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let chat = owned_chat(&state, &chat_id, &user_id.0).await?;

    let mentor = match state.db.get_mentor(&chat.mentor_id).await? {
        Some(mentor) => {
            let image_url = match &mentor.profile_image {
                Some(image_id) => state.images.resolve_url(image_id).await?,
                None => None,
            };
            Some(MentorResponse::from_model(mentor, image_url))
        }
        None => None,
    };

    let messages = state.db.list_chat_messages(&chat_id).await?;
    let mut message_responses = Vec::with_capacity(messages.len());
    for message in messages {
        let image_url = match &message.image_id {
            Some(image_id) => state.images.resolve_url(image_id).await?,
            None => None,
        };
        message_responses.push(MessageResponse::from_model(message, image_url));
    }

    Ok(Json(ChatDetailResponse {
        id: chat.id,
        title: chat.title,
        mentor,
        messages: message_responses,
        created_at: chat.created_at.to_rfc3339(),
    }))
}

pub async fn rename_chat(
    State(state): State<AppState>,
    user_id: UserId,
    Path(chat_id): Path<String>,
    Json(payload): Json<RenameChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    owned_chat(&state, &chat_id, &user_id.0).await?;

    state.db.rename_chat(&chat_id, &payload.title).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_chat(
    State(state): State<AppState>,
    user_id: UserId,
    Path(chat_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    // Deleting an already-soft-deleted chat is allowed for the owner.
    let chat = state
        .db
        .get_chat(&chat_id)
        .await?
        .filter(|chat| chat.user_id == user_id.0)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Chat not found")))?;

    state.db.delete_chat_cascade(&chat.id).await?;

    tracing::info!(chat_id = %chat.id, "Chat deleted with messages");

    Ok(StatusCode::NO_CONTENT)
}

/// Remove every chat the caller has with a mentor, including messages
/// and the relationship memory for the pair.
pub async fn delete_chats_with_mentor(
    State(state): State<AppState>,
    user_id: UserId,
    Path(mentor_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = state
        .db
        .delete_chats_with_mentor(&user_id.0, &mentor_id)
        .await?;

    tracing::info!(mentor_id, deleted, "Deleted all chats with mentor");

    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state, payload), fields(user_id = %user_id.0))]
pub async fn send_message(
    State(state): State<AppState>,
    user_id: UserId,
    Path(chat_id): Path<String>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let outcome = state
        .pipeline
        .send_message(
            &user_id.0,
            &chat_id,
            &payload.content,
            payload.image_id.as_deref(),
            SendMode::Blocking,
        )
        .await?;

    Ok(Json(SendMessageResponse::from(outcome)))
}

/// Streaming send: the assistant message is created empty and grows in
/// storage while the completion streams; poll the message endpoint to
/// observe it. The response returns once the stream has finished.
#[tracing::instrument(skip(state, payload), fields(user_id = %user_id.0))]
pub async fn send_message_stream(
    State(state): State<AppState>,
    user_id: UserId,
    Path(chat_id): Path<String>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let outcome = state
        .pipeline
        .send_message(
            &user_id.0,
            &chat_id,
            &payload.content,
            payload.image_id.as_deref(),
            SendMode::Streaming,
        )
        .await?;

    Ok(Json(SendMessageResponse::from(outcome)))
}

pub async fn get_message(
    State(state): State<AppState>,
    user_id: UserId,
    Path((chat_id, message_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    owned_chat(&state, &chat_id, &user_id.0).await?;

    let message = state
        .db
        .get_message(&message_id)
        .await?
        .filter(|message| message.chat_id == chat_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Message not found")))?;

    let image_url = match &message.image_id {
        Some(image_id) => state.images.resolve_url(image_id).await?,
        None => None,
    };

    Ok(Json(MessageResponse::from_model(message, image_url)))
}
