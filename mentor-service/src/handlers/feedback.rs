use crate::dtos::feedback::{FeedbackResponse, ResolveFeedbackRequest, SubmitFeedbackRequest};
use crate::handlers::require_admin;
use crate::middleware::UserId;
use crate::models::Feedback;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

/// Anyone may submit feedback; an authenticated caller gets attributed.
pub async fn submit_feedback(
    State(state): State<AppState>,
    user_id: Option<UserId>,
    Json(payload): Json<SubmitFeedbackRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let message = payload.message.trim().to_string();
    if message.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Feedback message cannot be empty"
        )));
    }

    let email = payload
        .email
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty());

    let feedback = Feedback::new(message, email, user_id.map(|u| u.0));
    state.db.insert_feedback(&feedback).await?;

    Ok(StatusCode::CREATED)
}

/// Newest first, with submitter names joined in. Admin only.
pub async fn list_feedback(
    State(state): State<AppState>,
    user_id: UserId,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state.db, &user_id.0).await?;

    let items = state.db.list_feedback().await?;

    let mut responses = Vec::with_capacity(items.len());
    for item in items {
        let user_name = match &item.user_id {
            Some(user_id) => state
                .db
                .get_user(user_id)
                .await?
                .map(|user| user.display_name().to_string()),
            None => None,
        };
        responses.push(FeedbackResponse::from_model(item, user_name));
    }

    Ok(Json(responses))
}

pub async fn set_feedback_resolved(
    State(state): State<AppState>,
    user_id: UserId,
    Path(feedback_id): Path<String>,
    Json(payload): Json<ResolveFeedbackRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state.db, &user_id.0).await?;

    let updated = state
        .db
        .set_feedback_resolved(&feedback_id, payload.is_resolved)
        .await?;
    if !updated {
        return Err(AppError::NotFound(anyhow::anyhow!("Feedback not found")));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_feedback(
    State(state): State<AppState>,
    user_id: UserId,
    Path(feedback_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state.db, &user_id.0).await?;

    let deleted = state.db.delete_feedback(&feedback_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Feedback not found")));
    }

    Ok(StatusCode::NO_CONTENT)
}
