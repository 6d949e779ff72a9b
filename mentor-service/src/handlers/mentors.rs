use crate::dtos::mentors::{
    CreateMentorRequest, MentorListParams, MentorResponse, UpdateMentorRequest,
};
use crate::handlers::require_admin;
use crate::middleware::UserId;
use crate::models::Mentor;
use crate::services::ImageStore;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

async fn to_response(state: &AppState, mentor: Mentor) -> Result<MentorResponse, AppError> {
    let image_url = match &mentor.profile_image {
        Some(image_id) => state.images.resolve_url(image_id).await?,
        None => None,
    };
    Ok(MentorResponse::from_model(mentor, image_url))
}

/// Active mentors, optionally filtered by a fuzzy category match: a
/// mentor matches when either string contains the other.
pub async fn list_mentors(
    State(state): State<AppState>,
    Query(params): Query<MentorListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut mentors = state.db.list_mentors(false).await?;

    if let Some(category) = params
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty())
    {
        let needle = category.to_lowercase();
        mentors.retain(|mentor| {
            mentor.categories.iter().any(|cat| {
                let cat = cat.to_lowercase();
                cat.contains(&needle) || needle.contains(&cat)
            })
        });
    }

    let mut responses = Vec::with_capacity(mentors.len());
    for mentor in mentors {
        responses.push(to_response(&state, mentor).await?);
    }

    Ok(Json(responses))
}

/// All mentors including deactivated ones. Admin only.
pub async fn list_all_mentors(
    State(state): State<AppState>,
    user_id: UserId,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state.db, &user_id.0).await?;

    let mentors = state.db.list_mentors(true).await?;
    let mut responses = Vec::with_capacity(mentors.len());
    for mentor in mentors {
        responses.push(to_response(&state, mentor).await?);
    }

    Ok(Json(responses))
}

pub async fn get_mentor(
    State(state): State<AppState>,
    Path(mentor_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mentor = state
        .db
        .get_mentor(&mentor_id)
        .await?
        .filter(|mentor| mentor.is_active)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Mentor not found")))?;

    Ok(Json(to_response(&state, mentor).await?))
}

pub async fn create_mentor(
    State(state): State<AppState>,
    user_id: UserId,
    Json(payload): Json<CreateMentorRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state.db, &user_id.0).await?;
    payload.validate()?;

    let mentor = Mentor::new(
        payload.name,
        payload.bio,
        payload.categories,
        payload.persona_prompt,
        payload.profile_image,
        Some(user_id.0),
    );
    state.db.insert_mentor(&mentor).await?;

    tracing::info!(mentor_id = %mentor.id, name = %mentor.name, "Mentor created");

    Ok((StatusCode::CREATED, Json(to_response(&state, mentor).await?)))
}

pub async fn update_mentor(
    State(state): State<AppState>,
    user_id: UserId,
    Path(mentor_id): Path<String>,
    Json(payload): Json<UpdateMentorRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state.db, &user_id.0).await?;
    payload.validate()?;

    state
        .db
        .get_mentor(&mentor_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Mentor not found")))?;

    state
        .db
        .update_mentor(
            &mentor_id,
            &payload.name,
            &payload.bio,
            &payload.categories,
            &payload.persona_prompt,
            payload.profile_image.as_deref(),
        )
        .await?;

    let mentor = state
        .db
        .get_mentor(&mentor_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Mentor not found")))?;

    Ok(Json(to_response(&state, mentor).await?))
}

/// Soft delete. Chats referencing the mentor keep working against the
/// stored history; new completions refuse inactive mentors.
pub async fn deactivate_mentor(
    State(state): State<AppState>,
    user_id: UserId,
    Path(mentor_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state.db, &user_id.0).await?;
    set_active(&state, &mentor_id, false).await
}

pub async fn reactivate_mentor(
    State(state): State<AppState>,
    user_id: UserId,
    Path(mentor_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state.db, &user_id.0).await?;
    set_active(&state, &mentor_id, true).await
}

async fn set_active(
    state: &AppState,
    mentor_id: &str,
    active: bool,
) -> Result<impl IntoResponse, AppError> {
    state
        .db
        .get_mentor(mentor_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Mentor not found")))?;

    state.db.set_mentor_active(mentor_id, active).await?;

    tracing::info!(mentor_id, active, "Mentor active flag updated");

    Ok(StatusCode::NO_CONTENT)
}
