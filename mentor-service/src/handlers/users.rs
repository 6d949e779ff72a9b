use crate::dtos::users::{ProfileResponse, UpdateProfileRequest};
use crate::middleware::UserId;
use crate::models::UserProfile;
use crate::services::ImageStore;
use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use service_core::error::AppError;
use validator::Validate;

pub async fn get_profile(
    State(state): State<AppState>,
    user_id: UserId,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .db
        .get_user(&user_id.0)
        .await?
        .unwrap_or_else(|| UserProfile::new(user_id.0.clone()));

    let image_url = match &user.profile_image {
        Some(image_id) => state.images.resolve_url(image_id).await?,
        None => None,
    };

    Ok(Json(ProfileResponse::from_model(user, image_url)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user_id: UserId,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    state
        .db
        .patch_user_profile(
            &user_id.0,
            payload.name.as_deref(),
            payload.bio.as_deref(),
            payload.goals.as_deref(),
            payload.interests.as_deref(),
            payload.profile_image.as_deref(),
        )
        .await?;

    let user = state
        .db
        .get_user(&user_id.0)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Profile not found")))?;

    let image_url = match &user.profile_image {
        Some(image_id) => state.images.resolve_url(image_id).await?,
        None => None,
    };

    Ok(Json(ProfileResponse::from_model(user, image_url)))
}
