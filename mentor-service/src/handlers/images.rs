use crate::middleware::UserId;
use crate::services::storage::{content_type_for, extension_for};
use crate::startup::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use service_core::error::AppError;
use service_core::utils::signature;

const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Direct multipart upload; returns the opaque image id that messages
/// and profiles reference.
pub async fn upload_image(
    State(state): State<AppState>,
    user_id: UserId,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
        })?
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("No file uploaded")))?;

    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e)))?
        .to_vec();

    if data.len() > MAX_IMAGE_BYTES {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Image too large (max 10MB)"
        )));
    }

    let image_id = state
        .images
        .save(data, extension_for(&content_type))
        .await?;

    tracing::info!(image_id = %image_id, uploaded_by = %user_id.0, "Image uploaded");

    Ok((StatusCode::CREATED, Json(json!({ "image_id": image_id }))))
}

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub expires: i64,
    pub signature: String,
}

/// Signed download; links come from `ImageStore::resolve_url` and expire.
pub async fn download_image(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
    Query(params): Query<DownloadParams>,
) -> Result<impl IntoResponse, AppError> {
    signature::validate_image_signature(
        &image_id,
        &params.signature,
        params.expires,
        state.images.signing_secret(),
    )?;

    let data = state.images.open(&image_id).await?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type_for(&image_id))],
        data,
    ))
}
