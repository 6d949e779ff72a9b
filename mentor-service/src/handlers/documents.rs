use crate::dtos::documents::{CreateDocumentRequest, DocumentResponse, SearchParams};
use crate::handlers::require_admin;
use crate::middleware::UserId;
use crate::models::{DocumentSource, KnowledgeDocument};
use crate::services::context::search_documents;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

/// Add a knowledge-base entry. Only the mentor's owner (or an admin) may
/// extend the mentor's knowledge.
pub async fn create_document(
    State(state): State<AppState>,
    user_id: UserId,
    Path(mentor_id): Path<String>,
    Json(payload): Json<CreateDocumentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mentor = state
        .db
        .get_mentor(&mentor_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Mentor not found")))?;

    if mentor.created_by.as_deref() != Some(user_id.0.as_str())
        && require_admin(&state.db, &user_id.0).await.is_err()
    {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Not authorized to add documents to this mentor"
        )));
    }

    let document = KnowledgeDocument::new(
        mentor_id,
        payload.title,
        payload.content,
        payload.source.unwrap_or(DocumentSource::Manual),
        user_id.0,
    );
    state.db.insert_document(&document).await?;

    tracing::info!(
        document_id = %document.id,
        mentor_id = %document.mentor_id,
        "Knowledge document added"
    );

    Ok((StatusCode::CREATED, Json(DocumentResponse::from(document))))
}

pub async fn list_documents(
    State(state): State<AppState>,
    _user_id: UserId,
    Path(mentor_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state
        .db
        .get_mentor(&mentor_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Mentor not found")))?;

    let documents = state.db.list_active_documents(&mentor_id).await?;
    let responses: Vec<DocumentResponse> =
        documents.into_iter().map(DocumentResponse::from).collect();

    Ok(Json(responses))
}

/// The retriever's bounded substring search, exposed for the knowledge
/// panel: at most the configured number of matches, excerpts truncated.
pub async fn search_mentor_documents(
    State(state): State<AppState>,
    _user_id: UserId,
    Path(mentor_id): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    state
        .db
        .get_mentor(&mentor_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Mentor not found")))?;

    let documents = state.db.list_active_documents(&mentor_id).await?;
    let snippets = search_documents(
        &documents,
        &params.q,
        state.config.pipeline.knowledge_limit,
        state.config.pipeline.snippet_chars,
    );

    Ok(Json(snippets))
}

/// Soft delete; only the uploader may remove a document.
pub async fn delete_document(
    State(state): State<AppState>,
    user_id: UserId,
    Path(document_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let document = state
        .db
        .get_document(&document_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Document not found")))?;

    if document.uploaded_by != user_id.0 {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Not authorized to delete this document"
        )));
    }

    state.db.set_document_active(&document_id, false).await?;

    Ok(StatusCode::NO_CONTENT)
}
