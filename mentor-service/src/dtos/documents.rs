use crate::models::{DocumentSource, KnowledgeDocument};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDocumentRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[validate(length(min = 1))]
    pub content: String,
    /// Defaults to a manually entered document.
    pub source: Option<DocumentSource>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub mentor_id: String,
    pub title: String,
    pub content: String,
    pub source: DocumentSource,
    pub uploaded_by: String,
    pub created_at: String,
}

impl From<KnowledgeDocument> for DocumentResponse {
    fn from(document: KnowledgeDocument) -> Self {
        Self {
            id: document.id,
            mentor_id: document.mentor_id,
            title: document.title,
            content: document.content,
            source: document.source,
            uploaded_by: document.uploaded_by,
            created_at: document.created_at.to_rfc3339(),
        }
    }
}
