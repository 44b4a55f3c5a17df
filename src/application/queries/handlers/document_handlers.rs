//! Document Query Handlers

use serde::Serialize;
use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{DocumentRepositoryPort, FileStoragePort};
use crate::application::queries::{GetDocument, GetFileUrls, ListUserDocuments};
use crate::domain::document::{Document, UserId};

// ============================================================================
// Response DTOs
// ============================================================================

/// 文档摘要信息（列表用）
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub title: String,
    pub file_id: String,
    pub file_type: String,
    pub mime_type: Option<String>,
    pub has_summary: bool,
    pub has_text: bool,
    pub cached_audio: usize,
    pub created_at: String,
}

impl From<&Document> for DocumentResponse {
    fn from(document: &Document) -> Self {
        Self {
            id: document.id().as_str().to_string(),
            title: document.title().as_str().to_string(),
            file_id: document.file_id().as_str().to_string(),
            file_type: document.file_type().as_str().to_string(),
            mime_type: document.mime_type().map(str::to_string),
            has_summary: document.has_summary(),
            has_text: document.full_text().is_some(),
            cached_audio: document.manifest().len(),
            created_at: document.created_at().to_rfc3339(),
        }
    }
}

/// 文件地址响应
#[derive(Debug, Clone, Serialize)]
pub struct FileUrlsResponse {
    pub view_url: String,
    pub download_url: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// ListUserDocuments Handler
pub struct ListUserDocumentsHandler {
    documents: Arc<dyn DocumentRepositoryPort>,
}

impl ListUserDocumentsHandler {
    pub fn new(documents: Arc<dyn DocumentRepositoryPort>) -> Self {
        Self { documents }
    }

    pub async fn handle(&self, query: ListUserDocuments) -> Result<Vec<DocumentResponse>, ApplicationError> {
        let Ok(owner) = UserId::new(query.user_id) else {
            return Ok(Vec::new());
        };

        let documents = self.documents.find_by_owner(&owner).await?;
        tracing::debug!(user_id = %owner, count = documents.len(), "Listed documents");

        Ok(documents.iter().map(DocumentResponse::from).collect())
    }
}

/// GetDocument Handler
pub struct GetDocumentHandler {
    documents: Arc<dyn DocumentRepositoryPort>,
}

impl GetDocumentHandler {
    pub fn new(documents: Arc<dyn DocumentRepositoryPort>) -> Self {
        Self { documents }
    }

    pub async fn handle(&self, query: GetDocument) -> Result<Document, ApplicationError> {
        self.documents
            .find_by_id(&query.document_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Document", query.document_id.as_str()))
    }
}

/// GetFileUrls Handler
pub struct GetFileUrlsHandler {
    documents: Arc<dyn DocumentRepositoryPort>,
    files: Arc<dyn FileStoragePort>,
}

impl GetFileUrlsHandler {
    pub fn new(documents: Arc<dyn DocumentRepositoryPort>, files: Arc<dyn FileStoragePort>) -> Self {
        Self { documents, files }
    }

    pub async fn handle(&self, query: GetFileUrls) -> Result<FileUrlsResponse, ApplicationError> {
        let document = self
            .documents
            .find_by_id(&query.document_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Document", query.document_id.as_str()))?;

        Ok(FileUrlsResponse {
            view_url: self.files.view_url(document.file_id()),
            download_url: self.files.download_url(document.file_id()),
        })
    }
}
