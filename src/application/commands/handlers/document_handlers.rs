//! Document Command Handlers - 上传与删除

use futures_util::future::join_all;
use std::sync::Arc;

use crate::application::commands::{DeleteDocument, UploadDocument};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AudioAsset, AudioAssetPort, DocumentRepositoryPort, FileStoragePort,
};
use crate::domain::document::{Document, DocumentId, Title, UserId};

// ============================================================================
// UploadDocument
// ============================================================================

/// UploadDocument Handler - 上传原文件并创建文档记录
pub struct UploadDocumentHandler {
    documents: Arc<dyn DocumentRepositoryPort>,
    files: Arc<dyn FileStoragePort>,
}

impl UploadDocumentHandler {
    pub fn new(documents: Arc<dyn DocumentRepositoryPort>, files: Arc<dyn FileStoragePort>) -> Self {
        Self { documents, files }
    }

    pub async fn handle(&self, command: UploadDocument) -> Result<Document, ApplicationError> {
        let owner = UserId::new(command.user_id)
            .map_err(|_| ApplicationError::validation("Missing userId (you must be logged in)."))?;

        let file = command.file;
        let title = Title::new(file.name.clone())
            .map_err(|_| ApplicationError::validation("Invalid file selected."))?;
        if !tokio::fs::try_exists(&file.path).await.unwrap_or(false) {
            tracing::warn!(path = %file.path.display(), "Upload file does not exist");
            return Err(ApplicationError::validation("Invalid file selected."));
        }

        let file_id = self.files.upload(&file).await?;

        let document = Document::new(
            DocumentId::unique(),
            owner,
            title,
            file_id.clone(),
            file.mime_type_or_default(),
        );

        if let Err(e) = self.documents.create(&document).await {
            // 记录创建失败时不保留孤立文件
            if let Err(cleanup) = self.files.delete(&file_id).await {
                tracing::warn!(file_id = %file_id, error = %cleanup, "Failed to remove orphaned upload");
            }
            return Err(e.into());
        }

        tracing::info!(
            document_id = %document.id(),
            file_id = %file_id,
            file_type = document.file_type().as_str(),
            "Document uploaded"
        );

        Ok(document)
    }
}

// ============================================================================
// DeleteDocument
// ============================================================================

/// 删除结果
///
/// 文档记录删除失败时整体返回错误；原文件和音频删除失败只记录在 failures 中
#[derive(Debug, Clone)]
pub struct DeleteDocumentResponse {
    pub document_id: DocumentId,
    pub file_deleted: bool,
    pub audio_deleted: usize,
    pub failures: Vec<String>,
}

/// DeleteDocument Handler
pub struct DeleteDocumentHandler {
    documents: Arc<dyn DocumentRepositoryPort>,
    files: Arc<dyn FileStoragePort>,
    assets: Arc<dyn AudioAssetPort>,
}

impl DeleteDocumentHandler {
    pub fn new(
        documents: Arc<dyn DocumentRepositoryPort>,
        files: Arc<dyn FileStoragePort>,
        assets: Arc<dyn AudioAssetPort>,
    ) -> Self {
        Self {
            documents,
            files,
            assets,
        }
    }

    pub async fn handle(&self, command: DeleteDocument) -> Result<DeleteDocumentResponse, ApplicationError> {
        let document_id = command.document_id;

        let document = self
            .documents
            .find_by_id(&document_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Document", document_id.as_str()))?;

        let audio: Vec<AudioAsset> = document
            .manifest()
            .file_ids()
            .cloned()
            .map(AudioAsset::new)
            .collect();

        // 远端不保证级联删除，三类删除同时发出
        let (record, file, audio_results) = tokio::join!(
            self.documents.delete(&document_id),
            self.files.delete(document.file_id()),
            join_all(audio.iter().map(|asset| self.assets.delete(asset))),
        );

        record?;

        let mut failures = Vec::new();
        let file_deleted = match file {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    document_id = %document_id,
                    file_id = %document.file_id(),
                    error = %e,
                    "Failed to delete stored file"
                );
                failures.push(format!("file {}: {}", document.file_id(), e));
                false
            }
        };

        let mut audio_deleted = 0;
        for (asset, result) in audio.iter().zip(audio_results) {
            match result {
                Ok(()) => audio_deleted += 1,
                Err(e) => {
                    tracing::warn!(
                        document_id = %document_id,
                        file_id = %asset.file_id,
                        error = %e,
                        "Failed to delete audio asset"
                    );
                    failures.push(format!("audio {}: {}", asset.file_id, e));
                }
            }
        }

        tracing::info!(
            document_id = %document_id,
            title = %document.title(),
            file_deleted,
            audio_deleted,
            failures = failures.len(),
            "Document deleted"
        );

        Ok(DeleteDocumentResponse {
            document_id,
            file_deleted,
            audio_deleted,
            failures,
        })
    }
}
