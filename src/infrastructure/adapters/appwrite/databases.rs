//! Appwrite Databases 适配器 - 文档记录

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};

use super::client::{read_body, read_json, AppwriteClient, Failure};
use crate::application::ports::{DocumentField, DocumentRepositoryPort, RepositoryError};
use crate::domain::document::{
    Document, DocumentError, DocumentId, FileId, FileType, Title, UserId,
};

impl From<Failure> for RepositoryError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Network(msg) => RepositoryError::NetworkError(msg),
            Failure::Timeout => RepositoryError::NetworkError("Request timeout".to_string()),
            Failure::Remote { message, .. } => RepositoryError::BackendError(message),
            Failure::Invalid(msg) => RepositoryError::SerializationError(msg),
        }
    }
}

/// 远端文档记录
#[derive(Debug, Deserialize)]
struct DocumentDto {
    #[serde(rename = "$id")]
    id: String,
    #[serde(rename = "$createdAt", default)]
    created_at: Option<String>,
    #[serde(rename = "userID", default)]
    user_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "fileId", default)]
    file_id: Option<String>,
    #[serde(rename = "fileType", default)]
    file_type: Option<String>,
    #[serde(rename = "mimeType", default)]
    mime_type: Option<String>,
    #[serde(rename = "extractedText", default)]
    extracted_text: Option<String>,
    #[serde(rename = "textContent", default)]
    text_content: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(rename = "ttsSummaryParts", default)]
    tts_summary_parts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DocumentListDto {
    #[serde(default)]
    documents: Vec<DocumentDto>,
}

impl TryFrom<DocumentDto> for Document {
    type Error = DocumentError;

    fn try_from(dto: DocumentDto) -> Result<Self, Self::Error> {
        let invalid = |field: &str| DocumentError::InvalidField(format!("{} ({})", field, dto.id));

        let id = DocumentId::new(dto.id.clone()).map_err(|_| invalid("$id"))?;
        let owner = UserId::new(dto.user_id.unwrap_or_default()).map_err(|_| invalid("userID"))?;
        let title = Title::new(dto.title.unwrap_or_default()).map_err(|_| invalid("title"))?;
        let file_id = FileId::new(dto.file_id.unwrap_or_default()).map_err(|_| invalid("fileId"))?;

        let mut document = Document::new(id, owner, title, file_id, dto.mime_type.unwrap_or_default());
        if let Some(file_type) = dto.file_type.filter(|t| !t.is_empty()) {
            document = document.with_file_type(FileType::from_str(&file_type));
        }
        if let Some(created_at) = dto
            .created_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        {
            document = document.with_created_at(created_at.with_timezone(&Utc));
        }

        document.set_extracted_text(dto.extracted_text.unwrap_or_default());
        document.set_text_content(dto.text_content.unwrap_or_default());
        document.set_summary(dto.summary.unwrap_or_default());
        document.set_tts_summary_parts(dto.tts_summary_parts.unwrap_or_default());
        Ok(document)
    }
}

fn to_document(value: Value) -> Result<Document, RepositoryError> {
    let dto: DocumentDto = serde_json::from_value(value)
        .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
    Document::try_from(dto).map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

/// 新建文档时写入的字段
fn document_data(document: &Document) -> Value {
    json!({
        "userID": document.owner().as_str(),
        "title": document.title().as_str(),
        "fileId": document.file_id().as_str(),
        "fileType": document.file_type().as_str(),
        "mimeType": document.mime_type().unwrap_or_default(),
        "extractedText": document.extracted_text(),
        "textContent": document.text_content(),
        "summary": document.summary(),
        "ttsSummaryParts": document.tts_summary_parts(),
    })
}

/// Appwrite 文档 Repository
pub struct AppwriteDocumentRepository {
    client: AppwriteClient,
    database_id: String,
    collection_id: String,
}

impl AppwriteDocumentRepository {
    pub fn new(client: AppwriteClient, database_id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            client,
            database_id: database_id.into(),
            collection_id: collection_id.into(),
        }
    }

    fn documents_path(&self) -> String {
        format!(
            "/databases/{}/collections/{}/documents",
            self.database_id, self.collection_id
        )
    }

    fn document_path(&self, id: &DocumentId) -> String {
        format!("{}/{}", self.documents_path(), id)
    }
}

#[async_trait]
impl DocumentRepositoryPort for AppwriteDocumentRepository {
    async fn create(&self, document: &Document) -> Result<(), RepositoryError> {
        let body = json!({
            "documentId": document.id().as_str(),
            "data": document_data(document),
        });

        let response = self
            .client
            .request(Method::POST, &self.documents_path())
            .json(&body)
            .send()
            .await
            .map_err(Failure::from)?;

        match read_json(response).await {
            Ok(_) => {
                tracing::debug!(document_id = %document.id(), "Document record created");
                Ok(())
            }
            Err(Failure::Remote {
                status: Some(status),
                message,
            }) if status == reqwest::StatusCode::CONFLICT => Err(RepositoryError::Duplicate(message)),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError> {
        let response = self
            .client
            .request(Method::GET, &self.document_path(id))
            .send()
            .await
            .map_err(Failure::from)?;

        match read_json(response).await {
            Ok(value) => to_document(value).map(Some),
            Err(failure) if failure.is_not_found() => Ok(None),
            Err(failure) => Err(failure.into()),
        }
    }

    async fn find_by_owner(&self, owner: &UserId) -> Result<Vec<Document>, RepositoryError> {
        let queries = [
            json!({"method": "equal", "attribute": "userID", "values": [owner.as_str()]}).to_string(),
            json!({"method": "orderDesc", "attribute": "$createdAt"}).to_string(),
        ];
        let params: Vec<(&str, &str)> = queries.iter().map(|q| ("queries[]", q.as_str())).collect();

        let response = self
            .client
            .request(Method::GET, &self.documents_path())
            .query(&params)
            .send()
            .await
            .map_err(Failure::from)?;

        let value = read_json(response).await?;
        let list: DocumentListDto = serde_json::from_value(value)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;

        let mut documents = Vec::with_capacity(list.documents.len());
        for dto in list.documents {
            let id = dto.id.clone();
            match Document::try_from(dto) {
                Ok(document) => documents.push(document),
                // 单条损坏的记录不影响列表
                Err(e) => tracing::warn!(document_id = %id, error = %e, "Skipping malformed document"),
            }
        }
        documents.sort_by_key(|d| std::cmp::Reverse(d.created_at()));
        Ok(documents)
    }

    async fn update_field(
        &self,
        id: &DocumentId,
        field: DocumentField,
        value: &str,
    ) -> Result<(), RepositoryError> {
        let mut data = serde_json::Map::new();
        data.insert(field.as_str().to_string(), Value::String(value.to_string()));

        let response = self
            .client
            .request(Method::PATCH, &self.document_path(id))
            .json(&json!({ "data": data }))
            .send()
            .await
            .map_err(Failure::from)?;

        match read_json(response).await {
            Ok(_) => {
                tracing::debug!(document_id = %id, field = field.as_str(), "Document field updated");
                Ok(())
            }
            Err(failure) if failure.is_not_found() => Err(RepositoryError::NotFound(id.to_string())),
            Err(failure) => Err(failure.into()),
        }
    }

    async fn delete(&self, id: &DocumentId) -> Result<(), RepositoryError> {
        let response = self
            .client
            .request(Method::DELETE, &self.document_path(id))
            .send()
            .await
            .map_err(Failure::from)?;

        match read_body(response).await {
            Ok(_) => Ok(()),
            Err(failure) if failure.is_not_found() => Err(RepositoryError::NotFound(id.to_string())),
            Err(failure) => Err(failure.into()),
        }
    }
}
