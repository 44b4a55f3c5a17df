//! In-Memory Document Repository

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::application::ports::{DocumentField, DocumentRepositoryPort, RepositoryError};
use crate::domain::document::{Document, DocumentId, UserId};

/// 内存文档 Repository（测试与离线运行）
pub struct InMemoryDocumentRepository {
    documents: DashMap<DocumentId, Document>,
    fail_creates: AtomicBool,
    fail_updates: AtomicBool,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            fail_creates: AtomicBool::new(false),
            fail_updates: AtomicBool::new(false),
        }
    }

    /// 之后的 create 全部失败
    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// 之后的 update_field 全部失败
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl Default for InMemoryDocumentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentRepositoryPort for InMemoryDocumentRepository {
    async fn create(&self, document: &Document) -> Result<(), RepositoryError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(RepositoryError::BackendError("simulated create failure".to_string()));
        }
        if self.documents.contains_key(document.id()) {
            return Err(RepositoryError::Duplicate(document.id().to_string()));
        }
        self.documents.insert(document.id().clone(), document.clone());
        tracing::debug!(document_id = %document.id(), "Document stored in memory");
        Ok(())
    }

    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError> {
        Ok(self.documents.get(id).map(|d| d.clone()))
    }

    async fn find_by_owner(&self, owner: &UserId) -> Result<Vec<Document>, RepositoryError> {
        let mut documents: Vec<Document> = self
            .documents
            .iter()
            .filter(|entry| entry.owner() == owner)
            .map(|entry| entry.value().clone())
            .collect();
        documents.sort_by_key(|d| std::cmp::Reverse(d.created_at()));
        Ok(documents)
    }

    async fn update_field(
        &self,
        id: &DocumentId,
        field: DocumentField,
        value: &str,
    ) -> Result<(), RepositoryError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::BackendError("simulated update failure".to_string()));
        }
        let mut document = self
            .documents
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        match field {
            DocumentField::ExtractedText => document.set_extracted_text(value),
            DocumentField::TextContent => document.set_text_content(value),
            DocumentField::Summary => document.set_summary(value),
            DocumentField::TtsSummaryParts => document.set_tts_summary_parts(value),
        }
        Ok(())
    }

    async fn delete(&self, id: &DocumentId) -> Result<(), RepositoryError> {
        self.documents
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::{FileId, Title};

    fn document(id: &str) -> Document {
        Document::new(
            DocumentId::new(id).unwrap(),
            UserId::new("user-1").unwrap(),
            Title::new("a.txt").unwrap(),
            FileId::new("f").unwrap(),
            "text/plain",
        )
    }

    #[tokio::test]
    async fn test_update_field_and_duplicate() {
        let repo = InMemoryDocumentRepository::new();
        repo.create(&document("d1")).await.unwrap();
        assert!(matches!(
            repo.create(&document("d1")).await,
            Err(RepositoryError::Duplicate(_))
        ));

        let id = DocumentId::new("d1").unwrap();
        repo.update_field(&id, DocumentField::Summary, "short").await.unwrap();
        assert_eq!(repo.find_by_id(&id).await.unwrap().unwrap().summary(), "short");

        repo.delete(&id).await.unwrap();
        assert!(repo.is_empty());
        assert!(repo.update_field(&id, DocumentField::Summary, "x").await.is_err());
    }
}
