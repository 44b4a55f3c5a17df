//! Pipeline Command Handlers - 远端提取/摘要任务与朗读文本准备

use std::sync::Arc;

use crate::application::commands::{
    ExtractDocumentText, ResolveListenText, SummarizeDocument, TextSource,
};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    DocumentField, DocumentRepositoryPort, FileStoragePort, JobTarget, RemoteJobPort,
};
use crate::config::FeatureFlags;
use crate::domain::document::{Document, DocumentId};

/// 远端任务的公共依赖
#[derive(Clone)]
struct JobContext {
    jobs: Arc<dyn RemoteJobPort>,
    documents: Arc<dyn DocumentRepositoryPort>,
    files: Arc<dyn FileStoragePort>,
    flags: FeatureFlags,
}

impl JobContext {
    async fn load(&self, document_id: &DocumentId) -> Result<Document, ApplicationError> {
        self.documents
            .find_by_id(document_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Document", document_id.as_str()))
    }

    fn target(&self, document: &Document) -> JobTarget {
        let file_url = self.files.download_url(document.file_id());
        JobTarget::from_document(document, Some(file_url))
    }

    /// 把任务结果附加到文档；失败只记录日志
    async fn attach(&self, document_id: &DocumentId, field: DocumentField, value: &str) {
        if !self.flags.use_db {
            tracing::debug!(document_id = %document_id, field = field.as_str(), "Database writes disabled, skipping attach");
            return;
        }
        if let Err(e) = self.documents.update_field(document_id, field, value).await {
            tracing::warn!(
                document_id = %document_id,
                field = field.as_str(),
                error = %e,
                "Failed to attach job result"
            );
        }
    }
}

// ============================================================================
// ExtractDocumentText
// ============================================================================

/// ExtractDocumentText Handler
pub struct ExtractTextHandler {
    ctx: JobContext,
}

impl ExtractTextHandler {
    pub fn new(
        jobs: Arc<dyn RemoteJobPort>,
        documents: Arc<dyn DocumentRepositoryPort>,
        files: Arc<dyn FileStoragePort>,
        flags: FeatureFlags,
    ) -> Self {
        Self {
            ctx: JobContext {
                jobs,
                documents,
                files,
                flags,
            },
        }
    }

    pub async fn handle(&self, command: ExtractDocumentText) -> Result<String, ApplicationError> {
        let document = self.ctx.load(&command.document_id).await?;
        self.extract(&document).await
    }

    async fn extract(&self, document: &Document) -> Result<String, ApplicationError> {
        let target = self.ctx.target(document);
        let outcome = self.ctx.jobs.extract_text(&target).await?;

        tracing::info!(
            document_id = %document.id(),
            text_len = outcome.text.len(),
            "Text extracted"
        );

        if !outcome.text.trim().is_empty() {
            self.ctx
                .attach(document.id(), DocumentField::TextContent, &outcome.text)
                .await;
        }
        Ok(outcome.text)
    }
}

// ============================================================================
// SummarizeDocument
// ============================================================================

/// SummarizeDocument Handler
pub struct SummarizeHandler {
    ctx: JobContext,
}

impl SummarizeHandler {
    pub fn new(
        jobs: Arc<dyn RemoteJobPort>,
        documents: Arc<dyn DocumentRepositoryPort>,
        files: Arc<dyn FileStoragePort>,
        flags: FeatureFlags,
    ) -> Self {
        Self {
            ctx: JobContext {
                jobs,
                documents,
                files,
                flags,
            },
        }
    }

    pub async fn handle(&self, command: SummarizeDocument) -> Result<String, ApplicationError> {
        let document = self.ctx.load(&command.document_id).await?;
        self.summarize(&document).await
    }

    async fn summarize(&self, document: &Document) -> Result<String, ApplicationError> {
        let target = self.ctx.target(document);
        let outcome = self.ctx.jobs.summarize(&target).await?;

        tracing::info!(
            document_id = %document.id(),
            summary_len = outcome.summary.len(),
            "Summary generated"
        );

        if !outcome.summary.trim().is_empty() {
            self.ctx
                .attach(document.id(), DocumentField::Summary, &outcome.summary)
                .await;
        }
        Ok(outcome.summary)
    }
}

// ============================================================================
// ResolveListenText
// ============================================================================

/// 准备好的朗读文本
#[derive(Debug, Clone)]
pub struct ListenText {
    pub document_id: DocumentId,
    pub title: String,
    pub text: String,
    /// 实际使用的来源（全文提取失败时可能回退到摘要）
    pub source: TextSource,
}

/// ResolveListenText Handler
///
/// 优先使用文档中已有的文本，只在缺失时触发远端任务
pub struct ResolveListenTextHandler {
    extract: ExtractTextHandler,
    summarize: SummarizeHandler,
}

impl ResolveListenTextHandler {
    pub fn new(
        jobs: Arc<dyn RemoteJobPort>,
        documents: Arc<dyn DocumentRepositoryPort>,
        files: Arc<dyn FileStoragePort>,
        flags: FeatureFlags,
    ) -> Self {
        Self {
            extract: ExtractTextHandler::new(jobs.clone(), documents.clone(), files.clone(), flags),
            summarize: SummarizeHandler::new(jobs, documents, files, flags),
        }
    }

    pub async fn handle(&self, command: ResolveListenText) -> Result<ListenText, ApplicationError> {
        let document = self.extract.ctx.load(&command.document_id).await?;
        let listen = |text: String, source: TextSource| ListenText {
            document_id: document.id().clone(),
            title: document.title().as_str().to_string(),
            text,
            source,
        };

        match command.source {
            TextSource::Summary => {
                if document.has_summary() {
                    return Ok(listen(document.summary().to_string(), TextSource::Summary));
                }
                let summary = self.summarize.summarize(&document).await?;
                if summary.trim().is_empty() {
                    return Err(ApplicationError::validation("Summary is empty"));
                }
                Ok(listen(summary, TextSource::Summary))
            }
            TextSource::FullText => {
                if let Some(text) = document.full_text() {
                    return Ok(listen(text.to_string(), TextSource::FullText));
                }

                let extracted = self.extract.extract(&document).await;
                match extracted {
                    Ok(text) if !text.trim().is_empty() => Ok(listen(text, TextSource::FullText)),
                    other => {
                        if document.has_summary() {
                            // 提取失败不影响已有摘要的朗读
                            tracing::warn!(
                                document_id = %document.id(),
                                error = ?other.err().map(|e| e.user_message()),
                                "Extraction unavailable, falling back to summary"
                            );
                            return Ok(listen(document.summary().to_string(), TextSource::Summary));
                        }
                        match other {
                            Err(e) => Err(e),
                            Ok(_) => Err(ApplicationError::validation("No text could be extracted from this document")),
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{ExtractOutcome, JobError, SummaryOutcome};
    use crate::domain::document::{FileId, Title, UserId};
    use crate::infrastructure::memory::{InMemoryDocumentRepository, InMemoryFileStorage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedJobs {
        summary: Option<Result<String, String>>,
        extract: Option<Result<String, String>>,
        calls: AtomicUsize,
        last_target: Mutex<Option<JobTarget>>,
    }

    #[async_trait]
    impl RemoteJobPort for ScriptedJobs {
        async fn summarize(&self, target: &JobTarget) -> Result<SummaryOutcome, JobError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_target.lock().unwrap() = Some(target.clone());
            match self.summary.clone().unwrap_or(Ok(String::new())) {
                Ok(summary) => Ok(SummaryOutcome { summary }),
                Err(e) => Err(JobError::Remote(e)),
            }
        }

        async fn extract_text(&self, target: &JobTarget) -> Result<ExtractOutcome, JobError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_target.lock().unwrap() = Some(target.clone());
            match self.extract.clone().unwrap_or(Ok(String::new())) {
                Ok(text) => Ok(ExtractOutcome { text }),
                Err(e) => Err(JobError::Remote(e)),
            }
        }
    }

    async fn setup(summary: &str) -> (Arc<InMemoryDocumentRepository>, Arc<InMemoryFileStorage>, DocumentId) {
        let documents = Arc::new(InMemoryDocumentRepository::new());
        let files = Arc::new(InMemoryFileStorage::new());
        let mut document = Document::new(
            DocumentId::new("doc-1").unwrap(),
            UserId::new("user-1").unwrap(),
            Title::new("a.pdf").unwrap(),
            FileId::new("file-1").unwrap(),
            "application/pdf",
        );
        document.set_summary(summary);
        documents.create(&document).await.unwrap();
        (documents, files, document.id().clone())
    }

    fn flags() -> FeatureFlags {
        FeatureFlags { use_db: true }
    }

    #[tokio::test]
    async fn test_extract_attaches_text_content() {
        let (documents, files, id) = setup("").await;
        let jobs = Arc::new(ScriptedJobs {
            extract: Some(Ok("Full text".to_string())),
            ..Default::default()
        });
        let handler = ExtractTextHandler::new(jobs.clone(), documents.clone(), files, flags());

        let text = handler
            .handle(ExtractDocumentText { document_id: id.clone() })
            .await
            .unwrap();
        assert_eq!(text, "Full text");

        let doc = documents.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(doc.text_content(), "Full text");

        let target = jobs.last_target.lock().unwrap().clone().unwrap();
        assert_eq!(target.mime_type.as_deref(), Some("application/pdf"));
        assert!(target.file_url.unwrap().contains("file-1"));
    }

    #[tokio::test]
    async fn test_extract_skips_attach_when_db_disabled() {
        let (documents, files, id) = setup("").await;
        let jobs = Arc::new(ScriptedJobs {
            extract: Some(Ok("Full text".to_string())),
            ..Default::default()
        });
        let handler = ExtractTextHandler::new(jobs, documents.clone(), files, FeatureFlags { use_db: false });

        handler.handle(ExtractDocumentText { document_id: id.clone() }).await.unwrap();
        let doc = documents.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(doc.text_content(), "");
    }

    #[tokio::test]
    async fn test_attach_failure_is_not_fatal() {
        let (documents, files, id) = setup("").await;
        documents.fail_updates(true);
        let jobs = Arc::new(ScriptedJobs {
            summary: Some(Ok("Short summary".to_string())),
            ..Default::default()
        });
        let handler = SummarizeHandler::new(jobs, documents, files, flags());

        let summary = handler.handle(SummarizeDocument { document_id: id }).await.unwrap();
        assert_eq!(summary, "Short summary");
    }

    #[tokio::test]
    async fn test_summarize_error_is_remote_job_error() {
        let (documents, files, id) = setup("").await;
        let jobs = Arc::new(ScriptedJobs {
            summary: Some(Err("model overloaded".to_string())),
            ..Default::default()
        });
        let handler = SummarizeHandler::new(jobs, documents, files, flags());

        let err = handler.handle(SummarizeDocument { document_id: id }).await.unwrap_err();
        assert!(matches!(err, ApplicationError::RemoteJobError(_)));
        assert_eq!(err.user_message(), "model overloaded");
    }

    #[tokio::test]
    async fn test_resolve_uses_existing_summary_without_jobs() {
        let (documents, files, id) = setup("Existing summary").await;
        let jobs = Arc::new(ScriptedJobs::default());
        let handler = ResolveListenTextHandler::new(jobs.clone(), documents, files, flags());

        let listen = handler
            .handle(ResolveListenText {
                document_id: id,
                source: TextSource::Summary,
            })
            .await
            .unwrap();
        assert_eq!(listen.text, "Existing summary");
        assert_eq!(jobs.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolve_full_text_falls_back_to_summary() {
        let (documents, files, id) = setup("Existing summary").await;
        let jobs = Arc::new(ScriptedJobs {
            extract: Some(Err("unsupported file".to_string())),
            ..Default::default()
        });
        let handler = ResolveListenTextHandler::new(jobs, documents, files, flags());

        let listen = handler
            .handle(ResolveListenText {
                document_id: id,
                source: TextSource::FullText,
            })
            .await
            .unwrap();
        assert_eq!(listen.text, "Existing summary");
        assert_eq!(listen.source, TextSource::Summary);
    }

    #[tokio::test]
    async fn test_resolve_full_text_without_summary_fails() {
        let (documents, files, id) = setup("").await;
        let jobs = Arc::new(ScriptedJobs {
            extract: Some(Err("unsupported file".to_string())),
            ..Default::default()
        });
        let handler = ResolveListenTextHandler::new(jobs, documents, files, flags());

        let err = handler
            .handle(ResolveListenText {
                document_id: id,
                source: TextSource::FullText,
            })
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "unsupported file");
    }

    #[tokio::test]
    async fn test_resolve_summary_runs_job_when_missing() {
        let (documents, files, id) = setup("").await;
        let jobs = Arc::new(ScriptedJobs {
            summary: Some(Ok("Fresh summary".to_string())),
            ..Default::default()
        });
        let handler = ResolveListenTextHandler::new(jobs.clone(), documents, files, flags());

        let listen = handler
            .handle(ResolveListenText {
                document_id: id,
                source: TextSource::Summary,
            })
            .await
            .unwrap();
        assert_eq!(listen.text, "Fresh summary");
        assert_eq!(jobs.calls.load(Ordering::SeqCst), 1);
    }
}
