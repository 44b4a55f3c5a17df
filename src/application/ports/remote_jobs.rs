//! Remote Job Port - 远端文档处理任务
//!
//! 文本提取与摘要由远端函数执行，本地只负责提交请求并解析结果

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::document::{Document, DocumentId, FileId};

/// 远端任务错误
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    /// 远端返回了显式的 error 字段，或非成功状态码附带的错误信息
    #[error("{0}")]
    Remote(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 任务目标文档
///
/// 只有 document_id 是必需的，其余字段存在时一并发送给远端函数
#[derive(Debug, Clone)]
pub struct JobTarget {
    pub document_id: DocumentId,
    pub file_id: Option<FileId>,
    pub file_url: Option<String>,
    pub mime_type: Option<String>,
    pub title: Option<String>,
}

impl JobTarget {
    pub fn new(document_id: DocumentId) -> Self {
        Self {
            document_id,
            file_id: None,
            file_url: None,
            mime_type: None,
            title: None,
        }
    }

    /// 从文档构建，file_url 由文件存储端口生成
    pub fn from_document(document: &Document, file_url: Option<String>) -> Self {
        Self {
            document_id: document.id().clone(),
            file_id: Some(document.file_id().clone()),
            file_url,
            mime_type: document.mime_type().map(str::to_string),
            title: Some(document.title().as_str().to_string()),
        }
    }
}

/// 摘要结果
#[derive(Debug, Clone)]
pub struct SummaryOutcome {
    pub summary: String,
}

/// 文本提取结果
#[derive(Debug, Clone)]
pub struct ExtractOutcome {
    pub text: String,
}

/// Remote Job Port
///
/// 两个任务对调用方都是幂等的
#[async_trait]
pub trait RemoteJobPort: Send + Sync {
    /// 生成摘要
    async fn summarize(&self, target: &JobTarget) -> Result<SummaryOutcome, JobError>;

    /// 提取全文
    async fn extract_text(&self, target: &JobTarget) -> Result<ExtractOutcome, JobError>;
}
