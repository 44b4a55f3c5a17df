//! Document Store Ports - 出站端口
//!
//! 文档记录与原文件都保存在远端服务中，本地只定义抽象接口

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::document::{Document, DocumentId, FileId, UserId};

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// ============================================================================
// Document Repository
// ============================================================================

/// 可单独更新的文档字段（远端字段名）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentField {
    ExtractedText,
    TextContent,
    Summary,
    /// 语音缓存清单
    TtsSummaryParts,
}

impl DocumentField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentField::ExtractedText => "extractedText",
            DocumentField::TextContent => "textContent",
            DocumentField::Summary => "summary",
            DocumentField::TtsSummaryParts => "ttsSummaryParts",
        }
    }
}

/// Document Repository Port
#[async_trait]
pub trait DocumentRepositoryPort: Send + Sync {
    /// 创建文档记录
    async fn create(&self, document: &Document) -> Result<(), RepositoryError>;

    /// 根据 ID 查找文档
    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError>;

    /// 获取用户的所有文档（按创建时间倒序）
    async fn find_by_owner(&self, owner: &UserId) -> Result<Vec<Document>, RepositoryError>;

    /// 更新单个字段
    async fn update_field(
        &self,
        id: &DocumentId,
        field: DocumentField,
        value: &str,
    ) -> Result<(), RepositoryError>;

    /// 删除文档记录
    async fn delete(&self, id: &DocumentId) -> Result<(), RepositoryError>;
}

// ============================================================================
// File Storage
// ============================================================================

/// 文件存储错误
#[derive(Debug, Error)]
pub enum FileStorageError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Storage error: {0}")]
    BackendError(String),
}

/// 待上传的本地文件
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: Option<String>,
    pub path: PathBuf,
}

impl UploadFile {
    pub fn mime_type_or_default(&self) -> &str {
        self.mime_type.as_deref().unwrap_or("application/octet-stream")
    }
}

/// File Storage Port - 文档原文件存储
#[async_trait]
pub trait FileStoragePort: Send + Sync {
    /// 上传文件，返回文件 ID
    async fn upload(&self, file: &UploadFile) -> Result<FileId, FileStorageError>;

    /// 删除文件
    async fn delete(&self, file_id: &FileId) -> Result<(), FileStorageError>;

    /// 浏览 URL
    fn view_url(&self, file_id: &FileId) -> String;

    /// 下载 URL（供远端函数读取原文件）
    fn download_url(&self, file_id: &FileId) -> String;
}
