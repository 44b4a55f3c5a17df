//! Document Context - Errors

use thiserror::Error;

use super::DocumentId;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("文档不存在: {0}")]
    NotFound(DocumentId),

    #[error("无效的文档字段: {0}")]
    InvalidField(String),

    #[error("无效的文件: {0}")]
    InvalidFile(String),
}
