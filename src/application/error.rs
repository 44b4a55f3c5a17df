//! 应用层错误定义
//!
//! 统一的命令/播放错误类型。传输层错误与远端任务返回的错误在这里归并为
//! 同一套分类，播放控制器只向界面暴露 [`ApplicationError::user_message`]。

use thiserror::Error;

use crate::application::ports::{
    AccountError, AssetError, FileStorageError, JobError, PlaybackEngineError, RepositoryError,
    SessionStoreError, SynthesisError,
};

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// 验证错误（缺少 ID、空文本等）
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 网络/HTTP 传输错误
    #[error("Transport error: {0}")]
    TransportError(String),

    /// 远端任务返回了显式错误
    #[error("Remote job error: {0}")]
    RemoteJobError(String),

    /// 播放引擎加载/播放失败
    #[error("Playback error: {0}")]
    PlaybackError(String),

    /// 缓存清单写回失败（只记录日志，不影响播放）
    #[error("Cache write error: {0}")]
    CacheWriteError(String),

    /// 未登录、凭据错误或会话失效
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 仓储错误
    #[error("Repository error: {0}")]
    RepositoryError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 面向用户的错误信息（不含分类前缀）
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource_type, id } => format!("{} not found: {}", resource_type, id),
            Self::ValidationError(msg)
            | Self::TransportError(msg)
            | Self::RemoteJobError(msg)
            | Self::PlaybackError(msg)
            | Self::CacheWriteError(msg)
            | Self::AuthError(msg)
            | Self::InvalidState(msg)
            | Self::RepositoryError(msg) => msg.clone(),
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => Self::not_found("Document", id),
            RepositoryError::NetworkError(msg) => Self::TransportError(format!("Network error: {}", msg)),
            other => Self::RepositoryError(other.to_string()),
        }
    }
}

impl From<FileStorageError> for ApplicationError {
    fn from(err: FileStorageError) -> Self {
        match err {
            FileStorageError::FileNotFound(id) => Self::not_found("File", id),
            FileStorageError::NetworkError(msg) => Self::TransportError(format!("Network error: {}", msg)),
            other => Self::RepositoryError(other.to_string()),
        }
    }
}

impl From<JobError> for ApplicationError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Remote(msg) => Self::RemoteJobError(msg),
            JobError::Timeout => Self::TransportError("Request timed out".to_string()),
            other => Self::TransportError(other.to_string()),
        }
    }
}

impl From<SynthesisError> for ApplicationError {
    fn from(err: SynthesisError) -> Self {
        match err {
            SynthesisError::ServiceError(msg) => Self::RemoteJobError(msg),
            SynthesisError::Timeout => Self::TransportError("Speech synthesis timed out".to_string()),
            other => Self::TransportError(other.to_string()),
        }
    }
}

impl From<AssetError> for ApplicationError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::Timeout => Self::TransportError("Audio download timed out".to_string()),
            other => Self::TransportError(format!("Audio download failed: {}", other)),
        }
    }
}

impl From<AccountError> for ApplicationError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Unauthorized(msg) => Self::AuthError(msg),
            AccountError::Conflict(msg) | AccountError::Remote(msg) => Self::RemoteJobError(msg),
            AccountError::Timeout => Self::TransportError("Request timed out".to_string()),
            other => Self::TransportError(other.to_string()),
        }
    }
}

impl From<SessionStoreError> for ApplicationError {
    fn from(err: SessionStoreError) -> Self {
        Self::RepositoryError(format!("Session store: {}", err))
    }
}

impl From<PlaybackEngineError> for ApplicationError {
    fn from(err: PlaybackEngineError) -> Self {
        Self::PlaybackError(err.to_string())
    }
}
