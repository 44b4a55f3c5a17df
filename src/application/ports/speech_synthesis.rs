//! Speech Synthesis Port - 语音合成抽象
//!
//! 远端合成服务接收文本，返回一个可下载的音频资源引用

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::document::FileId;

/// 合成错误
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    /// 服务返回的错误信息（{error} 字段或非成功状态码的响应体）
    #[error("{0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 已合成的音频资源引用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioAsset {
    pub file_id: FileId,
}

impl AudioAsset {
    pub fn new(file_id: FileId) -> Self {
        Self { file_id }
    }
}

/// Speech Synthesis Port
#[async_trait]
pub trait SpeechSynthesisPort: Send + Sync {
    /// 提交文本进行合成，返回音频资源引用
    async fn synthesize(&self, text: &str) -> Result<AudioAsset, SynthesisError>;

    /// 检查合成服务是否可用
    async fn health_check(&self) -> bool {
        true
    }
}
