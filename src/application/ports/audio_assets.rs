//! Audio Asset Port - 已合成音频的存在性检查、下载与删除

use async_trait::async_trait;
use thiserror::Error;

use super::AudioAsset;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Audio asset not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Storage error: {0}")]
    StorageError(String),
}

/// 下载到本地的音频数据
#[derive(Debug, Clone)]
pub struct AudioResource {
    pub asset: AudioAsset,
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

/// Audio Asset Port
///
/// 缓存命中只跳过合成，音频内容仍需通过 fetch 获取
#[async_trait]
pub trait AudioAssetPort: Send + Sync {
    /// 资源是否仍可解析
    async fn exists(&self, asset: &AudioAsset) -> Result<bool, AssetError>;

    /// 下载音频数据
    async fn fetch(&self, asset: &AudioAsset) -> Result<AudioResource, AssetError>;

    /// 删除音频资源
    async fn delete(&self, asset: &AudioAsset) -> Result<(), AssetError>;
}
