//! In-Memory Audio Assets

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::application::ports::{AssetError, AudioAsset, AudioAssetPort, AudioResource};
use crate::domain::document::FileId;

/// 内存音频资源存储
pub struct InMemoryAudioAssets {
    assets: DashMap<FileId, Vec<u8>>,
    fetches: AtomicUsize,
    fail_fetches: AtomicBool,
    fetch_delay_ms: AtomicU64,
}

impl InMemoryAudioAssets {
    pub fn new() -> Self {
        Self {
            assets: DashMap::new(),
            fetches: AtomicUsize::new(0),
            fail_fetches: AtomicBool::new(false),
            fetch_delay_ms: AtomicU64::new(0),
        }
    }

    /// 写入音频数据，返回资源引用
    pub fn insert(&self, data: Vec<u8>) -> AudioAsset {
        let file_id = FileId::unique();
        self.assets.insert(file_id.clone(), data);
        AudioAsset::new(file_id)
    }

    /// fetch 调用次数（含失败）
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// 之后的 fetch 全部失败
    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    /// 之后的 fetch 都先等待该时长（模拟慢下载）
    pub fn delay_fetches(&self, delay: Duration) {
        self.fetch_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl Default for InMemoryAudioAssets {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioAssetPort for InMemoryAudioAssets {
    async fn exists(&self, asset: &AudioAsset) -> Result<bool, AssetError> {
        Ok(self.assets.contains_key(&asset.file_id))
    }

    async fn fetch(&self, asset: &AudioAsset) -> Result<AudioResource, AssetError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = self.fetch_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(AssetError::StorageError("simulated fetch failure".to_string()));
        }
        let data = self
            .assets
            .get(&asset.file_id)
            .map(|d| d.clone())
            .ok_or_else(|| AssetError::NotFound(asset.file_id.to_string()))?;

        Ok(AudioResource {
            asset: asset.clone(),
            data,
            content_type: Some("audio/mpeg".to_string()),
        })
    }

    async fn delete(&self, asset: &AudioAsset) -> Result<(), AssetError> {
        self.assets
            .remove(&asset.file_id)
            .map(|_| ())
            .ok_or_else(|| AssetError::NotFound(asset.file_id.to_string()))
    }
}
