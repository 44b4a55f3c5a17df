//! Audio Cache - 文档级语音缓存读写
//!
//! 缓存清单保存在文档的 ttsSummaryParts 字段中。读取失败一律按未命中处理；
//! 写回失败返回 CacheWriteError，由调用方记录日志，不影响播放。

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{
    AudioAsset, AudioAssetPort, DocumentField, DocumentRepositoryPort,
};
use crate::domain::audio::CacheKey;
use crate::domain::document::DocumentId;

/// 文档语音缓存
pub struct AudioCache {
    documents: Arc<dyn DocumentRepositoryPort>,
    assets: Arc<dyn AudioAssetPort>,
    max_entries: usize,
}

impl AudioCache {
    pub fn new(
        documents: Arc<dyn DocumentRepositoryPort>,
        assets: Arc<dyn AudioAssetPort>,
        max_entries: usize,
    ) -> Self {
        Self {
            documents,
            assets,
            max_entries,
        }
    }

    /// 查找仍可解析的缓存音频
    pub async fn lookup(&self, document_id: &DocumentId, key: &CacheKey) -> Option<AudioAsset> {
        let document = match self.documents.find_by_id(document_id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                tracing::debug!(document_id = %document_id, "Document not found, cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(document_id = %document_id, error = %e, "Failed to read audio manifest");
                return None;
            }
        };

        let asset = document
            .manifest()
            .lookup(key)
            .map(|entry| AudioAsset::new(entry.file_id.clone()))?;

        match self.assets.exists(&asset).await {
            Ok(true) => {
                tracing::debug!(document_id = %document_id, cache_key = %key, file_id = %asset.file_id, "Cache hit");
                Some(asset)
            }
            Ok(false) => {
                tracing::info!(
                    document_id = %document_id,
                    cache_key = %key,
                    file_id = %asset.file_id,
                    "Cached audio no longer resolvable, cache miss"
                );
                None
            }
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "Failed to resolve cached audio");
                None
            }
        }
    }

    /// 记录新合成的音频并写回文档
    ///
    /// 被替换或淘汰的旧音频在写回成功后尽力删除
    pub async fn record(
        &self,
        document_id: &DocumentId,
        key: CacheKey,
        asset: &AudioAsset,
    ) -> Result<(), ApplicationError> {
        let document = self
            .documents
            .find_by_id(document_id)
            .await
            .map_err(|e| ApplicationError::CacheWriteError(e.to_string()))?
            .ok_or_else(|| {
                ApplicationError::CacheWriteError(format!("Document not found: {}", document_id))
            })?;

        let mut manifest = document.manifest();
        let released = manifest.upsert(key.clone(), asset.file_id.clone(), self.max_entries);

        self.documents
            .update_field(document_id, DocumentField::TtsSummaryParts, &manifest.to_field())
            .await
            .map_err(|e| ApplicationError::CacheWriteError(e.to_string()))?;

        tracing::debug!(
            document_id = %document_id,
            cache_key = %key,
            file_id = %asset.file_id,
            entries = manifest.len(),
            "Audio manifest updated"
        );

        for entry in released.into_iter().filter(|e| e.file_id != asset.file_id) {
            let old = AudioAsset::new(entry.file_id);
            if let Err(e) = self.assets.delete(&old).await {
                tracing::warn!(file_id = %old.file_id, error = %e, "Failed to delete released audio");
            }
        }

        Ok(())
    }
}
