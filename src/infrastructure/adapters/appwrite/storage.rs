//! Appwrite Storage 适配器
//!
//! - AppwriteFileStorage: 文档原文件（上传、删除、地址）
//! - AppwriteAudioAssets: 合成音频（存在性检查、下载、删除）

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Method};
use serde::Deserialize;

use super::client::{read_body, read_json, AppwriteClient, Failure};
use crate::application::ports::{
    AssetError, AudioAsset, AudioAssetPort, AudioResource, FileStorageError, FileStoragePort,
    UploadFile,
};
use crate::domain::document::FileId;

impl From<Failure> for FileStorageError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Network(msg) => FileStorageError::NetworkError(msg),
            Failure::Timeout => FileStorageError::NetworkError("Request timeout".to_string()),
            Failure::Remote { message, .. } | Failure::Invalid(message) => {
                FileStorageError::BackendError(message)
            }
        }
    }
}

impl From<Failure> for AssetError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Network(msg) => AssetError::NetworkError(msg),
            Failure::Timeout => AssetError::Timeout,
            Failure::Remote { message, .. } | Failure::Invalid(message) => AssetError::StorageError(message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StoredFileDto {
    #[serde(rename = "$id")]
    id: String,
}

fn file_path(bucket_id: &str, file_id: &FileId) -> String {
    format!("/storage/buckets/{}/files/{}", bucket_id, file_id)
}

// ============================================================================
// 文档原文件
// ============================================================================

/// 文档原文件存储
pub struct AppwriteFileStorage {
    client: AppwriteClient,
    bucket_id: String,
}

impl AppwriteFileStorage {
    pub fn new(client: AppwriteClient, bucket_id: impl Into<String>) -> Self {
        Self {
            client,
            bucket_id: bucket_id.into(),
        }
    }
}

#[async_trait]
impl FileStoragePort for AppwriteFileStorage {
    async fn upload(&self, file: &UploadFile) -> Result<FileId, FileStorageError> {
        let data = tokio::fs::read(&file.path).await.map_err(|e| {
            FileStorageError::IoError(format!("{}: {}", file.path.display(), e))
        })?;
        let size = data.len();

        let part = Part::bytes(data)
            .file_name(file.name.clone())
            .mime_str(file.mime_type_or_default())
            .map_err(|e| FileStorageError::IoError(format!("Invalid mime type: {}", e)))?;
        let file_id = FileId::unique();
        let form = Form::new()
            .text("fileId", file_id.as_str().to_string())
            .part("file", part);

        let response = self
            .client
            .request(Method::POST, &format!("/storage/buckets/{}/files", self.bucket_id))
            .multipart(form)
            .send()
            .await
            .map_err(Failure::from)?;

        let value = read_json(response).await?;
        let stored: StoredFileDto = serde_json::from_value(value)
            .map_err(|e| FileStorageError::BackendError(format!("Invalid upload response: {}", e)))?;
        let stored_id = FileId::new(stored.id)
            .map_err(|_| FileStorageError::BackendError("Upload response without file id".to_string()))?;

        tracing::info!(file_id = %stored_id, name = %file.name, size, "File uploaded");
        Ok(stored_id)
    }

    async fn delete(&self, file_id: &FileId) -> Result<(), FileStorageError> {
        let response = self
            .client
            .request(Method::DELETE, &file_path(&self.bucket_id, file_id))
            .send()
            .await
            .map_err(Failure::from)?;

        match read_body(response).await {
            Ok(_) => Ok(()),
            Err(failure) if failure.is_not_found() => Err(FileStorageError::FileNotFound(file_id.to_string())),
            Err(failure) => Err(failure.into()),
        }
    }

    fn view_url(&self, file_id: &FileId) -> String {
        self.client.file_url(&self.bucket_id, file_id.as_str(), "view")
    }

    fn download_url(&self, file_id: &FileId) -> String {
        self.client.file_url(&self.bucket_id, file_id.as_str(), "download")
    }
}

// ============================================================================
// 合成音频
// ============================================================================

/// 合成音频存储（TTS 存储桶）
pub struct AppwriteAudioAssets {
    client: AppwriteClient,
    bucket_id: String,
}

impl AppwriteAudioAssets {
    pub fn new(client: AppwriteClient, bucket_id: impl Into<String>) -> Self {
        Self {
            client,
            bucket_id: bucket_id.into(),
        }
    }
}

#[async_trait]
impl AudioAssetPort for AppwriteAudioAssets {
    async fn exists(&self, asset: &AudioAsset) -> Result<bool, AssetError> {
        let response = self
            .client
            .request(Method::GET, &file_path(&self.bucket_id, &asset.file_id))
            .send()
            .await
            .map_err(Failure::from)?;

        match read_body(response).await {
            Ok(_) => Ok(true),
            Err(failure) if failure.is_not_found() => Ok(false),
            Err(failure) => Err(failure.into()),
        }
    }

    async fn fetch(&self, asset: &AudioAsset) -> Result<AudioResource, AssetError> {
        let path = format!("{}/download", file_path(&self.bucket_id, &asset.file_id));
        let response = self
            .client
            .request(Method::GET, &path)
            .send()
            .await
            .map_err(Failure::from)?;

        let status = response.status();
        if !status.is_success() {
            return match read_body(response).await {
                Err(failure) if failure.is_not_found() => Err(AssetError::NotFound(asset.file_id.to_string())),
                Err(failure) => Err(failure.into()),
                Ok(_) => Err(AssetError::StorageError(format!("HTTP {}", status.as_u16()))),
            };
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let data = response
            .bytes()
            .await
            .map_err(Failure::from)?
            .to_vec();

        tracing::debug!(
            file_id = %asset.file_id,
            size = data.len(),
            content_type = ?content_type,
            "Audio asset downloaded"
        );

        Ok(AudioResource {
            asset: asset.clone(),
            data,
            content_type,
        })
    }

    async fn delete(&self, asset: &AudioAsset) -> Result<(), AssetError> {
        let response = self
            .client
            .request(Method::DELETE, &file_path(&self.bucket_id, &asset.file_id))
            .send()
            .await
            .map_err(Failure::from)?;

        match read_body(response).await {
            Ok(_) => Ok(()),
            Err(failure) if failure.is_not_found() => Err(AssetError::NotFound(asset.file_id.to_string())),
            Err(failure) => Err(failure.into()),
        }
    }
}
