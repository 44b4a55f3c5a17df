//! In-Memory File Storage

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::application::ports::{FileStorageError, FileStoragePort, UploadFile};
use crate::domain::document::FileId;

/// 内存文件存储
pub struct InMemoryFileStorage {
    files: DashMap<FileId, Vec<u8>>,
    fail_deletes: AtomicBool,
}

impl InMemoryFileStorage {
    pub fn new() -> Self {
        Self {
            files: DashMap::new(),
            fail_deletes: AtomicBool::new(false),
        }
    }

    /// 直接写入文件内容
    pub fn insert(&self, data: Vec<u8>) -> FileId {
        let file_id = FileId::unique();
        self.files.insert(file_id.clone(), data);
        file_id
    }

    pub fn contains(&self, file_id: &FileId) -> bool {
        self.files.contains_key(file_id)
    }

    /// 之后的 delete 全部失败
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Default for InMemoryFileStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileStoragePort for InMemoryFileStorage {
    async fn upload(&self, file: &UploadFile) -> Result<FileId, FileStorageError> {
        let data = tokio::fs::read(&file.path)
            .await
            .map_err(|e| FileStorageError::IoError(format!("{}: {}", file.path.display(), e)))?;
        Ok(self.insert(data))
    }

    async fn delete(&self, file_id: &FileId) -> Result<(), FileStorageError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(FileStorageError::BackendError("simulated delete failure".to_string()));
        }
        self.files
            .remove(file_id)
            .map(|_| ())
            .ok_or_else(|| FileStorageError::FileNotFound(file_id.to_string()))
    }

    fn view_url(&self, file_id: &FileId) -> String {
        format!("memory://files/{}/view", file_id)
    }

    fn download_url(&self, file_id: &FileId) -> String {
        format!("memory://files/{}/download", file_id)
    }
}
