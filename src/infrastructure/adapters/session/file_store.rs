//! 文件会话存储 - 登录会话保存为单个 JSON 文件

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::application::ports::{AccountSession, SessionStoreError, SessionStorePort};

pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStorePort for FileSessionStore {
    async fn load(&self) -> Result<Option<AccountSession>, SessionStoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let session: AccountSession =
            serde_json::from_slice(&raw).map_err(|e| SessionStoreError::Corrupted(e.to_string()))?;
        if session.secret.trim().is_empty() {
            return Err(SessionStoreError::Corrupted("empty session secret".to_string()));
        }
        Ok(Some(session))
    }

    async fn save(&self, session: &AccountSession) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(session).map_err(|e| SessionStoreError::Corrupted(e.to_string()))?;
        tokio::fs::write(&self.path, json).await?;

        // 会话凭据仅当前用户可读
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tracing::debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Session removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
