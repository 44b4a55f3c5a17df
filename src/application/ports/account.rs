//! Account Ports - 账号与登录会话
//!
//! 远端账号服务负责注册、邮箱密码登录与 JWT 签发；登录会话在本地持久化，
//! 以便后续命令以同一身份访问文档与存储

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccountError {
    /// 凭据错误或会话已失效（401）
    #[error("{0}")]
    Unauthorized(String),

    /// 邮箱已被注册（409）
    #[error("{0}")]
    Conflict(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("{0}")]
    Remote(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 当前登录用户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// 已建立的登录会话
///
/// `secret` 即会话凭据，随请求以 X-Appwrite-Session 发送
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSession {
    pub id: String,
    pub user_id: String,
    pub secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Account Port
#[async_trait]
pub trait AccountPort: Send + Sync {
    /// 注册新账号（不会自动登录）
    async fn create_account(&self, email: &str, password: &str, name: &str) -> Result<UserProfile, AccountError>;

    /// 邮箱密码登录
    async fn create_session(&self, email: &str, password: &str) -> Result<AccountSession, AccountError>;

    /// 会话对应的用户
    async fn current_user(&self, session: &AccountSession) -> Result<UserProfile, AccountError>;

    /// 签发短期 JWT
    async fn create_jwt(&self, session: &AccountSession) -> Result<String, AccountError>;

    /// 注销该用户的全部会话
    async fn delete_sessions(&self, session: &AccountSession) -> Result<(), AccountError>;
}

// ============================================================================
// Session Store
// ============================================================================

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupted session data: {0}")]
    Corrupted(String),
}

/// 本地会话存储
#[async_trait]
pub trait SessionStorePort: Send + Sync {
    async fn load(&self) -> Result<Option<AccountSession>, SessionStoreError>;

    async fn save(&self, session: &AccountSession) -> Result<(), SessionStoreError>;

    /// 删除已保存的会话；不存在时不报错
    async fn clear(&self) -> Result<(), SessionStoreError>;
}
