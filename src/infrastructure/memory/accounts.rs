//! In-Memory Accounts - 账号服务的内存实现

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::application::ports::{AccountError, AccountPort, AccountSession, UserProfile};
use crate::domain::document::UserId;

struct Account {
    password: String,
    profile: UserProfile,
}

/// 内存账号服务
///
/// 按邮箱保存账号，会话凭据随机生成
pub struct InMemoryAccounts {
    accounts: DashMap<String, Account>,
    /// secret -> user id
    sessions: DashMap<String, String>,
}

impl InMemoryAccounts {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            sessions: DashMap::new(),
        }
    }

    /// 有效会话数
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn profile_for(&self, session: &AccountSession) -> Result<UserProfile, AccountError> {
        let user_id = self
            .sessions
            .get(&session.secret)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AccountError::Unauthorized("User (role: guests) missing scope (account)".to_string()))?;
        self.accounts
            .iter()
            .find(|entry| entry.profile.id == user_id)
            .map(|entry| entry.profile.clone())
            .ok_or_else(|| AccountError::Unauthorized("User not found".to_string()))
    }
}

impl Default for InMemoryAccounts {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountPort for InMemoryAccounts {
    async fn create_account(&self, email: &str, password: &str, name: &str) -> Result<UserProfile, AccountError> {
        let email = email.trim().to_lowercase();
        if self.accounts.contains_key(&email) {
            return Err(AccountError::Conflict(
                "A user with the same id, email, or phone already exists in this project.".to_string(),
            ));
        }

        let profile = UserProfile {
            id: UserId::unique().to_string(),
            name: name.to_string(),
            email: email.clone(),
        };
        self.accounts.insert(
            email,
            Account {
                password: password.to_string(),
                profile: profile.clone(),
            },
        );
        Ok(profile)
    }

    async fn create_session(&self, email: &str, password: &str) -> Result<AccountSession, AccountError> {
        let user_id = self
            .accounts
            .get(&email.trim().to_lowercase())
            .filter(|account| account.password == password)
            .map(|account| account.profile.id.clone())
            .ok_or_else(|| {
                AccountError::Unauthorized("Invalid credentials. Please check the email and password.".to_string())
            })?;

        let session = AccountSession {
            id: Uuid::new_v4().simple().to_string(),
            user_id: user_id.clone(),
            secret: Uuid::new_v4().simple().to_string(),
            expires_at: None,
        };
        self.sessions.insert(session.secret.clone(), user_id);
        Ok(session)
    }

    async fn current_user(&self, session: &AccountSession) -> Result<UserProfile, AccountError> {
        self.profile_for(session)
    }

    async fn create_jwt(&self, session: &AccountSession) -> Result<String, AccountError> {
        let profile = self.profile_for(session)?;
        Ok(format!("jwt.{}.{}", profile.id, Uuid::new_v4().simple()))
    }

    async fn delete_sessions(&self, session: &AccountSession) -> Result<(), AccountError> {
        let profile = self.profile_for(session)?;
        self.sessions.retain(|_, user_id| *user_id != profile.id);
        Ok(())
    }
}
