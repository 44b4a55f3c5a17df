//! Account Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{AccountError, AccountPort, SessionStorePort, UserProfile};
use crate::application::queries::GetCurrentUser;

/// GetCurrentUser Handler
///
/// 没有本地会话或会话已失效时返回 None；其他错误照常返回
pub struct GetCurrentUserHandler {
    account: Arc<dyn AccountPort>,
    sessions: Arc<dyn SessionStorePort>,
}

impl GetCurrentUserHandler {
    pub fn new(account: Arc<dyn AccountPort>, sessions: Arc<dyn SessionStorePort>) -> Self {
        Self { account, sessions }
    }

    pub async fn handle(&self, _query: GetCurrentUser) -> Result<Option<UserProfile>, ApplicationError> {
        let Some(session) = self.sessions.load().await? else {
            return Ok(None);
        };

        match self.account.current_user(&session).await {
            Ok(user) => Ok(Some(user)),
            Err(AccountError::Unauthorized(message)) => {
                tracing::info!(user_id = %session.user_id, reason = %message, "Saved session is no longer valid");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::AccountSession;
    use crate::infrastructure::memory::{InMemoryAccounts, InMemorySessionStore};

    #[tokio::test]
    async fn test_no_session_is_anonymous() {
        let handler = GetCurrentUserHandler::new(
            Arc::new(InMemoryAccounts::new()),
            Arc::new(InMemorySessionStore::new()),
        );
        assert!(handler.handle(GetCurrentUser).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_valid_session_returns_user() {
        let accounts = Arc::new(InMemoryAccounts::new());
        let user = accounts.create_account("ada@example.com", "pw123456", "Ada").await.unwrap();
        let session = accounts.create_session("ada@example.com", "pw123456").await.unwrap();

        let handler = GetCurrentUserHandler::new(accounts, Arc::new(InMemorySessionStore::with_session(session)));
        assert_eq!(handler.handle(GetCurrentUser).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn test_revoked_session_is_anonymous() {
        let session = AccountSession {
            id: "s1".to_string(),
            user_id: "u1".to_string(),
            secret: "revoked".to_string(),
            expires_at: None,
        };
        let handler = GetCurrentUserHandler::new(
            Arc::new(InMemoryAccounts::new()),
            Arc::new(InMemorySessionStore::with_session(session)),
        );
        assert!(handler.handle(GetCurrentUser).await.unwrap().is_none());
    }
}
