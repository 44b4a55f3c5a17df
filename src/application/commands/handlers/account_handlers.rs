//! Account Command Handlers - 注册、登录、注销与 JWT 签发

use std::sync::Arc;

use crate::application::commands::{IssueJwt, Login, Logout, Register};
use crate::application::error::ApplicationError;
use crate::application::ports::{AccountError, AccountPort, AccountSession, SessionStorePort, UserProfile};

fn credentials<'a>(email: &'a str, password: &'a str) -> Result<(&'a str, &'a str), ApplicationError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(ApplicationError::validation("Email and password are required."));
    }
    Ok((email, password))
}

/// 读取本地会话，未登录时返回 AuthError
async fn require_session(sessions: &dyn SessionStorePort) -> Result<AccountSession, ApplicationError> {
    sessions
        .load()
        .await?
        .ok_or_else(|| ApplicationError::AuthError("Not logged in".to_string()))
}

// ============================================================================
// Login
// ============================================================================

/// Login Handler - 建立会话并保存到本地
pub struct LoginHandler {
    account: Arc<dyn AccountPort>,
    sessions: Arc<dyn SessionStorePort>,
}

impl LoginHandler {
    pub fn new(account: Arc<dyn AccountPort>, sessions: Arc<dyn SessionStorePort>) -> Self {
        Self { account, sessions }
    }

    pub async fn handle(&self, command: Login) -> Result<UserProfile, ApplicationError> {
        let (email, password) = credentials(&command.email, &command.password)?;

        let session = self.account.create_session(email, password).await?;
        let user = self.account.current_user(&session).await?;
        self.sessions.save(&session).await?;

        tracing::info!(user_id = %user.id, session_id = %session.id, "Logged in");
        Ok(user)
    }
}

// ============================================================================
// Register
// ============================================================================

/// Register Handler - 注册后立即登录
pub struct RegisterHandler {
    account: Arc<dyn AccountPort>,
    sessions: Arc<dyn SessionStorePort>,
}

impl RegisterHandler {
    pub fn new(account: Arc<dyn AccountPort>, sessions: Arc<dyn SessionStorePort>) -> Self {
        Self { account, sessions }
    }

    pub async fn handle(&self, command: Register) -> Result<UserProfile, ApplicationError> {
        let (email, password) = credentials(&command.email, &command.password)?;
        let name = command.name.trim();

        let user = self.account.create_account(email, password, name).await?;
        tracing::info!(user_id = %user.id, "Account created");

        let session = self.account.create_session(email, password).await?;
        self.sessions.save(&session).await?;

        tracing::info!(user_id = %user.id, session_id = %session.id, "Logged in");
        Ok(user)
    }
}

// ============================================================================
// Logout
// ============================================================================

/// Logout Handler
///
/// 远端注销失败只记录日志，本地会话总会被清除。返回是否存在已登录的会话
pub struct LogoutHandler {
    account: Arc<dyn AccountPort>,
    sessions: Arc<dyn SessionStorePort>,
}

impl LogoutHandler {
    pub fn new(account: Arc<dyn AccountPort>, sessions: Arc<dyn SessionStorePort>) -> Self {
        Self { account, sessions }
    }

    pub async fn handle(&self, _command: Logout) -> Result<bool, ApplicationError> {
        let Some(session) = self.sessions.load().await? else {
            tracing::debug!("No saved session, nothing to log out");
            return Ok(false);
        };

        match self.account.delete_sessions(&session).await {
            Ok(()) => tracing::info!(user_id = %session.user_id, "Remote sessions deleted"),
            Err(AccountError::Unauthorized(_)) => {
                tracing::info!(user_id = %session.user_id, "Session already expired")
            }
            Err(e) => tracing::warn!(user_id = %session.user_id, error = %e, "Failed to delete remote sessions"),
        }

        self.sessions.clear().await?;
        Ok(true)
    }
}

// ============================================================================
// IssueJwt
// ============================================================================

/// IssueJwt Handler - 为已保存的会话签发短期 JWT
pub struct IssueJwtHandler {
    account: Arc<dyn AccountPort>,
    sessions: Arc<dyn SessionStorePort>,
}

impl IssueJwtHandler {
    pub fn new(account: Arc<dyn AccountPort>, sessions: Arc<dyn SessionStorePort>) -> Self {
        Self { account, sessions }
    }

    pub async fn handle(&self, _command: IssueJwt) -> Result<String, ApplicationError> {
        let session = require_session(self.sessions.as_ref()).await?;
        let jwt = self.account.create_jwt(&session).await?;
        if jwt.trim().is_empty() {
            return Err(ApplicationError::TransportError("Backend returned an empty JWT".to_string()));
        }
        Ok(jwt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::{InMemoryAccounts, InMemorySessionStore};

    struct Fixture {
        accounts: Arc<InMemoryAccounts>,
        sessions: Arc<InMemorySessionStore>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                accounts: Arc::new(InMemoryAccounts::new()),
                sessions: Arc::new(InMemorySessionStore::new()),
            }
        }

        fn login(&self) -> LoginHandler {
            LoginHandler::new(self.accounts.clone(), self.sessions.clone())
        }

        fn register(&self) -> RegisterHandler {
            RegisterHandler::new(self.accounts.clone(), self.sessions.clone())
        }

        fn logout(&self) -> LogoutHandler {
            LogoutHandler::new(self.accounts.clone(), self.sessions.clone())
        }

        fn jwt(&self) -> IssueJwtHandler {
            IssueJwtHandler::new(self.accounts.clone(), self.sessions.clone())
        }

        async fn registered(&self) -> UserProfile {
            self.register()
                .handle(Register {
                    email: "ada@example.com".to_string(),
                    password: "correct horse".to_string(),
                    name: "Ada".to_string(),
                })
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_register_logs_in() {
        let f = Fixture::new();
        let user = f.registered().await;

        assert_eq!(user.email, "ada@example.com");
        let session = f.sessions.load().await.unwrap().unwrap();
        assert_eq!(session.user_id, user.id);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let f = Fixture::new();
        f.registered().await;

        let err = f
            .register()
            .handle(Register {
                email: "ADA@example.com".to_string(),
                password: "other password".to_string(),
                name: "Ada".to_string(),
            })
            .await
            .unwrap_err();
        assert!(err.user_message().contains("already exists"));
    }

    #[tokio::test]
    async fn test_login_saves_session() {
        let f = Fixture::new();
        let user = f.registered().await;
        f.sessions.clear().await.unwrap();

        let logged_in = f
            .login()
            .handle(Login {
                email: " ada@example.com ".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(logged_in, user);
        assert!(f.sessions.load().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_login_wrong_password_keeps_no_session() {
        let f = Fixture::new();
        f.registered().await;
        f.sessions.clear().await.unwrap();

        let err = f
            .login()
            .handle(Login {
                email: "ada@example.com".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ApplicationError::AuthError(_)));
        assert!(f.sessions.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_requires_credentials() {
        let f = Fixture::new();
        let err = f
            .login()
            .handle(Login {
                email: "  ".to_string(),
                password: "x".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_logout_deletes_remote_and_local_session() {
        let f = Fixture::new();
        f.registered().await;
        assert_eq!(f.accounts.session_count(), 1);

        assert!(f.logout().handle(Logout).await.unwrap());
        assert_eq!(f.accounts.session_count(), 0);
        assert!(f.sessions.load().await.unwrap().is_none());

        assert!(!f.logout().handle(Logout).await.unwrap());
    }

    #[tokio::test]
    async fn test_logout_clears_expired_session() {
        let f = Fixture::new();
        f.sessions
            .save(&AccountSession {
                id: "s1".to_string(),
                user_id: "u1".to_string(),
                secret: "revoked".to_string(),
                expires_at: None,
            })
            .await
            .unwrap();

        assert!(f.logout().handle(Logout).await.unwrap());
        assert!(f.sessions.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_issue_jwt() {
        let f = Fixture::new();
        let err = f.jwt().handle(IssueJwt).await.unwrap_err();
        assert_eq!(err.user_message(), "Not logged in");

        let user = f.registered().await;
        let jwt = f.jwt().handle(IssueJwt).await.unwrap();
        assert!(jwt.contains(&user.id));
    }
}
