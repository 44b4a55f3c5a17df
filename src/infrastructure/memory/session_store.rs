//! In-Memory Session Store

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::ports::{AccountSession, SessionStoreError, SessionStorePort};

/// 内存会话存储
#[derive(Default)]
pub struct InMemorySessionStore {
    session: Mutex<Option<AccountSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: AccountSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

#[async_trait]
impl SessionStorePort for InMemorySessionStore {
    async fn load(&self) -> Result<Option<AccountSession>, SessionStoreError> {
        Ok(self.session.lock().await.clone())
    }

    async fn save(&self, session: &AccountSession) -> Result<(), SessionStoreError> {
        *self.session.lock().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        self.session.lock().await.take();
        Ok(())
    }
}
