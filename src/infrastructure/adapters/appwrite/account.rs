//! Appwrite Account 适配器 - 注册、邮箱密码会话、JWT
//!
//! 客户端 SDK 创建会话时响应体中的 secret 为空，会话凭据在
//! `a_session_<project>` cookie 中（或 X-Fallback-Cookies 头）

use async_trait::async_trait;
use reqwest::header::{HeaderMap, SET_COOKIE};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::client::{read_body, read_json, AppwriteClient, Failure};
use crate::application::ports::{AccountError, AccountPort, AccountSession, UserProfile};
use crate::domain::document::UserId;

impl From<Failure> for AccountError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Network(msg) => AccountError::NetworkError(msg),
            Failure::Timeout => AccountError::Timeout,
            Failure::Remote {
                status: Some(StatusCode::UNAUTHORIZED),
                message,
            } => AccountError::Unauthorized(message),
            Failure::Remote {
                status: Some(StatusCode::CONFLICT),
                message,
            } => AccountError::Conflict(message),
            Failure::Remote { message, .. } => AccountError::Remote(message),
            Failure::Invalid(msg) => AccountError::InvalidResponse(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserDto {
    #[serde(rename = "$id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
}

impl From<UserDto> for UserProfile {
    fn from(dto: UserDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            email: dto.email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionDto {
    #[serde(rename = "$id")]
    id: String,
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(default)]
    secret: String,
    #[serde(default)]
    expire: Option<String>,
}

fn parse<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T, AccountError> {
    serde_json::from_value(value).map_err(|e| AccountError::InvalidResponse(e.to_string()))
}

/// 从响应中取出会话凭据：响应体 secret → Set-Cookie → X-Fallback-Cookies
fn session_secret(project_id: &str, headers: &HeaderMap, body_secret: &str) -> Option<String> {
    if !body_secret.trim().is_empty() {
        return Some(body_secret.to_string());
    }

    let cookie_name = format!("a_session_{}", project_id);
    let from_cookie = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next()?.split_once('='))
        .find(|(name, value)| name.trim() == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string());
    if from_cookie.is_some() {
        return from_cookie;
    }

    headers
        .get("X-Fallback-Cookies")
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
        .and_then(|cookies| cookies.get(&cookie_name).and_then(Value::as_str).map(str::to_string))
        .filter(|secret| !secret.is_empty())
}

/// Appwrite Account 适配器
pub struct AppwriteAccount {
    client: AppwriteClient,
}

impl AppwriteAccount {
    pub fn new(client: AppwriteClient) -> Self {
        Self { client }
    }

    fn as_session(&self, session: &AccountSession) -> AppwriteClient {
        self.client.clone().with_session(&session.secret)
    }
}

#[async_trait]
impl AccountPort for AppwriteAccount {
    async fn create_account(&self, email: &str, password: &str, name: &str) -> Result<UserProfile, AccountError> {
        let body = json!({
            "userId": UserId::unique().as_str(),
            "email": email,
            "password": password,
            "name": name,
        });
        let response = self
            .client
            .request(Method::POST, "/account")
            .json(&body)
            .send()
            .await
            .map_err(Failure::from)?;

        let user: UserDto = parse(read_json(response).await?)?;
        Ok(user.into())
    }

    async fn create_session(&self, email: &str, password: &str) -> Result<AccountSession, AccountError> {
        let response = self
            .client
            .request(Method::POST, "/account/sessions/email")
            .json(&json!({"email": email, "password": password}))
            .send()
            .await
            .map_err(Failure::from)?;

        let headers = response.headers().clone();
        let dto: SessionDto = parse(read_json(response).await?)?;
        let secret = session_secret(self.client.project_id(), &headers, &dto.secret)
            .ok_or_else(|| AccountError::InvalidResponse("Session created without a session secret".to_string()))?;

        tracing::debug!(session_id = %dto.id, user_id = %dto.user_id, "Account session created");
        Ok(AccountSession {
            id: dto.id,
            user_id: dto.user_id,
            secret,
            expires_at: dto.expire,
        })
    }

    async fn current_user(&self, session: &AccountSession) -> Result<UserProfile, AccountError> {
        let response = self
            .as_session(session)
            .request(Method::GET, "/account")
            .send()
            .await
            .map_err(Failure::from)?;

        let user: UserDto = parse(read_json(response).await?)?;
        Ok(user.into())
    }

    async fn create_jwt(&self, session: &AccountSession) -> Result<String, AccountError> {
        let response = self
            .as_session(session)
            .request(Method::POST, "/account/jwts")
            .send()
            .await
            .map_err(Failure::from)?;

        let value = read_json(response).await?;
        value
            .get("jwt")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AccountError::InvalidResponse("Response without jwt".to_string()))
    }

    async fn delete_sessions(&self, session: &AccountSession) -> Result<(), AccountError> {
        let response = self
            .as_session(session)
            .request(Method::DELETE, "/account/sessions")
            .send()
            .await
            .map_err(Failure::from)?;

        read_body(response).await?;
        Ok(())
    }
}
