//! Appwrite REST 客户端 - 公共请求构建与响应解析

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;

use crate::config::BackendConfig;

/// 请求失败的分类（各适配器再映射为自己的端口错误）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// 连接失败等传输层错误
    Network(String),
    Timeout,
    /// 服务端返回的错误信息
    Remote { status: Option<StatusCode>, message: String },
    /// 响应无法解析
    Invalid(String),
}

impl From<reqwest::Error> for Failure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Failure::Timeout
        } else if e.is_connect() {
            Failure::Network(format!("Cannot connect to backend: {}", e))
        } else {
            Failure::Network(e.to_string())
        }
    }
}

impl Failure {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Failure::Remote {
                status: Some(StatusCode::NOT_FOUND),
                ..
            }
        )
    }
}

/// 非空字符串字段
fn string_field(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// 响应体中的显式 error 字段
pub fn error_field(value: &Value) -> Option<String> {
    string_field(value, "error")
}

/// 非成功状态码的错误信息
///
/// 依次取 error 字段、message 字段、原始响应体，都没有时为 `HTTP <status>`
pub fn failure_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = error_field(&value).or_else(|| string_field(&value, "message")) {
            return message;
        }
    }
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        body.to_string()
    }
}

/// 读取响应体；非成功状态码转换为 Failure::Remote
pub async fn read_body(response: reqwest::Response) -> Result<String, Failure> {
    let status = response.status();
    let body = response.text().await.map_err(Failure::from)?;
    if !status.is_success() {
        return Err(Failure::Remote {
            status: Some(status),
            message: failure_message(status, &body),
        });
    }
    Ok(body)
}

/// 读取 JSON 响应体；成功状态码附带 error 字段同样视为失败
pub async fn read_json(response: reqwest::Response) -> Result<Value, Failure> {
    let status = response.status();
    let body = read_body(response).await?;
    let value: Value = serde_json::from_str(&body)
        .map_err(|e| Failure::Invalid(format!("Failed to parse response: {}", e)))?;
    if let Some(message) = error_field(&value) {
        return Err(Failure::Remote {
            status: Some(status),
            message,
        });
    }
    Ok(value)
}

/// Appwrite REST 客户端
///
/// 所有请求都带 X-Appwrite-Project。登录会话优先以 X-Appwrite-Session 发送，
/// 否则使用配置的 X-Appwrite-JWT
#[derive(Clone)]
pub struct AppwriteClient {
    http: Client,
    endpoint: String,
    project_id: String,
    jwt: Option<String>,
    session: Option<String>,
}

impl AppwriteClient {
    pub fn new(config: &BackendConfig) -> Result<Self, Failure> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Failure::Network(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.base_url().to_string(),
            project_id: config.project_id.clone(),
            jwt: config.jwt.clone().filter(|jwt| !jwt.trim().is_empty()),
            session: None,
        })
    }

    /// 以登录会话身份发送请求
    pub fn with_session(mut self, secret: impl Into<String>) -> Self {
        self.session = Some(secret.into()).filter(|s| !s.trim().is_empty());
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// 底层 HTTP 客户端（供调用非 REST 域名的函数使用）
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// 构建 `{endpoint}{path}` 请求
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.endpoint, path);
        tracing::trace!(method = %method, url = %url, "Appwrite request");

        let builder = self
            .http
            .request(method, url)
            .header("X-Appwrite-Project", &self.project_id);
        match (&self.session, &self.jwt) {
            (Some(session), _) => builder.header("X-Appwrite-Session", session),
            (None, Some(jwt)) => builder.header("X-Appwrite-JWT", jwt),
            (None, None) => builder,
        }
    }

    /// 存储文件的公开地址
    pub fn file_url(&self, bucket_id: &str, file_id: &str, action: &str) -> String {
        format!(
            "{}/storage/buckets/{}/files/{}/{}?project={}",
            self.endpoint, bucket_id, file_id, action, self.project_id
        )
    }
}
