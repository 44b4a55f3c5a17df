//! HTTP TTS Client - 调用远端语音合成函数
//!
//! 实现 SpeechSynthesisPort trait，合成结果保存在 TTS 存储桶中，只返回文件 ID
//!
//! 远端 TTS API:
//! POST {url}/
//! Request: {"text": "...", "bucketId": "..."}  (JSON)
//! Response: {"fileId": "..."}（或 audioFileId / $id），失败时 {"error": "..."}

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::application::ports::{AudioAsset, SpeechSynthesisPort, SynthesisError};
use crate::domain::document::FileId;
use crate::infrastructure::adapters::appwrite::failure_message;

/// TTS 合成请求体 (JSON)
#[derive(Debug, Serialize)]
struct TtsHttpRequest<'a> {
    /// 要合成的文本
    text: &'a str,
    /// 合成音频写入的存储桶
    #[serde(rename = "bucketId", skip_serializing_if = "Option::is_none")]
    bucket_id: Option<&'a str>,
}

/// HTTP TTS 客户端配置
#[derive(Debug, Clone)]
pub struct HttpTtsClientConfig {
    /// TTS 函数基础 URL
    pub base_url: String,
    /// 合成音频存储桶
    pub bucket_id: Option<String>,
    /// 项目 ID（X-Appwrite-Project）
    pub project_id: Option<String>,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl HttpTtsClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bucket_id: None,
            project_id: None,
            timeout_secs: 120,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_bucket(mut self, bucket_id: impl Into<String>) -> Self {
        self.bucket_id = Some(bucket_id.into());
        self
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }
}

/// 从合成响应中取出音频文件 ID
fn parse_asset(body: &str) -> Result<AudioAsset, SynthesisError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| SynthesisError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    if let Some(message) = value.get("error").and_then(Value::as_str).filter(|m| !m.trim().is_empty()) {
        return Err(SynthesisError::ServiceError(message.to_string()));
    }

    let file_id = ["fileId", "audioFileId", "$id"]
        .iter()
        .find_map(|field| value.get(*field).and_then(Value::as_str))
        .ok_or_else(|| SynthesisError::InvalidResponse("Response without audio file id".to_string()))?;

    FileId::new(file_id)
        .map(AudioAsset::new)
        .map_err(|e| SynthesisError::InvalidResponse(e.to_string()))
}

/// HTTP TTS 客户端
pub struct HttpTtsClient {
    client: Client,
    config: HttpTtsClientConfig,
}

impl HttpTtsClient {
    /// 创建新的 HTTP TTS 客户端
    pub fn new(config: HttpTtsClientConfig) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SynthesisError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// 获取合成 URL
    fn synthesize_url(&self) -> String {
        format!("{}/", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SpeechSynthesisPort for HttpTtsClient {
    async fn synthesize(&self, text: &str) -> Result<AudioAsset, SynthesisError> {
        let http_request = TtsHttpRequest {
            text,
            bucket_id: self.config.bucket_id.as_deref(),
        };

        tracing::debug!(
            url = %self.synthesize_url(),
            text_len = text.len(),
            "Sending TTS request"
        );

        let mut request = self.client.post(self.synthesize_url()).json(&http_request);
        if let Some(project_id) = &self.config.project_id {
            request = request.header("X-Appwrite-Project", project_id);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SynthesisError::Timeout
            } else if e.is_connect() {
                SynthesisError::NetworkError(format!("Cannot connect to TTS service: {}", e))
            } else {
                SynthesisError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                SynthesisError::Timeout
            } else {
                SynthesisError::NetworkError(e.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(SynthesisError::ServiceError(failure_message(status, &body)));
        }

        let asset = parse_asset(&body)?;
        tracing::info!(file_id = %asset.file_id, text_len = text.len(), "TTS synthesis completed");
        Ok(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_config_builder() {
        let config = HttpTtsClientConfig::new("http://example.com:9000")
            .with_timeout(60)
            .with_bucket("tts");
        assert_eq!(config.base_url, "http://example.com:9000");
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.bucket_id.as_deref(), Some("tts"));
    }

    #[test]
    fn test_parse_asset_field_fallbacks() {
        assert_eq!(parse_asset(r#"{"fileId":"a"}"#).unwrap().file_id.as_str(), "a");
        assert_eq!(parse_asset(r#"{"audioFileId":"b"}"#).unwrap().file_id.as_str(), "b");
        assert_eq!(parse_asset(r#"{"$id":"c"}"#).unwrap().file_id.as_str(), "c");
        assert!(matches!(parse_asset(r#"{"ok":true}"#), Err(SynthesisError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_synthesize_sends_text_and_bucket() {
        let app = Router::new().route(
            "/",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["text"], "Hello there");
                assert_eq!(body["bucketId"], "tts");
                Json(json!({"fileId": "audio-1"}))
            }),
        );
        let client = HttpTtsClient::new(HttpTtsClientConfig::new(serve(app).await).with_bucket("tts")).unwrap();

        let asset = client.synthesize("Hello there").await.unwrap();
        assert_eq!(asset.file_id.as_str(), "audio-1");
    }

    #[tokio::test]
    async fn test_service_error_message() {
        let app = Router::new().route(
            "/",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "quota exceeded"}))) }),
        );
        let client = HttpTtsClient::new(HttpTtsClientConfig::new(serve(app).await)).unwrap();

        let err = client.synthesize("Hello").await.unwrap_err();
        assert!(matches!(err, SynthesisError::ServiceError(ref m) if m == "quota exceeded"));
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[tokio::test]
    async fn test_error_field_on_success_status() {
        let app = Router::new().route("/", post(|| async { Json(json!({"error": "text too long"})) }));
        let client = HttpTtsClient::new(HttpTtsClientConfig::new(serve(app).await)).unwrap();

        let err = client.synthesize("Hello").await.unwrap_err();
        assert_eq!(err.to_string(), "text too long");
    }
}
