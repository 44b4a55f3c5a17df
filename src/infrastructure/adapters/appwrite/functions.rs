//! Appwrite Functions 适配器 - 摘要与文本提取任务
//!
//! 摘要函数通过公开域名直接调用：
//! POST {summarise_url}/
//! Request: {"docId": "...", "fileUrl": "...", "mimeType": "..."}
//! Response: {"summary": "..."} / {"error": "..."} / 纯文本摘要
//!
//! 文本提取函数通过 executions 接口同步执行：
//! POST {endpoint}/functions/{id}/executions
//! Request: {"body": "<JSON 字符串>", "async": false}
//! Response: execution 对象，其中 responseBody 为函数返回的 JSON 字符串

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::{error_field, read_body, read_json, AppwriteClient, Failure};
use crate::application::ports::{ExtractOutcome, JobError, JobTarget, RemoteJobPort, SummaryOutcome};

impl From<Failure> for JobError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Network(msg) => JobError::NetworkError(msg),
            Failure::Timeout => JobError::Timeout,
            Failure::Remote { message, .. } => JobError::Remote(message),
            Failure::Invalid(msg) => JobError::InvalidResponse(msg),
        }
    }
}

/// 摘要请求体
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummariseRequest<'a> {
    doc_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<&'a str>,
}

/// 提取请求体（作为 execution body 的 JSON 字符串发送）
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractRequest<'a> {
    document_id: &'a str,
    doc_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ExecutionRequest {
    body: String,
    #[serde(rename = "async")]
    is_async: bool,
}

#[derive(Debug, Deserialize)]
struct ExecutionDto {
    #[serde(default)]
    status: Option<String>,
    #[serde(rename = "responseBody", default)]
    response_body: Option<String>,
    #[serde(default)]
    errors: Option<String>,
}

/// 解析摘要响应体：JSON 取 summary 字段，非 JSON 时整个响应体即为摘要
fn parse_summary(body: &str) -> Result<String, JobError> {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => {
            if let Some(message) = error_field(&value) {
                return Err(JobError::Remote(message));
            }
            match value.get("summary") {
                Some(Value::String(summary)) => Ok(summary.clone()),
                Some(Value::Null) | None => Ok(String::new()),
                Some(other) => Err(JobError::InvalidResponse(format!("Unexpected summary value: {}", other))),
            }
        }
        Err(_) => Ok(body.to_string()),
    }
}

/// 解析提取函数返回：依次取 textContent、extractedText、text
fn parse_extracted(body: &str) -> Result<String, JobError> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Ok(String::new());
    };
    if let Some(message) = error_field(&value) {
        return Err(JobError::Remote(message));
    }
    let text = ["textContent", "extractedText", "text"]
        .iter()
        .find_map(|field| value.get(*field).and_then(Value::as_str))
        .unwrap_or_default();
    Ok(text.to_string())
}

/// 远端任务客户端
pub struct HttpJobClient {
    client: AppwriteClient,
    summarise_url: String,
    extract_function_id: String,
}

impl HttpJobClient {
    pub fn new(
        client: AppwriteClient,
        summarise_url: impl Into<String>,
        extract_function_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            summarise_url: summarise_url.into().trim_end_matches('/').to_string(),
            extract_function_id: extract_function_id.into(),
        }
    }
}

#[async_trait]
impl RemoteJobPort for HttpJobClient {
    async fn summarize(&self, target: &JobTarget) -> Result<SummaryOutcome, JobError> {
        let request = SummariseRequest {
            doc_id: target.document_id.as_str(),
            file_url: target.file_url.as_deref(),
            mime_type: target.mime_type.as_deref(),
        };

        tracing::debug!(document_id = %target.document_id, "Sending summarise request");

        let response = self
            .client
            .http()
            .post(format!("{}/", self.summarise_url))
            .header("X-Appwrite-Project", self.client.project_id())
            .json(&request)
            .send()
            .await
            .map_err(Failure::from)?;

        let body = read_body(response).await?;
        let summary = parse_summary(&body)?;

        tracing::info!(
            document_id = %target.document_id,
            summary_len = summary.len(),
            "Summarise completed"
        );
        Ok(SummaryOutcome { summary })
    }

    async fn extract_text(&self, target: &JobTarget) -> Result<ExtractOutcome, JobError> {
        let payload = ExtractRequest {
            document_id: target.document_id.as_str(),
            doc_id: target.document_id.as_str(),
            file_id: target.file_id.as_ref().map(|id| id.as_str()),
            file_url: target.file_url.as_deref(),
            mime_type: target.mime_type.as_deref(),
            title: target.title.as_deref(),
        };
        let body = serde_json::to_string(&payload)
            .map_err(|e| JobError::InvalidResponse(format!("Failed to encode request: {}", e)))?;

        tracing::debug!(
            document_id = %target.document_id,
            function_id = %self.extract_function_id,
            "Creating extract execution"
        );

        let response = self
            .client
            .request(
                Method::POST,
                &format!("/functions/{}/executions", self.extract_function_id),
            )
            .json(&ExecutionRequest { body, is_async: false })
            .send()
            .await
            .map_err(Failure::from)?;

        let value = read_json(response).await?;
        let execution: ExecutionDto = serde_json::from_value(value)
            .map_err(|e| JobError::InvalidResponse(e.to_string()))?;

        let response_body = execution.response_body.unwrap_or_default();
        if execution.status.as_deref() == Some("failed") && response_body.trim().is_empty() {
            let message = execution
                .errors
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| "Extraction failed".to_string());
            return Err(JobError::Remote(message));
        }

        let text = parse_extracted(&response_body)?;
        tracing::info!(
            document_id = %target.document_id,
            text_len = text.len(),
            "Extract execution completed"
        );
        Ok(ExtractOutcome { text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::domain::document::DocumentId;
    use axum::http::{HeaderMap, StatusCode};
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

    fn job_client(base: &str) -> HttpJobClient {
        let config = BackendConfig {
            endpoint: format!("{}/v1", base),
            project_id: "proj".to_string(),
            ..Default::default()
        };
        HttpJobClient::new(AppwriteClient::new(&config).unwrap(), format!("{}/summarise", base), "extract-fn")
    }

    fn target() -> JobTarget {
        let mut target = JobTarget::new(DocumentId::new("doc-1").unwrap());
        target.file_url = Some("http://files/doc-1".to_string());
        target
    }

    #[test]
    fn test_parse_summary_variants() {
        assert_eq!(parse_summary(r#"{"summary":"short"}"#).unwrap(), "short");
        assert_eq!(parse_summary("plain text summary").unwrap(), "plain text summary");
        assert_eq!(parse_summary(r#"{"ok":true}"#).unwrap(), "");
        assert!(matches!(parse_summary(r#"{"error":"bad pdf"}"#), Err(JobError::Remote(m)) if m == "bad pdf"));
    }

    #[test]
    fn test_parse_extracted_field_order() {
        assert_eq!(parse_extracted(r#"{"text":"c","extractedText":"b"}"#).unwrap(), "b");
        assert_eq!(parse_extracted(r#"{"textContent":"a","text":"c"}"#).unwrap(), "a");
        assert_eq!(parse_extracted("not json").unwrap(), "");
    }

    #[tokio::test]
    async fn test_summarize_posts_payload() {
        let app = Router::new().route(
            "/summarise/",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers.get("X-Appwrite-Project").unwrap(), "proj");
                assert_eq!(body["docId"], "doc-1");
                assert_eq!(body["fileUrl"], "http://files/doc-1");
                assert!(body.get("mimeType").is_none());
                Json(json!({"ok": true, "summary": "Key points"}))
            }),
        );
        let client = job_client(&serve(app).await);

        let outcome = client.summarize(&target()).await.unwrap();
        assert_eq!(outcome.summary, "Key points");
    }

    #[tokio::test]
    async fn test_summarize_failure_uses_error_field() {
        let app = Router::new().route(
            "/summarise/",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "quota exceeded"}))) }),
        );
        let client = job_client(&serve(app).await);

        let err = client.summarize(&target()).await.unwrap_err();
        assert!(matches!(err, JobError::Remote(ref m) if m == "quota exceeded"));
    }

    #[tokio::test]
    async fn test_summarize_failure_without_body() {
        let app = Router::new().route("/summarise/", post(|| async { StatusCode::BAD_GATEWAY }));
        let client = job_client(&serve(app).await);

        let err = client.summarize(&target()).await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 502");
    }

    #[tokio::test]
    async fn test_extract_execution() {
        let app = Router::new().route(
            "/v1/functions/extract-fn/executions",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["async"], false);
                let inner: Value = serde_json::from_str(body["body"].as_str().unwrap()).unwrap();
                assert_eq!(inner["documentId"], "doc-1");
                assert_eq!(inner["docId"], "doc-1");
                Json(json!({
                    "status": "completed",
                    "responseStatusCode": 200,
                    "responseBody": "{\"extractedText\":\"Full body\"}"
                }))
            }),
        );
        let client = job_client(&serve(app).await);

        let outcome = client.extract_text(&target()).await.unwrap();
        assert_eq!(outcome.text, "Full body");
    }

    #[tokio::test]
    async fn test_extract_failed_execution() {
        let app = Router::new().route(
            "/v1/functions/extract-fn/executions",
            post(|| async {
                Json(json!({"status": "failed", "responseBody": "", "errors": "Timed out"}))
            }),
        );
        let client = job_client(&serve(app).await);

        let err = client.extract_text(&target()).await.unwrap_err();
        assert_eq!(err.to_string(), "Timed out");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_error() {
        let client = job_client("http://127.0.0.1:1");
        let err = client.summarize(&target()).await.unwrap_err();
        assert!(matches!(err, JobError::NetworkError(_)));
    }
}
