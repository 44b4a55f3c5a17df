//! Fake TTS Client - 用于测试的语音合成客户端
//!
//! 不调用远端服务，把文本字节作为"音频"写入内存资源存储

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{AudioAsset, SpeechSynthesisPort, SynthesisError};
use crate::infrastructure::memory::InMemoryAudioAssets;

/// Fake Speech Client
///
/// 可按文本配置延迟与失败，用于模拟并发请求和远端错误
pub struct FakeSpeechClient {
    assets: Arc<InMemoryAudioAssets>,
    failure: Option<String>,
    failures_for: HashMap<String, String>,
    latency: Duration,
    latency_for: HashMap<String, Duration>,
    /// 第 n 次调用的延迟，优先于按文本配置
    call_latencies: Vec<Duration>,
    calls: AtomicUsize,
}

impl FakeSpeechClient {
    pub fn new(assets: Arc<InMemoryAudioAssets>) -> Self {
        Self {
            assets,
            failure: None,
            failures_for: HashMap::new(),
            latency: Duration::ZERO,
            latency_for: HashMap::new(),
            call_latencies: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// 所有请求都以该信息失败
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// 指定文本的请求以该信息失败
    pub fn with_failure_for(mut self, text: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures_for.insert(text.into(), message.into());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_latency_for(mut self, text: impl Into<String>, latency: Duration) -> Self {
        self.latency_for.insert(text.into(), latency);
        self
    }

    /// 按调用顺序指定延迟（同一文本的并发请求）
    pub fn with_call_latencies(mut self, latencies: impl IntoIterator<Item = Duration>) -> Self {
        self.call_latencies = latencies.into_iter().collect();
        self
    }

    /// 已收到的合成请求数
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesisPort for FakeSpeechClient {
    async fn synthesize(&self, text: &str) -> Result<AudioAsset, SynthesisError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        let latency = self
            .call_latencies
            .get(call)
            .or_else(|| self.latency_for.get(text))
            .copied()
            .unwrap_or(self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if let Some(message) = self.failures_for.get(text).or(self.failure.as_ref()) {
            tracing::debug!(text_len = text.len(), error = %message, "FakeSpeechClient: failing request");
            return Err(SynthesisError::ServiceError(message.clone()));
        }

        let asset = self.assets.insert(text.as_bytes().to_vec());
        tracing::debug!(text_len = text.len(), file_id = %asset.file_id, "FakeSpeechClient: stored audio");
        Ok(asset)
    }
}
