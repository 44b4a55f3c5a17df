//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 后端服务（数据库与文件存储）配置
    #[serde(default)]
    pub backend: BackendConfig,

    /// 登录会话配置
    #[serde(default)]
    pub auth: AuthConfig,

    /// 远端处理函数配置
    #[serde(default)]
    pub functions: FunctionsConfig,

    /// 语音合成服务配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// 功能开关
    #[serde(default)]
    pub features: FeatureFlags,

    /// 播放器配置
    #[serde(default)]
    pub player: PlayerSettings,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 后端服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// REST API 地址（含 /v1）
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// 项目 ID（X-Appwrite-Project）
    #[serde(default = "default_project_id")]
    pub project_id: String,

    #[serde(default = "default_database_id")]
    pub database_id: String,

    #[serde(default = "default_documents_collection_id")]
    pub documents_collection_id: String,

    /// 文档原文件所在的存储桶
    #[serde(default = "default_bucket_id")]
    pub bucket_id: String,

    /// 会话 JWT（X-Appwrite-JWT），未设置时以匿名身份访问
    #[serde(default)]
    pub jwt: Option<String>,

    /// 请求超时时间（秒）
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://fra.cloud.appwrite.io/v1".to_string()
}

fn default_project_id() -> String {
    "690bc577001de9633dc5".to_string()
}

fn default_database_id() -> String {
    "execudoc_db".to_string()
}

fn default_documents_collection_id() -> String {
    "documents".to_string()
}

fn default_bucket_id() -> String {
    "69202f250019fb07635d".to_string()
}

fn default_backend_timeout() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            project_id: default_project_id(),
            database_id: default_database_id(),
            documents_collection_id: default_documents_collection_id(),
            bucket_id: default_bucket_id(),
            jwt: None,
            timeout_secs: default_backend_timeout(),
        }
    }
}

impl BackendConfig {
    /// 去掉末尾斜杠的 endpoint
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }
}

/// 登录会话配置
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// 登录会话文件路径
    #[serde(default = "default_session_file")]
    pub session_file: String,
}

fn default_session_file() -> String {
    "execudoc-session.json".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_file: default_session_file(),
        }
    }
}

/// 远端处理函数配置
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionsConfig {
    /// 摘要函数的公开域名
    #[serde(default = "default_summarise_url")]
    pub summarise_url: String,

    /// 文本提取函数 ID（通过 executions 接口调用）
    #[serde(default = "default_extract_function_id")]
    pub extract_function_id: String,
}

fn default_summarise_url() -> String {
    "https://6969232f000c0badafbe.fra.appwrite.run".to_string()
}

fn default_extract_function_id() -> String {
    "697552940000b9d83b57".to_string()
}

impl Default for FunctionsConfig {
    fn default() -> Self {
        Self {
            summarise_url: default_summarise_url(),
            extract_function_id: default_extract_function_id(),
        }
    }
}

/// 语音合成服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    /// TTS 函数的公开域名
    #[serde(default = "default_tts_url")]
    pub url: String,

    /// 合成音频所在的存储桶
    #[serde(default = "default_tts_bucket_id")]
    pub bucket_id: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,
}

fn default_tts_url() -> String {
    "https://697201a400145780b4c0.fra.appwrite.run".to_string()
}

fn default_tts_bucket_id() -> String {
    "6972be01002bee843a33".to_string()
}

fn default_tts_timeout() -> u64 {
    120
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            url: default_tts_url(),
            bucket_id: default_tts_bucket_id(),
            timeout_secs: default_tts_timeout(),
        }
    }
}

/// 功能开关（只读，注入到各组件）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FeatureFlags {
    /// 是否把任务结果与语音缓存写回远端文档
    #[serde(default = "default_use_db")]
    pub use_db: bool,
}

fn default_use_db() -> bool {
    true
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            use_db: default_use_db(),
        }
    }
}

/// 播放引擎类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// 模拟播放（按固定时长结束）
    #[default]
    Simulated,
    /// 本地音频设备（需要 rodio-playback feature）
    Rodio,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Simulated => "simulated",
            EngineKind::Rodio => "rodio",
        }
    }
}

/// 播放器配置
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSettings {
    /// 每个文档缓存清单的最大条目数
    #[serde(default = "default_max_manifest_entries")]
    pub max_manifest_entries: usize,

    #[serde(default)]
    pub engine: EngineKind,

    /// 模拟播放时长（毫秒）
    #[serde(default = "default_simulated_duration")]
    pub simulated_duration_ms: u64,
}

fn default_max_manifest_entries() -> usize {
    16
}

fn default_simulated_duration() -> u64 {
    3000
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            max_manifest_entries: default_max_manifest_entries(),
            engine: EngineKind::default(),
            simulated_duration_ms: default_simulated_duration(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
