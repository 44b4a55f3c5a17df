//! 配置加载
//!
//! 来源按覆盖顺序叠加：内置默认值 < config.toml / config.local.toml < `EXECUDOC_*` 环境变量。
//! 加载完成后统一校验，校验失败会指出具体字段。

use config::{Config, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 环境变量前缀
const ENV_PREFIX: &str = "EXECUDOC";

/// 未显式指定路径时依次尝试的文件（不含扩展名）
const SEARCH_PATHS: &[&str] = &["config", "config.local"];

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置源失败（文件缺失、格式错误）
    #[error("Cannot read configuration: {0}")]
    Source(#[from] config::ConfigError),

    /// 配置结构与字段类型不匹配
    #[error("Malformed configuration: {0}")]
    Malformed(String),

    #[error("Invalid configuration value `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// 按默认搜索路径加载配置
///
/// 环境变量使用 `__` 分隔层级，例如：
/// - `EXECUDOC_BACKEND__ENDPOINT=https://cloud.appwrite.io/v1`
/// - `EXECUDOC_BACKEND__JWT=eyJ...`
/// - `EXECUDOC_FEATURES__USE_DB=false`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 加载配置；给定路径时该文件必须存在
pub fn load_config_from_path(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder()
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    builder = match path {
        Some(path) => builder.add_source(File::from(path).required(true)),
        None => SEARCH_PATHS.iter().fold(builder, |builder, name| {
            builder.add_source(File::with_name(name).required(false))
        }),
    };

    let merged = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app_config: AppConfig = merged
        .try_deserialize()
        .map_err(|e| ConfigError::Malformed(e.to_string()))?;

    check(&app_config)?;
    Ok(app_config)
}

fn check(config: &AppConfig) -> Result<(), ConfigError> {
    let rules: [(bool, &'static str, &'static str); 7] = [
        (config.backend.endpoint.trim().is_empty(), "backend.endpoint", "must not be empty"),
        (config.backend.project_id.trim().is_empty(), "backend.project_id", "must not be empty"),
        (config.tts.url.trim().is_empty(), "tts.url", "must not be empty"),
        (config.backend.timeout_secs == 0, "backend.timeout_secs", "must be positive"),
        (config.tts.timeout_secs == 0, "tts.timeout_secs", "must be positive"),
        (config.player.max_manifest_entries == 0, "player.max_manifest_entries", "must be positive"),
        (config.auth.session_file.trim().is_empty(), "auth.session_file", "must not be empty"),
    ];

    match rules.iter().find(|(violated, _, _)| *violated) {
        Some(&(_, field, reason)) => Err(ConfigError::Invalid { field, reason }),
        None => Ok(()),
    }
}

/// 启动时输出生效配置（JWT 只显示是否设置）
pub fn print_config(config: &AppConfig) {
    let backend = &config.backend;
    tracing::info!(
        endpoint = %backend.endpoint,
        project = %backend.project_id,
        database = %backend.database_id,
        collection = %backend.documents_collection_id,
        bucket = %backend.bucket_id,
        jwt = backend.jwt.is_some(),
        session_file = %config.auth.session_file,
        "Backend configured"
    );
    tracing::info!(
        summarise_url = %config.functions.summarise_url,
        extract_function = %config.functions.extract_function_id,
        tts_url = %config.tts.url,
        tts_timeout_secs = config.tts.timeout_secs,
        "Remote jobs configured"
    );
    tracing::info!(
        use_db = config.features.use_db,
        engine = config.player.engine.as_str(),
        max_manifest_entries = config.player.max_manifest_entries,
        log_level = %config.log.level,
        "Player configured"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineKind;
    use std::io::Write;

    fn toml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn invalid_field(config: &AppConfig) -> Option<&'static str> {
        match check(config) {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(check(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_check_names_offending_field() {
        let mut config = AppConfig::default();
        config.backend.endpoint = String::new();
        assert_eq!(invalid_field(&config), Some("backend.endpoint"));

        let mut config = AppConfig::default();
        config.tts.url = " ".to_string();
        assert_eq!(invalid_field(&config), Some("tts.url"));

        let mut config = AppConfig::default();
        config.tts.timeout_secs = 0;
        assert_eq!(invalid_field(&config), Some("tts.timeout_secs"));

        let mut config = AppConfig::default();
        config.player.max_manifest_entries = 0;
        assert_eq!(invalid_field(&config), Some("player.max_manifest_entries"));

        let mut config = AppConfig::default();
        config.auth.session_file = String::new();
        assert_eq!(invalid_field(&config), Some("auth.session_file"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = toml_file(
            r#"
[backend]
endpoint = "http://127.0.0.1:9000/v1"
project_id = "local"

[auth]
session_file = "/tmp/execudoc/session.json"

[features]
use_db = false

[player]
engine = "rodio"
max_manifest_entries = 4
"#,
        );

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.backend.endpoint, "http://127.0.0.1:9000/v1");
        assert_eq!(config.backend.project_id, "local");
        assert_eq!(config.backend.database_id, "execudoc_db");
        assert!(!config.features.use_db);
        assert_eq!(config.player.engine, EngineKind::Rodio);
        assert_eq!(config.player.max_manifest_entries, 4);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.auth.session_file, "/tmp/execudoc/session.json");
    }

    #[test]
    fn test_invalid_file_value_is_rejected() {
        let file = toml_file("[player]\nmax_manifest_entries = 0\n");

        let err = load_config_from_path(Some(file.path())).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "player.max_manifest_entries",
                ..
            }
        ));
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let err = load_config_from_path(Some(Path::new("/nonexistent/execudoc.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Source(_)));
    }
}
