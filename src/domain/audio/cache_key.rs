//! 语音缓存 key

use serde::{Deserialize, Serialize};

/// 缓存 key
///
/// md5(文本) 的小写十六进制表示。同一文档内相同文本总是映射到同一个缓存槽位。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_text(text: &str) -> Self {
        let digest = md5::compute(text.as_bytes());
        Self(format!("{:x}", digest))
    }

    /// 从已序列化的 key 恢复（不重新计算）
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
