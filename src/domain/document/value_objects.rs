//! Document Context - Value Objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 生成远端存储可接受的唯一 ID（32 位十六进制，不含连字符）
fn unique_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// 文档唯一标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Result<Self, &'static str> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("文档 ID 不能为空");
        }
        Ok(Self(id))
    }

    pub fn unique() -> Self {
        Self(unique_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 用户唯一标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self, &'static str> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("用户 ID 不能为空");
        }
        Ok(Self(id))
    }

    /// 注册新账号时使用
    pub fn unique() -> Self {
        Self(unique_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 存储文件标识（文档原文件或合成音频文件）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(String);

impl FileId {
    pub fn new(id: impl Into<String>) -> Result<Self, &'static str> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("文件 ID 不能为空");
        }
        Ok(Self(id))
    }

    pub fn unique() -> Self {
        Self(unique_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 文档标题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title(String);

impl Title {
    pub fn new(title: impl Into<String>) -> Result<Self, &'static str> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err("标题不能为空");
        }
        if title.len() > 255 {
            return Err("标题长度不能超过255字符");
        }
        Ok(Self(title))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Title {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 文件类型（粗分类，用于列表展示和提取策略）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Image,
    Pdf,
    Audio,
    #[default]
    Other,
}

impl FileType {
    /// 根据 MIME 类型或文件名猜测文件类型
    pub fn guess(mime_or_name: &str) -> Self {
        let val = mime_or_name.to_lowercase();
        if val.starts_with("image/") {
            Self::Image
        } else if val.contains("pdf") {
            Self::Pdf
        } else if val.starts_with("audio/") {
            Self::Audio
        } else {
            Self::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::Audio => "audio",
            Self::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "image" => Self::Image,
            "pdf" => Self::Pdf,
            "audio" => Self::Audio,
            _ => Self::Other,
        }
    }
}
