//! Document Commands

use crate::application::ports::UploadFile;
use crate::domain::document::DocumentId;

/// 上传文档命令
#[derive(Debug, Clone)]
pub struct UploadDocument {
    pub user_id: String,
    pub file: UploadFile,
}

/// 删除文档命令（同时删除原文件和已合成的音频）
#[derive(Debug, Clone)]
pub struct DeleteDocument {
    pub document_id: DocumentId,
}

/// 提取全文命令
#[derive(Debug, Clone)]
pub struct ExtractDocumentText {
    pub document_id: DocumentId,
}

/// 生成摘要命令
#[derive(Debug, Clone)]
pub struct SummarizeDocument {
    pub document_id: DocumentId,
}

/// 朗读文本来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    Summary,
    FullText,
}

impl TextSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextSource::Summary => "summary",
            TextSource::FullText => "full_text",
        }
    }
}

/// 准备朗读文本命令（必要时触发提取或摘要任务）
#[derive(Debug, Clone)]
pub struct ResolveListenText {
    pub document_id: DocumentId,
    pub source: TextSource,
}
