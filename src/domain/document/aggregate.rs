//! Document Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DocumentId, FileId, FileType, Title, UserId};
use crate::domain::audio::AudioManifest;

/// Document 聚合根
///
/// 不变量:
/// - 文档只属于一个用户
/// - 原文件引用在创建后不可修改
/// - 提取文本、摘要、语音缓存清单由异步任务追加
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    id: DocumentId,
    owner: UserId,
    title: Title,
    file_id: FileId,
    mime_type: String,
    file_type: FileType,
    extracted_text: String,
    text_content: String,
    summary: String,
    tts_summary_parts: String,
    created_at: DateTime<Utc>,
}

impl Document {
    /// 上传后创建新文档，文本字段为空
    pub fn new(id: DocumentId, owner: UserId, title: Title, file_id: FileId, mime_type: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        let file_type = if mime_type.is_empty() {
            FileType::guess(title.as_str())
        } else {
            FileType::guess(&mime_type)
        };
        Self {
            id,
            owner,
            title,
            file_id,
            mime_type,
            file_type,
            extracted_text: String::new(),
            text_content: String::new(),
            summary: String::new(),
            tts_summary_parts: String::new(),
            created_at: Utc::now(),
        }
    }

    /// 覆盖文件类型（远端记录已经保存了类型时使用）
    pub fn with_file_type(mut self, file_type: FileType) -> Self {
        self.file_type = file_type;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn set_extracted_text(&mut self, text: impl Into<String>) {
        self.extracted_text = text.into();
    }

    pub fn set_text_content(&mut self, text: impl Into<String>) {
        self.text_content = text.into();
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = summary.into();
    }

    /// 写回序列化后的语音缓存清单
    pub fn set_manifest(&mut self, manifest: &AudioManifest) {
        self.tts_summary_parts = manifest.to_field();
    }

    pub fn set_tts_summary_parts(&mut self, raw: impl Into<String>) {
        self.tts_summary_parts = raw.into();
    }

    // Getters
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    pub fn title(&self) -> &Title {
        &self.title
    }

    pub fn file_id(&self) -> &FileId {
        &self.file_id
    }

    pub fn mime_type(&self) -> Option<&str> {
        if self.mime_type.is_empty() {
            None
        } else {
            Some(&self.mime_type)
        }
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn extracted_text(&self) -> &str {
        &self.extracted_text
    }

    pub fn text_content(&self) -> &str {
        &self.text_content
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn tts_summary_parts(&self) -> &str {
        &self.tts_summary_parts
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 已有的全文（优先 textContent，其次 extractedText）
    pub fn full_text(&self) -> Option<&str> {
        [self.text_content.as_str(), self.extracted_text.as_str()]
            .into_iter()
            .find(|t| !t.trim().is_empty())
    }

    pub fn has_summary(&self) -> bool {
        !self.summary.trim().is_empty()
    }

    /// 解析语音缓存清单（无法解析时视为空清单）
    pub fn manifest(&self) -> AudioManifest {
        AudioManifest::parse(&self.tts_summary_parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(mime: &str) -> Document {
        Document::new(
            DocumentId::new("doc-1").unwrap(),
            UserId::new("user-1").unwrap(),
            Title::new("report.pdf").unwrap(),
            FileId::new("file-1").unwrap(),
            mime,
        )
    }

    #[test]
    fn test_document_creation() {
        let d = doc("application/pdf");
        assert_eq!(d.file_type(), FileType::Pdf);
        assert_eq!(d.mime_type(), Some("application/pdf"));
        assert!(d.full_text().is_none());
        assert!(!d.has_summary());
        assert!(d.manifest().is_empty());
    }

    #[test]
    fn test_file_type_falls_back_to_title() {
        let d = doc("");
        assert_eq!(d.file_type(), FileType::Pdf);
        assert!(d.mime_type().is_none());
    }

    #[test]
    fn test_full_text_prefers_text_content() {
        let mut d = doc("application/pdf");
        d.set_extracted_text("extracted");
        assert_eq!(d.full_text(), Some("extracted"));
        d.set_text_content("content");
        assert_eq!(d.full_text(), Some("content"));
    }
}
